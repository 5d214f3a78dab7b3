//! Cache stage.

use std::collections::HashMap;
use std::sync::Arc;

use driftql_core::{Operation, OperationKind, OperationResult, RequestPolicy, Value};
use futures::channel::mpsc;
use futures::future;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::exchange::{on_end, ExchangeIO, ExchangeInput, OperationStream};
use crate::storage::{CacheStorage, SerializedEntries};

/// Constructor contract for the cache stage wrapped by the offline exchange.
pub trait CacheExchange: Send + Sync {
    /// Builds the stage with optional persistent storage.
    fn build(&self, storage: Option<Arc<dyn CacheStorage>>, input: ExchangeInput) -> ExchangeIO;
}

type Documents = Arc<Mutex<HashMap<u64, Value>>>;

/// A document cache: query results stored whole, by operation key.
///
/// Handles can be cloned; clones share entries.
#[derive(Clone, Default)]
pub struct DocumentCacheExchange {
    documents: Documents,
}

impl DocumentCacheExchange {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached data for an operation key.
    pub fn get(&self, key: u64) -> Option<Value> {
        self.documents.lock().get(&key).cloned()
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.documents.lock().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.documents.lock().is_empty()
    }

    fn hydrate(&self, storage: Arc<dyn CacheStorage>) {
        let documents = Arc::clone(&self.documents);
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; cache not hydrated");
            return;
        };
        handle.spawn(async move {
            let entries = match storage.read_data().await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(error = %err, "failed to read cache entries");
                    return;
                }
            };
            let mut documents = documents.lock();
            let mut restored = 0usize;
            for (key, json) in entries {
                let (Ok(key), Ok(value)) = (key.parse::<u64>(), serde_json::from_str::<Value>(&json))
                else {
                    warn!(entry = %key, "skipping unreadable cache entry");
                    continue;
                };
                // Results that arrived before hydration finished are newer.
                documents.entry(key).or_insert_with(|| {
                    restored += 1;
                    value
                });
            }
            debug!(entries = restored, "cache hydrated");
        });
    }
}

impl CacheExchange for DocumentCacheExchange {
    fn build(&self, storage: Option<Arc<dyn CacheStorage>>, input: ExchangeInput) -> ExchangeIO {
        if let Some(storage) = &storage {
            self.hydrate(Arc::clone(storage));
        }
        let documents = Arc::clone(&self.documents);
        let forward = input.forward;

        Box::new(move |ops: OperationStream| {
            let (hits_tx, hits_rx) = mpsc::unbounded::<OperationResult>();
            let closer = hits_tx.clone();

            let lookup = Arc::clone(&documents);
            let forwarded = on_end(
                ops.filter(move |operation| future::ready(route(&lookup, &hits_tx, operation))),
                move || closer.close_channel(),
            )
            .boxed();

            let network = forward(forwarded)
                .inspect(move |result| store(&documents, storage.as_ref(), result))
                .boxed();

            stream::select(hits_rx, network).boxed()
        })
    }
}

/// Serves cache hits into `hits` and returns whether to forward.
fn route(
    documents: &Documents,
    hits: &mpsc::UnboundedSender<OperationResult>,
    operation: &Operation,
) -> bool {
    if operation.kind != OperationKind::Query {
        return true;
    }

    let policy = operation.context.request_policy;
    if policy == RequestPolicy::NetworkOnly {
        return true;
    }

    let cached = documents.lock().get(&operation.key).cloned();
    let serve = |data: Option<Value>| {
        trace!(key = operation.key, hit = data.is_some(), "serving from cache");
        let result = OperationResult::new(Arc::new(operation.clone()), data);
        if hits.unbounded_send(result).is_err() {
            trace!(key = operation.key, "result stream closed");
        }
    };

    match (policy, cached) {
        (RequestPolicy::CacheOnly, cached) => {
            serve(cached);
            false
        }
        (RequestPolicy::CacheFirst, Some(data)) => {
            serve(Some(data));
            false
        }
        (RequestPolicy::CacheAndNetwork, Some(data)) => {
            serve(Some(data));
            true
        }
        _ => true,
    }
}

fn store(documents: &Documents, storage: Option<&Arc<dyn CacheStorage>>, result: &OperationResult) {
    if result.operation.kind != OperationKind::Query || result.error.is_some() {
        return;
    }
    let Some(data) = &result.data else {
        return;
    };

    let key = result.operation.key;
    documents.lock().insert(key, data.clone());

    let Some(storage) = storage else {
        return;
    };
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        return;
    };
    let entries = SerializedEntries::from([(key.to_string(), data.to_string())]);
    let storage = Arc::clone(storage);
    handle.spawn(async move {
        if let Err(err) = storage.write_data(entries).await {
            warn!(error = %err, "failed to persist cache entry");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::error::ExchangeResult;
    use crate::exchange::FallbackExchange;
    use async_trait::async_trait;
    use driftql_core::{
        ast::{Field, Selection},
        Document, GraphQLRequest, OperationContext, SerializedRequest, Variables,
    };

    struct NoopClient;

    impl Client for NoopClient {
        fn create_request_operation(
            &self,
            _kind: OperationKind,
            _request: &SerializedRequest,
        ) -> ExchangeResult<Operation> {
            Err(crate::error::ExchangeError::invalid_request("unsupported"))
        }

        fn reexecute_operation(&self, _operation: Operation) {}
    }

    fn query(policy: RequestPolicy) -> Operation {
        Operation::new(
            OperationKind::Query,
            GraphQLRequest::new(
                Document::operation(
                    OperationKind::Query,
                    vec![Selection::Field(Field::leaf("items"))],
                ),
                Variables::new(),
            ),
            OperationContext::with_policy(policy),
        )
    }

    /// Forward stage answering every query with `"network"`.
    fn network(seen: Arc<Mutex<Vec<RequestPolicy>>>) -> ExchangeIO {
        Box::new(move |ops: OperationStream| {
            ops.filter_map(move |operation| {
                seen.lock().push(operation.context.request_policy);
                let result = (operation.kind == OperationKind::Query)
                    .then(|| OperationResult::new(Arc::new(operation), Some(Value::string("network"))));
                future::ready(result)
            })
            .boxed()
        })
    }

    async fn run(
        cache: &DocumentCacheExchange,
        ops: Vec<Operation>,
    ) -> (Vec<Option<Value>>, Vec<RequestPolicy>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let io = cache.build(
            None,
            ExchangeInput {
                client: Arc::new(NoopClient),
                forward: network(Arc::clone(&seen)),
            },
        );
        let results: Vec<_> = io(stream::iter(ops).boxed()).map(|r| r.data).collect().await;
        let seen = seen.lock().clone();
        (results, seen)
    }

    #[tokio::test]
    async fn cache_first_serves_hits() {
        let cache = DocumentCacheExchange::new();
        let (first, _) = run(&cache, vec![query(RequestPolicy::CacheFirst)]).await;
        assert_eq!(first, vec![Some(Value::string("network"))]);
        assert_eq!(cache.len(), 1);

        let (second, forwarded) = run(&cache, vec![query(RequestPolicy::CacheFirst)]).await;
        assert_eq!(second, vec![Some(Value::string("network"))]);
        assert!(forwarded.is_empty());
    }

    #[tokio::test]
    async fn cache_only_miss_is_empty() {
        let cache = DocumentCacheExchange::new();
        let (results, forwarded) = run(&cache, vec![query(RequestPolicy::CacheOnly)]).await;
        assert_eq!(results, vec![None]);
        assert!(forwarded.is_empty());
    }

    #[tokio::test]
    async fn network_only_always_forwards() {
        let cache = DocumentCacheExchange::new();
        run(&cache, vec![query(RequestPolicy::CacheFirst)]).await;
        let (_, forwarded) = run(&cache, vec![query(RequestPolicy::NetworkOnly)]).await;
        assert_eq!(forwarded, vec![RequestPolicy::NetworkOnly]);
    }

    #[tokio::test]
    async fn cache_and_network_serves_and_forwards() {
        let cache = DocumentCacheExchange::new();
        run(&cache, vec![query(RequestPolicy::CacheFirst)]).await;
        let (results, forwarded) = run(&cache, vec![query(RequestPolicy::CacheAndNetwork)]).await;
        assert_eq!(results.len(), 2);
        assert_eq!(forwarded, vec![RequestPolicy::CacheAndNetwork]);
    }

    #[tokio::test]
    async fn teardowns_pass_through() {
        let cache = DocumentCacheExchange::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let io = cache.build(
            None,
            ExchangeInput {
                client: Arc::new(NoopClient),
                forward: network(Arc::clone(&seen)),
            },
        );
        let teardown = query(RequestPolicy::CacheFirst).with_kind(OperationKind::Teardown);
        let results: Vec<_> = io(stream::iter(vec![teardown]).boxed()).collect().await;
        assert!(results.is_empty());
        assert_eq!(seen.lock().len(), 1);
    }

    #[derive(Default)]
    struct Entries(Mutex<SerializedEntries>);

    #[async_trait]
    impl CacheStorage for Entries {
        async fn read_data(&self) -> ExchangeResult<SerializedEntries> {
            Ok(self.0.lock().clone())
        }

        async fn write_data(&self, entries: SerializedEntries) -> ExchangeResult<()> {
            self.0.lock().extend(entries);
            Ok(())
        }
    }

    #[tokio::test]
    async fn hydrates_from_storage() {
        let key = query(RequestPolicy::CacheFirst).key;
        let storage = Arc::new(Entries::default());
        storage
            .0
            .lock()
            .insert(key.to_string(), "{\"items\":[]}".to_string());

        let storage: Arc<dyn CacheStorage> = storage;
        let cache = DocumentCacheExchange::new();
        let _io = cache.build(
            Some(storage),
            ExchangeInput {
                client: Arc::new(NoopClient),
                forward: FallbackExchange::io(),
            },
        );
        for _ in 0..100 {
            if !cache.is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert_eq!(
            cache.get(key),
            Some(Value::from(serde_json::json!({ "items": [] })))
        );
    }
}
