//! The offline exchange.
//!
//! Wraps a cache stage so that failures caused by lost connectivity are
//! absorbed instead of surfaced:
//!
//! - optimistic mutations that fail offline are queued for replay,
//! - queries that fail offline are answered from the cache and queued,
//! - the queue is persisted and replayed on startup, when the cache reads
//!   its storage, and whenever the host reports being back online.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use driftql_core::{
    is_optimistic_mutation, Operation, OperationKind, OptimisticConfig, RequestPolicy,
};
use futures::channel::mpsc;
use futures::future;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::cache::CacheExchange;
use crate::client::Client;
use crate::config::OfflineConfig;
use crate::detector::OfflineErrorPolicy;
use crate::error::ExchangeResult;
use crate::exchange::{Exchange, ExchangeIO, ExchangeInput, OperationStream};
use crate::replay::ReplayQueue;
use crate::storage::{CacheStorage, MetadataWriter, OfflineStorage, SerializedEntries};

/// Offline support around a cache stage.
pub struct OfflineExchange<C> {
    config: OfflineConfig,
    cache: C,
}

impl<C: CacheExchange> OfflineExchange<C> {
    /// Creates the exchange.
    pub fn new(config: OfflineConfig, cache: C) -> Self {
        Self { config, cache }
    }

    /// The configuration in use.
    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }
}

impl<C: CacheExchange> Exchange for OfflineExchange<C> {
    fn build(&self, input: ExchangeInput) -> ExchangeIO {
        let Some(storage) = self.config.storage.clone() else {
            debug!("no offline storage configured; offline support disabled");
            return self.cache.build(None, input);
        };
        self.build_offline(storage, input)
    }
}

impl<C: CacheExchange> OfflineExchange<C> {
    fn build_offline(&self, storage: Arc<dyn OfflineStorage>, input: ExchangeInput) -> ExchangeIO {
        let ExchangeInput { client, forward } = input;
        let policy = self.config.offline_error_policy();
        let optimistic = Arc::new(self.config.optimistic.clone());

        let (rebound_tx, rebound_rx) = mpsc::unbounded::<Operation>();
        let queue = Arc::new(ReplayQueue::new(
            Arc::clone(&client),
            rebound_tx.clone(),
            Arc::new(MetadataWriter::spawn(Arc::clone(&storage))),
        ));

        let forward = intercept_mutations(
            forward,
            Arc::clone(&queue),
            Arc::clone(&policy),
            optimistic,
        );

        restore(Arc::clone(&storage), Arc::clone(&client), Arc::clone(&queue));

        let cache_storage: Arc<dyn CacheStorage> = Arc::new(FlushOnRead {
            inner: storage,
            queue: Arc::clone(&queue),
        });
        let cache_io = self.cache.build(Some(cache_storage), ExchangeInput { client, forward });

        Box::new(move |ops: OperationStream| {
            let inbound = stream::select(rebound_rx, ops).boxed();
            cache_io(inbound)
                .filter(move |result| {
                    let swallow = result.operation.kind == OperationKind::Query
                        && policy.is_offline_error(result.error.as_ref(), result);
                    if swallow {
                        debug!(key = result.operation.key, "query failed offline; serving from cache");
                        let degraded = result.operation.with_request_policy(RequestPolicy::CacheOnly);
                        if rebound_tx.unbounded_send(degraded).is_err() {
                            debug!(key = result.operation.key, "pipeline closed; cache-only retry dropped");
                        }
                        queue.enqueue(Operation::clone(&result.operation));
                    }
                    future::ready(!swallow)
                })
                .boxed()
        })
    }
}

/// Wraps the forward continuation so that optimistic mutations failing
/// offline are queued instead of returned.
fn intercept_mutations(
    forward: ExchangeIO,
    queue: Arc<ReplayQueue>,
    policy: Arc<dyn OfflineErrorPolicy>,
    optimistic: Arc<OptimisticConfig>,
) -> ExchangeIO {
    Box::new(move |ops: OperationStream| {
        forward(ops)
            .filter(move |result| {
                let swallow = result.operation.kind == OperationKind::Mutation
                    && policy.is_offline_error(result.error.as_ref(), result)
                    && is_optimistic_mutation(&optimistic, &result.operation);
                if swallow {
                    debug!(key = result.operation.key, "mutation failed offline; queued");
                    queue.enqueue(Operation::clone(&result.operation));
                }
                future::ready(!swallow)
            })
            .boxed()
    })
}

/// Restores the persisted queue, replays it, then flushes on every
/// reconnection.
fn restore(storage: Arc<dyn OfflineStorage>, client: Arc<dyn Client>, queue: Arc<ReplayQueue>) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        warn!("no async runtime; persisted replay queue not restored");
        return;
    };

    handle.spawn(async move {
        match storage.read_metadata().await {
            Ok(requests) if !requests.is_empty() => {
                info!(entries = requests.len(), "restoring persisted replay queue");
                for request in &requests {
                    match client.create_request_operation(OperationKind::Mutation, request) {
                        Ok(operation) => queue.enqueue(operation),
                        Err(err) => warn!(error = %err, "dropping unrestorable request"),
                    }
                }
                queue.flush();
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "failed to read persisted replay queue"),
        }

        let weak: Weak<ReplayQueue> = Arc::downgrade(&queue);
        storage.on_online(Box::new(move || {
            if let Some(queue) = weak.upgrade() {
                debug!("back online; flushing replay queue");
                queue.flush();
            }
        }));
    });
}

/// Storage handed to the cache stage: reading data triggers a flush.
struct FlushOnRead {
    inner: Arc<dyn OfflineStorage>,
    queue: Arc<ReplayQueue>,
}

#[async_trait]
impl CacheStorage for FlushOnRead {
    async fn read_data(&self) -> ExchangeResult<SerializedEntries> {
        let entries = self.inner.read_data().await;
        self.queue.flush();
        entries
    }

    async fn write_data(&self, entries: SerializedEntries) -> ExchangeResult<()> {
        self.inner.write_data(entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DocumentCacheExchange;
    use crate::error::ExchangeError;
    use crate::exchange::FallbackExchange;
    use driftql_core::SerializedRequest;

    struct NoopClient;

    impl Client for NoopClient {
        fn create_request_operation(
            &self,
            _kind: OperationKind,
            _request: &SerializedRequest,
        ) -> ExchangeResult<Operation> {
            Err(ExchangeError::invalid_request("unsupported"))
        }

        fn reexecute_operation(&self, _operation: Operation) {}
    }

    #[tokio::test]
    async fn without_storage_is_the_cache_stage() {
        let cache = DocumentCacheExchange::new();
        let exchange = OfflineExchange::new(OfflineConfig::new(), cache.clone());
        assert!(exchange.config().storage.is_none());

        let io = exchange.build(ExchangeInput {
            client: Arc::new(NoopClient),
            forward: FallbackExchange::io(),
        });
        let results: Vec<_> = io(stream::empty::<Operation>().boxed()).collect().await;
        assert!(results.is_empty());
    }
}
