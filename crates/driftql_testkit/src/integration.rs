//! Cross-crate integration helpers.
//!
//! [`OfflineHarness`] wires an [`OfflineExchange`] over a
//! [`DocumentCacheExchange`] with in-memory storage, a scripted network and a
//! client whose re-executions loop back into the pipeline. Results are
//! collected by a background task.

use std::sync::Arc;

use driftql_core::{Operation, OperationResult};
use driftql_exchange::{
    DocumentCacheExchange, Exchange, ExchangeInput, OfflineConfig, OfflineExchange,
};
use futures::channel::mpsc::{self, UnboundedSender};
use futures::future;
use futures::stream::StreamExt;
use parking_lot::Mutex;

use crate::client::RecordingClient;
use crate::fetch::ScriptedFetch;
use crate::fixtures::OPTIMISTIC_FIELDS;
use crate::storage::MemoryStorage;

const SETTLE_ROUNDS: usize = 64;

/// Yields to the runtime until `condition` holds or the rounds run out.
///
/// Returns the final value of `condition`.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..SETTLE_ROUNDS {
        if condition() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    condition()
}

/// Yields long enough for spawned tasks to go idle.
pub async fn settle() {
    for _ in 0..SETTLE_ROUNDS {
        tokio::task::yield_now().await;
    }
}

/// A running offline pipeline.
pub struct OfflineHarness {
    /// The client; re-executions feed back into the pipeline.
    pub client: Arc<RecordingClient>,
    /// Offline storage.
    pub storage: Arc<MemoryStorage>,
    /// The network stand-in.
    pub fetch: ScriptedFetch,
    /// The cache stage.
    pub cache: DocumentCacheExchange,
    ops: UnboundedSender<Operation>,
    results: Arc<Mutex<Vec<OperationResult>>>,
}

impl OfflineHarness {
    /// Builds and starts the pipeline. Must run inside a Tokio runtime.
    pub fn start(storage: MemoryStorage, fetch: ScriptedFetch) -> Self {
        Self::start_with(storage, fetch, OfflineConfig::new())
    }

    /// Like [`start`](Self::start) with a base configuration. Optimistic
    /// fields default to the fixture set when none are configured.
    pub fn start_with(storage: MemoryStorage, fetch: ScriptedFetch, config: OfflineConfig) -> Self {
        let client = Arc::new(RecordingClient::new());
        let storage = Arc::new(storage);
        let cache = DocumentCacheExchange::new();

        let mut config = config.with_storage(storage.clone());
        if config.optimistic.is_empty() {
            config = config.with_optimistic(OPTIMISTIC_FIELDS.iter().copied());
        }

        let io = OfflineExchange::new(config, cache.clone()).build(ExchangeInput {
            client: client.clone(),
            forward: fetch.io(),
        });

        let (ops, inbound) = mpsc::unbounded::<Operation>();
        client.connect(ops.clone());

        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        tokio::spawn(io(inbound.boxed()).for_each(move |result| {
            sink.lock().push(result);
            future::ready(())
        }));

        Self {
            client,
            storage,
            fetch,
            cache,
            ops,
            results,
        }
    }

    /// Issues an operation as a caller would.
    pub fn execute(&self, operation: Operation) {
        let _ = self.ops.unbounded_send(operation);
    }

    /// Results delivered to callers so far.
    pub fn results(&self) -> Vec<OperationResult> {
        self.results.lock().clone()
    }
}
