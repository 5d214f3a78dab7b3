//! Persistent storage seams.
//!
//! Cache entries and the replay queue are persisted through host-provided
//! storage. Metadata writes from the replay queue are handed to a
//! [`MetadataWriter`], which applies them in order on a background task so
//! that the queue never waits on I/O.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use driftql_core::SerializedRequest;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ExchangeResult;

/// Serialized cache entries keyed by entry name.
pub type SerializedEntries = BTreeMap<String, String>;

/// Callback invoked when the host regains connectivity.
pub type OnlineCallback = Box<dyn Fn() + Send + Sync>;

/// Storage for cache entries.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Reads all persisted entries.
    async fn read_data(&self) -> ExchangeResult<SerializedEntries>;

    /// Writes entries, replacing those with the same name.
    async fn write_data(&self, entries: SerializedEntries) -> ExchangeResult<()>;
}

/// Storage that also persists the replay queue and signals reconnection.
#[async_trait]
pub trait OfflineStorage: CacheStorage {
    /// Reads the persisted replay queue.
    async fn read_metadata(&self) -> ExchangeResult<Vec<SerializedRequest>>;

    /// Replaces the persisted replay queue.
    async fn write_metadata(&self, requests: Vec<SerializedRequest>) -> ExchangeResult<()>;

    /// Registers a callback for reconnection. There is no unregister.
    fn on_online(&self, callback: OnlineCallback);
}

/// Receives replay queue snapshots to persist.
pub trait MetadataSink: Send + Sync {
    /// Persists a snapshot. Must not block.
    fn persist(&self, requests: Vec<SerializedRequest>);
}

/// Applies metadata snapshots to storage sequentially on a background task.
///
/// The task ends once the writer is dropped and pending snapshots have been
/// written.
pub struct MetadataWriter {
    tx: mpsc::UnboundedSender<Vec<SerializedRequest>>,
}

impl MetadataWriter {
    /// Spawns the writer task on the current Tokio runtime.
    ///
    /// Outside a runtime no task is spawned and snapshots are discarded with a
    /// warning.
    pub fn spawn(storage: Arc<dyn OfflineStorage>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<SerializedRequest>>();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    while let Some(requests) = rx.recv().await {
                        let len = requests.len();
                        match storage.write_metadata(requests).await {
                            Ok(()) => debug!(entries = len, "persisted replay queue"),
                            Err(err) => warn!(error = %err, "failed to persist replay queue"),
                        }
                    }
                });
            }
            Err(_) => {
                warn!("no async runtime; replay queue will not be persisted");
            }
        }

        Self { tx }
    }
}

impl MetadataSink for MetadataWriter {
    fn persist(&self, requests: Vec<SerializedRequest>) {
        if self.tx.send(requests).is_err() {
            warn!("metadata writer stopped; dropping replay queue snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingStorage {
        writes: Mutex<Vec<Vec<SerializedRequest>>>,
    }

    #[async_trait]
    impl CacheStorage for RecordingStorage {
        async fn read_data(&self) -> ExchangeResult<SerializedEntries> {
            Ok(SerializedEntries::new())
        }

        async fn write_data(&self, _entries: SerializedEntries) -> ExchangeResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl OfflineStorage for RecordingStorage {
        async fn read_metadata(&self) -> ExchangeResult<Vec<SerializedRequest>> {
            Ok(Vec::new())
        }

        async fn write_metadata(&self, requests: Vec<SerializedRequest>) -> ExchangeResult<()> {
            self.writes.lock().push(requests);
            Ok(())
        }

        fn on_online(&self, _callback: OnlineCallback) {}
    }

    fn request(query: &str) -> SerializedRequest {
        SerializedRequest {
            query: query.to_string(),
            variables: Default::default(),
        }
    }

    #[tokio::test]
    async fn writes_snapshots_in_order() {
        let storage = Arc::new(RecordingStorage::default());
        let writer = MetadataWriter::spawn(storage.clone());

        writer.persist(vec![request("a")]);
        writer.persist(vec![request("a"), request("b")]);
        writer.persist(vec![]);
        drop(writer);

        for _ in 0..100 {
            if storage.writes.lock().len() == 3 {
                break;
            }
            tokio::task::yield_now().await;
        }

        let writes = storage.writes.lock();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[1].len(), 2);
        assert!(writes[2].is_empty());
    }

    #[test]
    fn without_runtime_snapshots_are_dropped() {
        let storage = Arc::new(RecordingStorage::default());
        let writer = MetadataWriter::spawn(storage.clone());
        writer.persist(vec![request("a")]);
        assert!(storage.writes.lock().is_empty());
    }
}
