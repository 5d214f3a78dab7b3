//! In-memory offline storage.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use driftql_core::SerializedRequest;
use driftql_exchange::{
    CacheStorage, ExchangeError, ExchangeResult, OfflineStorage, OnlineCallback,
    SerializedEntries,
};
use parking_lot::Mutex;

type SharedCallback = Arc<dyn Fn() + Send + Sync>;

/// Offline storage kept in memory, recording every metadata write.
#[derive(Default)]
pub struct MemoryStorage {
    data: Mutex<SerializedEntries>,
    metadata: Mutex<Vec<SerializedRequest>>,
    metadata_writes: Mutex<Vec<Vec<SerializedRequest>>>,
    callbacks: Mutex<Vec<SharedCallback>>,
    data_reads: AtomicUsize,
    fail_metadata_reads: AtomicBool,
}

impl MemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage holding a previously persisted queue.
    pub fn with_metadata(requests: Vec<SerializedRequest>) -> Self {
        let storage = Self::default();
        *storage.metadata.lock() = requests;
        storage
    }

    /// Makes subsequent metadata reads fail.
    pub fn fail_metadata_reads(&self, fail: bool) {
        self.fail_metadata_reads.store(fail, Ordering::SeqCst);
    }

    /// The currently persisted queue.
    pub fn metadata(&self) -> Vec<SerializedRequest> {
        self.metadata.lock().clone()
    }

    /// Every metadata write, in order.
    pub fn metadata_writes(&self) -> Vec<Vec<SerializedRequest>> {
        self.metadata_writes.lock().clone()
    }

    /// Persisted cache entries.
    pub fn data(&self) -> SerializedEntries {
        self.data.lock().clone()
    }

    /// Number of `read_data` calls.
    pub fn data_reads(&self) -> usize {
        self.data_reads.load(Ordering::SeqCst)
    }

    /// Number of registered reconnection callbacks.
    pub fn online_callbacks(&self) -> usize {
        self.callbacks.lock().len()
    }

    /// Invokes every reconnection callback.
    pub fn go_online(&self) {
        let callbacks = self.callbacks.lock().clone();
        for callback in callbacks {
            callback();
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn read_data(&self) -> ExchangeResult<SerializedEntries> {
        self.data_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.lock().clone())
    }

    async fn write_data(&self, entries: SerializedEntries) -> ExchangeResult<()> {
        self.data.lock().extend(entries);
        Ok(())
    }
}

#[async_trait]
impl OfflineStorage for MemoryStorage {
    async fn read_metadata(&self) -> ExchangeResult<Vec<SerializedRequest>> {
        if self.fail_metadata_reads.load(Ordering::SeqCst) {
            return Err(ExchangeError::storage("metadata unavailable"));
        }
        Ok(self.metadata.lock().clone())
    }

    async fn write_metadata(&self, requests: Vec<SerializedRequest>) -> ExchangeResult<()> {
        self.metadata_writes.lock().push(requests.clone());
        *self.metadata.lock() = requests;
        Ok(())
    }

    fn on_online(&self, callback: OnlineCallback) {
        self.callbacks.lock().push(Arc::from(callback));
    }
}
