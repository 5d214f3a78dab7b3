//! Configuration for the offline exchange.

use std::collections::HashSet;
use std::sync::Arc;

use driftql_core::OptimisticConfig;

use crate::detector::{Connectivity, NetworkFailurePolicy, OfflineErrorPolicy};
use crate::storage::OfflineStorage;

/// Configuration for [`OfflineExchange`](crate::OfflineExchange).
#[derive(Clone, Default)]
pub struct OfflineConfig {
    /// Mutation fields with optimistic updates. Only mutations selecting one
    /// of these are queued while offline.
    pub optimistic: OptimisticConfig,
    /// Replaces the default offline classification entirely.
    pub offline_error_policy: Option<Arc<dyn OfflineErrorPolicy>>,
    /// Persistent storage. Without it the exchange is just the cache stage.
    pub storage: Option<Arc<dyn OfflineStorage>>,
    /// Host connectivity signal for the default classification.
    pub connectivity: Option<Arc<dyn Connectivity>>,
}

impl OfflineConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the optimistic mutation fields.
    pub fn with_optimistic<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optimistic = fields.into_iter().map(Into::into).collect::<HashSet<_>>();
        self
    }

    /// Overrides offline classification.
    pub fn with_offline_error_policy(mut self, policy: impl OfflineErrorPolicy + 'static) -> Self {
        self.offline_error_policy = Some(Arc::new(policy));
        self
    }

    /// Sets the persistent storage.
    pub fn with_storage(mut self, storage: Arc<dyn OfflineStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the host connectivity signal.
    pub fn with_connectivity(mut self, connectivity: impl Connectivity + 'static) -> Self {
        self.connectivity = Some(Arc::new(connectivity));
        self
    }

    /// The policy in effect: the override if set, else the default.
    pub fn offline_error_policy(&self) -> Arc<dyn OfflineErrorPolicy> {
        match &self.offline_error_policy {
            Some(policy) => Arc::clone(policy),
            None => Arc::new(NetworkFailurePolicy::new(self.connectivity.clone())),
        }
    }
}

impl std::fmt::Debug for OfflineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineConfig")
            .field("optimistic", &self.optimistic)
            .field("offline_error_policy", &self.offline_error_policy.is_some())
            .field("storage", &self.storage.is_some())
            .field("connectivity", &self.connectivity.is_some())
            .finish()
    }
}
