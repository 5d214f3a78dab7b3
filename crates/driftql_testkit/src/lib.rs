//! # DriftQL Testkit
//!
//! Test utilities for DriftQL.
//!
//! This crate provides:
//! - Sample documents and operations
//! - A recording [`Client`](driftql_exchange::Client) double
//! - In-memory [`OfflineStorage`](driftql_exchange::OfflineStorage)
//! - A scripted network stage that can be switched offline
//! - A harness running a complete offline pipeline
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use driftql_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn queues_while_offline() {
//!     let harness = OfflineHarness::start(MemoryStorage::new(), ScriptedFetch::offline());
//!     harness.execute(add_item("milk"));
//!     assert!(wait_until(|| harness.storage.metadata().len() == 1).await);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod fetch;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod storage;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::client::*;
    pub use crate::fetch::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::storage::*;
}

pub use client::*;
pub use fetch::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use storage::*;
