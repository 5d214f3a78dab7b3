//! # DriftQL Exchange
//!
//! The exchange pipeline and offline support.
//!
//! An exchange is one stage of a request pipeline: it receives a stream of
//! operations and produces a stream of results, forwarding whatever it does
//! not handle to the next stage. This crate provides:
//!
//! - Pipeline plumbing: [`Exchange`], [`compose_exchanges`], [`FallbackExchange`]
//! - A document cache stage: [`DocumentCacheExchange`]
//! - Offline support: [`OfflineExchange`] with its [`ReplayQueue`]
//! - Offline classification: [`NetworkFailurePolicy`]
//! - Incremental delivery: [`accumulate_incremental`]
//!
//! Storage and client capabilities are supplied by the host through the
//! [`OfflineStorage`], [`CacheStorage`] and [`Client`] traits.
//!
//! Building an [`OfflineExchange`] with storage spawns background tasks and
//! should happen inside a Tokio runtime.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod client;
mod config;
mod detector;
mod error;
mod exchange;
mod incremental;
mod offline;
mod replay;
mod storage;

pub use cache::{CacheExchange, DocumentCacheExchange};
pub use client::Client;
pub use config::OfflineConfig;
pub use detector::{looks_like_fetch_failure, Connectivity, NetworkFailurePolicy, OfflineErrorPolicy};
pub use error::{ExchangeError, ExchangeResult};
pub use exchange::{
    compose_exchanges, ComposedExchange, Exchange, ExchangeIO, ExchangeInput, FallbackExchange,
    OperationStream, ResultStream,
};
pub use incremental::accumulate_incremental;
pub use offline::OfflineExchange;
pub use replay::{ReplayEntry, ReplayQueue};
pub use storage::{
    CacheStorage, MetadataSink, MetadataWriter, OfflineStorage, OnlineCallback, SerializedEntries,
};
