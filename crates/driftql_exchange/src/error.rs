//! Error types for the exchange pipeline.

use driftql_core::CoreError;
use thiserror::Error;

/// Result type for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Errors raised by collaborators of the exchange pipeline.
///
/// None of these reach callers of the pipeline directly; results only ever
/// carry a `CombinedError`.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Storage backend failed to read or write.
    #[error("storage error: {0}")]
    Storage(String),

    /// A persisted request could not be turned back into an operation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Payload decoding failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExchangeError {
    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}
