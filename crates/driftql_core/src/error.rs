//! Error types for the core crate.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while decoding payloads at the crate boundary.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Payload was not valid JSON or did not match the expected shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload was JSON but not a recognizable envelope.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl CoreError {
    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload(message.into())
    }
}
