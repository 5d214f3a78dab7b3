//! Operation results.

use std::sync::Arc;

use serde::Deserialize;

use crate::combined_error::{CombinedError, GraphQLError, NetworkError};
use crate::operation::Operation;
use crate::value::{Map, Value};

/// Extensions attached to a result: opaque key/value pairs.
pub type Extensions = Arc<Map>;

/// A plain execution response as received from a server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Result data.
    #[serde(default)]
    pub data: Option<Value>,
    /// Protocol errors.
    #[serde(default)]
    pub errors: Option<Vec<GraphQLError>>,
    /// Extensions.
    #[serde(default)]
    pub extensions: Option<Map>,
    /// Whether more payloads follow.
    #[serde(default)]
    pub has_next: bool,
}

/// The result of one operation, possibly one of several for streamed
/// deliveries.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// The originating operation (shared, never copied).
    pub operation: Arc<Operation>,
    /// Result data.
    pub data: Option<Value>,
    /// Error, if any.
    pub error: Option<CombinedError>,
    /// Extensions.
    pub extensions: Option<Extensions>,
    /// More patches will follow for this operation.
    pub has_next: bool,
}

impl OperationResult {
    /// Creates a result with data and nothing else.
    pub fn new(operation: Arc<Operation>, data: Option<Value>) -> Self {
        Self {
            operation,
            data,
            error: None,
            extensions: None,
            has_next: false,
        }
    }

    /// Builds a result from a server response.
    pub fn from_response(operation: Arc<Operation>, response: ExecutionResult) -> Self {
        Self {
            operation,
            data: response.data,
            error: response.errors.and_then(CombinedError::graphql),
            extensions: response.extensions.map(Arc::new),
            has_next: response.has_next,
        }
    }

    /// Builds an error result for a transport failure.
    pub fn from_network_error(operation: Arc<Operation>, error: NetworkError) -> Self {
        Self {
            operation,
            data: None,
            error: Some(CombinedError::network(error)),
            extensions: None,
            has_next: false,
        }
    }

    /// Attaches an error.
    pub fn with_error(mut self, error: Option<CombinedError>) -> Self {
        self.error = error;
        self
    }

    /// Renders the result in the wire response shape.
    pub fn to_response_json(&self) -> serde_json::Value {
        let mut out = serde_json::Map::new();
        out.insert(
            "data".into(),
            self.data.clone().map(Into::into).unwrap_or(serde_json::Value::Null),
        );
        if let Some(error) = &self.error {
            if !error.graphql_errors.is_empty() {
                out.insert(
                    "errors".into(),
                    serde_json::to_value(&error.graphql_errors).unwrap_or_default(),
                );
            }
            if let Some(network) = &error.network_error {
                out.insert(
                    "networkError".into(),
                    serde_json::Value::String(network.message.clone()),
                );
            }
        }
        if let Some(extensions) = &self.extensions {
            out.insert(
                "extensions".into(),
                Value::Object(Arc::clone(extensions)).into(),
            );
        }
        if self.has_next {
            out.insert("hasNext".into(), serde_json::Value::Bool(true));
        }
        serde_json::Value::Object(out)
    }
}
