//! Combined protocol and transport errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::{Map, Value};

/// One step of a response path: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// List index.
    Index(usize),
    /// Field name.
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{i}"),
            PathSegment::Key(k) => f.write_str(k),
        }
    }
}

/// A protocol-level error reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGraphQLError")]
pub struct GraphQLError {
    /// Human-readable message.
    pub message: String,
    /// Response path the error applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    /// Extensions metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map>,
}

impl GraphQLError {
    /// Creates an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }

    /// Attaches a response path.
    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }
}

/// Servers and older payloads send errors either as objects or bare strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawGraphQLError {
    Message(String),
    Object {
        message: String,
        #[serde(default)]
        path: Option<Vec<PathSegment>>,
        #[serde(default)]
        extensions: Option<Map>,
    },
}

impl From<RawGraphQLError> for GraphQLError {
    fn from(raw: RawGraphQLError) -> Self {
        match raw {
            RawGraphQLError::Message(message) => GraphQLError::new(message),
            RawGraphQLError::Object {
                message,
                path,
                extensions,
            } => GraphQLError {
                message,
                path,
                extensions,
            },
        }
    }
}

/// A transport-level failure: the request never produced a usable response.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkError {
    /// Transport error message.
    pub message: String,
    /// Raw response body, when one was received.
    pub response: Option<Value>,
}

impl NetworkError {
    /// Creates a network error without a response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    /// Attaches the raw response.
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }
}

/// Every surfaced error has this shape, whatever its origin.
///
/// There is no empty `CombinedError`: [`CombinedError::new`] returns `None`
/// when given no errors of either kind.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", self.message())]
pub struct CombinedError {
    /// Protocol-level errors, in arrival order.
    pub graphql_errors: Vec<GraphQLError>,
    /// Transport-level error, if any.
    pub network_error: Option<NetworkError>,
}

impl CombinedError {
    /// Combines errors, returning `None` when there are none.
    pub fn new(
        graphql_errors: Vec<GraphQLError>,
        network_error: Option<NetworkError>,
    ) -> Option<Self> {
        if graphql_errors.is_empty() && network_error.is_none() {
            return None;
        }
        Some(Self {
            graphql_errors,
            network_error,
        })
    }

    /// Creates an error from a transport failure.
    pub fn network(error: NetworkError) -> Self {
        Self {
            graphql_errors: Vec::new(),
            network_error: Some(error),
        }
    }

    /// Creates an error from protocol errors.
    pub fn graphql(errors: Vec<GraphQLError>) -> Option<Self> {
        Self::new(errors, None)
    }

    /// Rendered message.
    pub fn message(&self) -> String {
        if self.graphql_errors.is_empty() {
            return self
                .network_error
                .as_ref()
                .map(|err| format!("[Network] {}", err.message))
                .unwrap_or_default();
        }
        self.graphql_errors
            .iter()
            .map(|err| format!("[GraphQL] {}", err.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
