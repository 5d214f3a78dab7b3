//! Operations flowing through the exchange pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::{print, Document, OperationKind};
use crate::value::Value;

/// Variables of a request, by name.
pub type Variables = BTreeMap<String, Value>;

/// How an operation may be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RequestPolicy {
    /// Serve from cache when possible, otherwise fetch.
    #[default]
    CacheFirst,
    /// Serve only what is cached; never fetch.
    CacheOnly,
    /// Always fetch.
    NetworkOnly,
    /// Serve from cache and fetch in the background.
    CacheAndNetwork,
}

/// Per-operation context.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationContext {
    /// Request policy.
    pub request_policy: RequestPolicy,
    /// Endpoint URL, when the host uses one.
    pub url: Option<String>,
}

impl OperationContext {
    /// Creates a context with the given policy.
    pub fn with_policy(request_policy: RequestPolicy) -> Self {
        Self {
            request_policy,
            url: None,
        }
    }
}

/// A keyed request: document plus variables.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQLRequest {
    /// Stable key derived from the printed document and variables.
    pub key: u64,
    /// Parsed document.
    pub query: Arc<Document>,
    /// Variables.
    pub variables: Variables,
}

impl GraphQLRequest {
    /// Creates a request, deriving its key.
    pub fn new(query: impl Into<Arc<Document>>, variables: Variables) -> Self {
        let query = query.into();
        let mut key = phash(&print(&query), SEED);
        if !variables.is_empty() {
            // BTreeMap keeps the serialization order stable.
            let serialized = serde_json::to_string(&variables).unwrap_or_default();
            key = phash(&serialized, key);
        }
        Self {
            key,
            query,
            variables,
        }
    }
}

const SEED: u64 = 5381;

/// djb2-style string hash, continuing from `seed`.
fn phash(input: &str, seed: u64) -> u64 {
    input
        .bytes()
        .fold(seed, |h, b| (h << 5).wrapping_add(h) ^ u64::from(b))
}

/// One request flowing through the pipeline.
///
/// Operations are immutable; derived operations (teardowns, policy
/// changes) are new values sharing the same key and document.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Operation kind.
    pub kind: OperationKind,
    /// Key; a `Teardown` cancels the in-flight operation with the same key.
    pub key: u64,
    /// Parsed document.
    pub query: Arc<Document>,
    /// Variables.
    pub variables: Variables,
    /// Context.
    pub context: OperationContext,
}

impl Operation {
    /// Creates an operation from a request.
    pub fn new(kind: OperationKind, request: GraphQLRequest, context: OperationContext) -> Self {
        Self {
            kind,
            key: request.key,
            query: request.query,
            variables: request.variables,
            context,
        }
    }

    /// Returns a copy with a different kind, e.g. a teardown for this operation.
    pub fn with_kind(&self, kind: OperationKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    /// Returns a copy with a different request policy.
    pub fn with_request_policy(&self, request_policy: RequestPolicy) -> Self {
        let mut operation = self.clone();
        operation.context.request_policy = request_policy;
        operation
    }

    /// Serialized form used for persistence.
    pub fn to_serialized(&self) -> SerializedRequest {
        SerializedRequest {
            query: print(&self.query),
            variables: self.variables.clone(),
        }
    }
}

/// Printed query text plus variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRequest {
    /// Printed query text.
    pub query: String,
    /// Variables.
    #[serde(default)]
    pub variables: Variables,
}
