//! # DriftQL Core
//!
//! Data model and pure algorithms for the DriftQL client.
//!
//! This crate provides:
//! - [`Value`], a reference-counted result tree with observable sharing
//! - Parsed documents ([`Document`]) and a query printer
//! - [`Operation`] and [`OperationResult`]
//! - [`CombinedError`], the single error shape surfaced to callers
//! - The selection walker used to detect optimistic mutations
//! - Incremental payload normalization and the result merger
//!
//! This is a pure crate with no I/O.
//!
//! ## Merging
//!
//! ```
//! use driftql_core::{merge_result_patch, Delivery, Document, GraphQLRequest, Operation,
//!     OperationContext, OperationKind, OperationResult, Value, Variables};
//! use std::sync::Arc;
//!
//! let operation = Arc::new(Operation::new(
//!     OperationKind::Query,
//!     GraphQLRequest::new(Document::default(), Variables::new()),
//!     OperationContext::default(),
//! ));
//! let base = OperationResult::new(
//!     operation,
//!     Some(Value::from(serde_json::json!({ "items": [{ "id": "a" }] }))),
//! );
//! let payload = serde_json::json!({
//!     "incremental": [{ "items": [{ "id": "b" }], "path": ["items", 1] }],
//!     "hasNext": false
//! });
//!
//! let merged = merge_result_patch(&base, Delivery::from_json(payload).unwrap());
//! let items = merged.data.as_ref().unwrap().get("items").unwrap();
//! assert_eq!(items.as_list().unwrap().len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
mod combined_error;
mod error;
mod incremental;
mod merge;
mod operation;
mod result;
mod value;
pub mod walker;

pub use ast::{print, Document, OperationKind};
pub use combined_error::{CombinedError, GraphQLError, NetworkError, PathSegment};
pub use error::{CoreError, CoreResult};
pub use incremental::{Delivery, Patch, PatchValue};
pub use merge::merge_result_patch;
pub use operation::{
    GraphQLRequest, Operation, OperationContext, RequestPolicy, SerializedRequest, Variables,
};
pub use result::{ExecutionResult, Extensions, OperationResult};
pub use value::{Map, Value};
pub use walker::{is_optimistic_mutation, OptimisticConfig};
