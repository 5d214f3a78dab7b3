//! A client double that records re-executions.

use std::collections::HashMap;
use std::sync::Arc;

use driftql_core::{
    print, Document, GraphQLRequest, Operation, OperationContext, OperationKind, SerializedRequest,
};
use driftql_exchange::{Client, ExchangeError, ExchangeResult};
use futures::channel::mpsc::UnboundedSender;
use parking_lot::Mutex;

use crate::fixtures::all_documents;

/// Client that rebuilds operations from known documents and records every
/// re-execution.
///
/// Persisted requests carry printed query text, so documents must be
/// registered before they can be restored. When connected to a pipeline,
/// re-executed operations are fed back into it.
#[derive(Default)]
pub struct RecordingClient {
    documents: Mutex<HashMap<String, Arc<Document>>>,
    reexecuted: Mutex<Vec<Operation>>,
    pipeline: Mutex<Option<UnboundedSender<Operation>>>,
}

impl RecordingClient {
    /// Creates a client knowing every fixture document.
    pub fn new() -> Self {
        let client = Self::default();
        for document in all_documents() {
            client.register(document);
        }
        client
    }

    /// Makes a document restorable.
    pub fn register(&self, document: Arc<Document>) {
        self.documents.lock().insert(print(&document), document);
    }

    /// Feeds re-executed operations into `pipeline`.
    pub fn connect(&self, pipeline: UnboundedSender<Operation>) {
        *self.pipeline.lock() = Some(pipeline);
    }

    /// Operations re-executed so far, in order.
    pub fn reexecuted(&self) -> Vec<Operation> {
        self.reexecuted.lock().clone()
    }
}

impl Client for RecordingClient {
    fn create_request_operation(
        &self,
        kind: OperationKind,
        request: &SerializedRequest,
    ) -> ExchangeResult<Operation> {
        let document = self
            .documents
            .lock()
            .get(&request.query)
            .cloned()
            .ok_or_else(|| ExchangeError::invalid_request("unknown query document"))?;

        Ok(Operation::new(
            kind,
            GraphQLRequest::new(document, request.variables.clone()),
            OperationContext::default(),
        ))
    }

    fn reexecute_operation(&self, operation: Operation) {
        self.reexecuted.lock().push(operation.clone());
        let pipeline = self.pipeline.lock().clone();
        if let Some(pipeline) = pipeline {
            let _ = pipeline.unbounded_send(operation);
        }
    }
}
