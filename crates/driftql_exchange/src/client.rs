//! The client seam seen by exchanges.

use driftql_core::{Operation, OperationKind, SerializedRequest};

use crate::error::ExchangeResult;

/// Client capabilities the pipeline stages rely on.
pub trait Client: Send + Sync {
    /// Rebuilds an operation of `kind` from its persisted form.
    fn create_request_operation(
        &self,
        kind: OperationKind,
        request: &SerializedRequest,
    ) -> ExchangeResult<Operation>;

    /// Re-submits an operation to the full pipeline as though newly issued.
    fn reexecute_operation(&self, operation: Operation);
}
