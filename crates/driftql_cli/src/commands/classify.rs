//! Classify command implementation.

use std::sync::Arc;

use driftql_core::{
    CombinedError, Document, GraphQLRequest, NetworkError, Operation, OperationContext,
    OperationKind, OperationResult, Value, Variables,
};
use driftql_exchange::{Connectivity, NetworkFailurePolicy, OfflineErrorPolicy};

/// Whether a transport error with `message` would be treated as offline.
///
/// `has_response` marks that the server answered; `host_offline` simulates
/// the host reporting no connectivity.
pub fn is_offline(message: &str, has_response: bool, host_offline: bool) -> bool {
    let mut error = NetworkError::new(message);
    if has_response {
        error = error.with_response(Value::Null);
    }
    let error = CombinedError::network(error);

    let connectivity = host_offline.then(|| -> Arc<dyn Connectivity> { Arc::new(|| false) });
    let policy = NetworkFailurePolicy::new(connectivity);

    let operation = Arc::new(Operation::new(
        OperationKind::Query,
        GraphQLRequest::new(Document::default(), Variables::new()),
        OperationContext::default(),
    ));
    let result = OperationResult::new(operation, None).with_error(Some(error));
    policy.is_offline_error(result.error.as_ref(), &result)
}

/// Runs the classify command.
pub fn run(message: &str, has_response: bool, host_offline: bool) {
    if is_offline(message, has_response, host_offline) {
        println!("offline: the operation would be queued or served from cache");
    } else {
        println!("error: the result would be delivered as-is");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_messages() {
        assert!(is_offline("Failed to fetch", false, false));
        assert!(is_offline("NetworkError when attempting to fetch resource.", false, false));
        assert!(!is_offline("Internal Server Error", false, false));
    }

    #[test]
    fn responses_are_not_offline() {
        assert!(!is_offline("Failed to fetch", true, false));
        assert!(!is_offline("Failed to fetch", true, true));
    }

    #[test]
    fn host_signal_wins_over_message() {
        assert!(is_offline("connection reset", false, true));
    }
}
