//! Classifying failures as connectivity loss.

use std::sync::{Arc, LazyLock};

use driftql_core::{CombinedError, OperationResult};
use regex::Regex;

/// Host signal for connectivity.
pub trait Connectivity: Send + Sync {
    /// Returns false when the host reports it is offline.
    fn is_online(&self) -> bool;
}

impl<F> Connectivity for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_online(&self) -> bool {
        self()
    }
}

/// Decides whether a failed result means the client is offline.
pub trait OfflineErrorPolicy: Send + Sync {
    /// Returns true if `error` indicates connectivity loss.
    fn is_offline_error(&self, error: Option<&CombinedError>, result: &OperationResult) -> bool;
}

impl<F> OfflineErrorPolicy for F
where
    F: Fn(Option<&CombinedError>, &OperationResult) -> bool + Send + Sync,
{
    fn is_offline_error(&self, error: Option<&CombinedError>, result: &OperationResult) -> bool {
        self(error, result)
    }
}

/// Default policy.
///
/// A failure counts as offline when it is a transport error with no response
/// at all and either the host reports being offline or the message reads like
/// a fetch failure.
#[derive(Clone, Default)]
pub struct NetworkFailurePolicy {
    connectivity: Option<Arc<dyn Connectivity>>,
}

impl NetworkFailurePolicy {
    /// Creates the policy, optionally consulting a host connectivity signal.
    pub fn new(connectivity: Option<Arc<dyn Connectivity>>) -> Self {
        Self { connectivity }
    }

    fn host_offline(&self) -> bool {
        self.connectivity
            .as_ref()
            .is_some_and(|connectivity| !connectivity.is_online())
    }
}

impl std::fmt::Debug for NetworkFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkFailurePolicy")
            .field("connectivity", &self.connectivity.is_some())
            .finish()
    }
}

impl OfflineErrorPolicy for NetworkFailurePolicy {
    fn is_offline_error(&self, error: Option<&CombinedError>, _result: &OperationResult) -> bool {
        let Some(error) = error else {
            return false;
        };
        let Some(network) = &error.network_error else {
            return false;
        };
        if network.response.is_some() || !error.graphql_errors.is_empty() {
            return false;
        }
        self.host_offline() || looks_like_fetch_failure(&network.message)
    }
}

/// Messages fetch implementations produce when no connection could be made.
static FETCH_FAILURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)request failed|failed to fetch|network\s?error")
        .expect("fetch failure pattern is valid")
});

/// Case-insensitive check for a fetch failure message.
pub fn looks_like_fetch_failure(message: &str) -> bool {
    FETCH_FAILURE.is_match(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftql_core::{
        Document, GraphQLError, GraphQLRequest, NetworkError, Operation, OperationContext,
        OperationKind, Value, Variables,
    };

    fn result() -> OperationResult {
        OperationResult::new(
            Arc::new(Operation::new(
                OperationKind::Query,
                GraphQLRequest::new(Document::default(), Variables::new()),
                OperationContext::default(),
            )),
            None,
        )
    }

    fn network(message: &str) -> CombinedError {
        CombinedError::network(NetworkError::new(message))
    }

    #[test]
    fn fetch_failure_messages() {
        assert!(looks_like_fetch_failure("Failed to fetch"));
        assert!(looks_like_fetch_failure("TypeError: Request failed"));
        assert!(looks_like_fetch_failure("NetworkError when attempting to fetch resource."));
        assert!(looks_like_fetch_failure("network error"));
        assert!(looks_like_fetch_failure("Network\tError"));
        assert!(!looks_like_fetch_failure("network  error"));
        assert!(!looks_like_fetch_failure("Unauthorized"));
        assert!(!looks_like_fetch_failure("network is fine"));
    }

    #[test]
    fn default_policy_requires_transport_failure() {
        let policy = NetworkFailurePolicy::default();
        let result = result();

        assert!(policy.is_offline_error(Some(&network("Failed to fetch")), &result));
        assert!(!policy.is_offline_error(None, &result));
        assert!(!policy.is_offline_error(Some(&network("Unauthorized")), &result));

        let graphql = CombinedError::graphql(vec![GraphQLError::new("Failed to fetch")]);
        assert!(!policy.is_offline_error(graphql.as_ref(), &result));
    }

    #[test]
    fn responses_are_never_offline() {
        let policy = NetworkFailurePolicy::default();
        let error = CombinedError::network(
            NetworkError::new("Failed to fetch").with_response(Value::int(502)),
        );
        assert!(!policy.is_offline_error(Some(&error), &result()));
    }

    #[test]
    fn host_signal_overrides_message() {
        let down: Arc<dyn Connectivity> = Arc::new(|| false);
        let up: Arc<dyn Connectivity> = Arc::new(|| true);
        let offline = NetworkFailurePolicy::new(Some(down));
        let online = NetworkFailurePolicy::new(Some(up));
        let error = network("connection reset");

        assert!(offline.is_offline_error(Some(&error), &result()));
        assert!(!online.is_offline_error(Some(&error), &result()));
    }

    #[test]
    fn closures_are_policies() {
        let policy = |error: Option<&CombinedError>, _: &OperationResult| error.is_some();
        assert!(policy.is_offline_error(Some(&network("anything")), &result()));
    }
}
