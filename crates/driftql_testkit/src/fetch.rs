//! A scripted terminal stage standing in for the network.

use std::collections::HashMap;
use std::sync::Arc;

use driftql_core::{NetworkError, Operation, OperationKind, OperationResult, Value};
use driftql_exchange::{Exchange, ExchangeIO, ExchangeInput, OperationStream};
use futures::future;
use futures::stream::StreamExt;
use parking_lot::Mutex;

/// Message produced while offline; matches the default offline policy.
pub const OFFLINE_MESSAGE: &str = "Failed to fetch";

#[derive(Default)]
struct FetchState {
    online: bool,
    seen: Vec<Operation>,
    responses: HashMap<u64, Value>,
}

/// Terminal stage answering from canned responses, or failing every request
/// with [`OFFLINE_MESSAGE`] while offline. Teardowns are recorded and
/// produce nothing.
#[derive(Clone, Default)]
pub struct ScriptedFetch {
    state: Arc<Mutex<FetchState>>,
}

impl ScriptedFetch {
    /// A stage that answers requests.
    pub fn online() -> Self {
        let fetch = Self::default();
        fetch.set_online(true);
        fetch
    }

    /// A stage that fails every request.
    pub fn offline() -> Self {
        Self::default()
    }

    /// Switches connectivity.
    pub fn set_online(&self, online: bool) {
        self.state.lock().online = online;
    }

    /// Sets the data returned for an operation key. Unknown keys get `{}`.
    pub fn respond(&self, key: u64, data: Value) {
        self.state.lock().responses.insert(key, data);
    }

    /// Every operation that reached the stage, in order.
    pub fn seen(&self) -> Vec<Operation> {
        self.state.lock().seen.clone()
    }

    /// Only the teardowns that reached the stage.
    pub fn teardowns(&self) -> Vec<Operation> {
        self.state
            .lock()
            .seen
            .iter()
            .filter(|op| op.kind == OperationKind::Teardown)
            .cloned()
            .collect()
    }

    /// The stage as a forward continuation.
    pub fn io(&self) -> ExchangeIO {
        let state = Arc::clone(&self.state);
        Box::new(move |ops: OperationStream| {
            ops.filter_map(move |operation| future::ready(answer(&state, operation)))
                .boxed()
        })
    }
}

fn answer(state: &Mutex<FetchState>, operation: Operation) -> Option<OperationResult> {
    let mut state = state.lock();
    state.seen.push(operation.clone());
    if operation.kind == OperationKind::Teardown {
        return None;
    }

    let operation = Arc::new(operation);
    if !state.online {
        return Some(OperationResult::from_network_error(
            operation,
            NetworkError::new(OFFLINE_MESSAGE),
        ));
    }
    let data = state
        .responses
        .get(&operation.key)
        .cloned()
        .unwrap_or_else(|| Value::object(Default::default()));
    Some(OperationResult::new(operation, Some(data)))
}

impl Exchange for ScriptedFetch {
    fn build(&self, _input: ExchangeInput) -> ExchangeIO {
        self.io()
    }
}
