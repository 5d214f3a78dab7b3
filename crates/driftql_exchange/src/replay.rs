//! The replay queue.
//!
//! Operations that failed while offline are held here in arrival order and
//! replayed when connectivity returns. Only mutations are persisted; queued
//! queries are in-memory only.

use std::sync::Arc;

use driftql_core::{Operation, OperationKind, SerializedRequest};
use futures::channel::mpsc::UnboundedSender;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::client::Client;
use crate::storage::MetadataSink;

/// A queued operation with its persisted form.
#[derive(Debug, Clone)]
pub struct ReplayEntry {
    /// The operation to replay.
    pub operation: Operation,
    /// Persisted form.
    pub serialized: SerializedRequest,
}

struct QueueState {
    entries: Vec<ReplayEntry>,
    flushing: bool,
}

/// FIFO of operations awaiting replay.
///
/// `enqueue`, `flush` and `clear` are the only mutators. The lock is never
/// held while calling into the client, the rebound channel or the sink, so
/// those may re-enter the queue freely.
pub struct ReplayQueue {
    state: Mutex<QueueState>,
    client: Arc<dyn Client>,
    rebound: UnboundedSender<Operation>,
    sink: Arc<dyn MetadataSink>,
}

impl ReplayQueue {
    /// Creates an empty queue.
    ///
    /// Teardowns are pushed into `rebound`; replays go through `client`;
    /// snapshots of queued mutations go to `sink`.
    pub fn new(
        client: Arc<dyn Client>,
        rebound: UnboundedSender<Operation>,
        sink: Arc<dyn MetadataSink>,
    ) -> Self {
        Self {
            state: Mutex::new(QueueState {
                entries: Vec::new(),
                flushing: false,
            }),
            client,
            rebound,
            sink,
        }
    }

    /// Appends an operation and persists the queued mutations.
    pub fn enqueue(&self, operation: Operation) {
        let serialized = operation.to_serialized();
        let snapshot = {
            let mut state = self.state.lock();
            state.entries.push(ReplayEntry {
                operation,
                serialized,
            });
            debug!(queued = state.entries.len(), "operation queued for replay");
            persisted(&state.entries)
        };
        self.sink.persist(snapshot);
    }

    /// Replays every queued operation.
    ///
    /// Mutations are torn down first, then each entry is re-executed in queue
    /// order. The queue is then emptied, including anything enqueued while
    /// the flush ran, and the empty list persisted. Nested calls are ignored.
    pub fn flush(&self) {
        let replay: Vec<Operation> = {
            let mut state = self.state.lock();
            if state.flushing {
                trace!("flush already running");
                return;
            }
            state.flushing = true;
            state.entries.iter().map(|e| e.operation.clone()).collect()
        };

        if !replay.is_empty() {
            debug!(entries = replay.len(), "replaying queued operations");
        }

        for operation in replay.iter().filter(|op| op.kind == OperationKind::Mutation) {
            if self
                .rebound
                .unbounded_send(operation.with_kind(OperationKind::Teardown))
                .is_err()
            {
                trace!(key = operation.key, "pipeline closed; teardown dropped");
            }
        }

        for operation in &replay {
            self.client.reexecute_operation(operation.clone());
        }

        {
            let mut state = self.state.lock();
            state.entries.clear();
            state.flushing = false;
        }
        self.sink.persist(Vec::new());
    }

    /// Drops every queued entry and persists the empty queue.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
        self.sink.persist(Vec::new());
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Queued operations in replay order.
    pub fn operations(&self) -> Vec<Operation> {
        self.state
            .lock()
            .entries
            .iter()
            .map(|e| e.operation.clone())
            .collect()
    }

    /// What would be persisted right now.
    pub fn serialized(&self) -> Vec<SerializedRequest> {
        persisted(&self.state.lock().entries)
    }
}

fn persisted(entries: &[ReplayEntry]) -> Vec<SerializedRequest> {
    entries
        .iter()
        .filter(|e| e.operation.kind == OperationKind::Mutation)
        .map(|e| e.serialized.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExchangeResult;
    use driftql_core::{
        ast::{Field, Selection},
        Document, GraphQLRequest, OperationContext, Variables,
    };
    use futures::channel::mpsc;
    use std::sync::Weak;

    #[derive(Default)]
    struct Recorder {
        reexecuted: Mutex<Vec<Operation>>,
        snapshots: Mutex<Vec<Vec<SerializedRequest>>>,
        reenter: Mutex<Option<Weak<ReplayQueue>>>,
    }

    struct TestClient(Arc<Recorder>);

    impl Client for TestClient {
        fn create_request_operation(
            &self,
            kind: OperationKind,
            _request: &SerializedRequest,
        ) -> ExchangeResult<Operation> {
            Ok(operation(kind, "x"))
        }

        fn reexecute_operation(&self, operation: Operation) {
            self.0.reexecuted.lock().push(operation);
            let queue = self.0.reenter.lock().as_ref().and_then(Weak::upgrade);
            if let Some(queue) = queue {
                queue.flush();
            }
        }
    }

    struct TestSink(Arc<Recorder>);

    impl MetadataSink for TestSink {
        fn persist(&self, requests: Vec<SerializedRequest>) {
            self.0.snapshots.lock().push(requests);
        }
    }

    fn operation(kind: OperationKind, field: &str) -> Operation {
        let document = Document::operation(kind, vec![Selection::Field(Field::leaf(field))]);
        Operation::new(
            kind,
            GraphQLRequest::new(document, Variables::new()),
            OperationContext::default(),
        )
    }

    fn queue() -> (Arc<ReplayQueue>, Arc<Recorder>, mpsc::UnboundedReceiver<Operation>) {
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = mpsc::unbounded();
        let queue = Arc::new(ReplayQueue::new(
            Arc::new(TestClient(Arc::clone(&recorder))),
            tx,
            Arc::new(TestSink(Arc::clone(&recorder))),
        ));
        (queue, recorder, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Operation>) -> Vec<Operation> {
        let mut out = Vec::new();
        while let Ok(Some(op)) = rx.try_next() {
            out.push(op);
        }
        out
    }

    #[test]
    fn enqueue_persists_mutations_only() {
        let (queue, recorder, _rx) = queue();

        queue.enqueue(operation(OperationKind::Mutation, "addItem"));
        queue.enqueue(operation(OperationKind::Query, "items"));

        assert_eq!(queue.len(), 2);
        let snapshots = recorder.snapshots.lock();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].len(), 1);
        assert!(snapshots[1][0].query.contains("addItem"));
    }

    #[test]
    fn flush_tears_down_mutations_then_replays_in_order() {
        let (queue, recorder, mut rx) = queue();
        queue.enqueue(operation(OperationKind::Mutation, "first"));
        queue.enqueue(operation(OperationKind::Query, "second"));
        queue.enqueue(operation(OperationKind::Mutation, "third"));

        queue.flush();

        let teardowns = drain(&mut rx);
        assert_eq!(teardowns.len(), 2);
        assert!(teardowns.iter().all(|op| op.kind == OperationKind::Teardown));

        let replayed = recorder.reexecuted.lock();
        let kinds: Vec<_> = replayed.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![OperationKind::Mutation, OperationKind::Query, OperationKind::Mutation]
        );
        assert_eq!(teardowns[0].key, replayed[0].key);
        assert_eq!(teardowns[1].key, replayed[2].key);

        assert!(queue.is_empty());
        assert_eq!(recorder.snapshots.lock().last(), Some(&Vec::new()));
    }

    #[test]
    fn flush_of_empty_queue_persists_empty_list() {
        let (queue, recorder, mut rx) = queue();
        queue.flush();
        assert!(drain(&mut rx).is_empty());
        assert!(recorder.reexecuted.lock().is_empty());
        assert_eq!(*recorder.snapshots.lock(), vec![Vec::new()]);
    }

    #[test]
    fn nested_flush_is_ignored() {
        let (queue, recorder, _rx) = queue();
        *recorder.reenter.lock() = Some(Arc::downgrade(&queue));
        queue.enqueue(operation(OperationKind::Mutation, "a"));
        queue.enqueue(operation(OperationKind::Mutation, "b"));

        queue.flush();

        assert_eq!(recorder.reexecuted.lock().len(), 2);
        assert!(queue.is_empty());
    }

    /// Client that re-queues whatever it is asked to replay, as happens when
    /// the replayed operation fails offline again.
    struct Requeue(Mutex<Option<Weak<ReplayQueue>>>);

    impl Client for Requeue {
        fn create_request_operation(
            &self,
            kind: OperationKind,
            _request: &SerializedRequest,
        ) -> ExchangeResult<Operation> {
            Ok(operation(kind, "x"))
        }

        fn reexecute_operation(&self, operation: Operation) {
            let queue = self.0.lock().as_ref().and_then(Weak::upgrade);
            if let Some(queue) = queue {
                queue.enqueue(operation);
            }
        }
    }

    #[test]
    fn flush_empties_queue_even_if_replay_requeues() {
        let client = Arc::new(Requeue(Mutex::new(None)));
        let recorder = Arc::new(Recorder::default());
        let (tx, _rx) = mpsc::unbounded();
        let queue = Arc::new(ReplayQueue::new(
            client.clone(),
            tx,
            Arc::new(TestSink(Arc::clone(&recorder))),
        ));
        *client.0.lock() = Some(Arc::downgrade(&queue));

        queue.enqueue(operation(OperationKind::Mutation, "a"));
        queue.flush();

        assert!(queue.is_empty());
        let snapshots = recorder.snapshots.lock();
        // enqueue, re-enqueue during replay, then the flush itself
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[1].len(), 2);
        assert_eq!(snapshots.last(), Some(&Vec::new()));
    }

    #[test]
    fn clear_empties_and_persists() {
        let (queue, recorder, _rx) = queue();
        queue.enqueue(operation(OperationKind::Mutation, "a"));
        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.serialized().is_empty());
        assert_eq!(recorder.snapshots.lock().last(), Some(&Vec::new()));
    }

    #[test]
    fn closed_pipeline_does_not_stop_replay() {
        let (queue, recorder, rx) = queue();
        drop(rx);
        queue.enqueue(operation(OperationKind::Mutation, "a"));
        queue.flush();
        assert_eq!(recorder.reexecuted.lock().len(), 1);
    }
}
