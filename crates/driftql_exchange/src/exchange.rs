//! Exchange composition.
//!
//! An exchange is one stage of the pipeline. Built with the client and a
//! `forward` continuation (the rest of the pipeline), it returns a function
//! from the stream of operations it receives to the stream of results it
//! produces. Exchanges compose front-to-back: the first exchange sees caller
//! operations first and its results are the ones the caller observes.

use std::sync::Arc;

use driftql_core::{Operation, OperationKind, OperationResult};
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tracing::warn;

use crate::client::Client;

/// Stream of operations entering a stage.
pub type OperationStream = BoxStream<'static, Operation>;

/// Stream of results leaving a stage.
pub type ResultStream = BoxStream<'static, OperationResult>;

/// A built stage: consumes one operation stream, produces one result stream.
pub type ExchangeIO = Box<dyn FnOnce(OperationStream) -> ResultStream + Send>;

/// What a stage is built with.
pub struct ExchangeInput {
    /// The owning client.
    pub client: Arc<dyn Client>,
    /// The rest of the pipeline.
    pub forward: ExchangeIO,
}

/// One pipeline stage.
pub trait Exchange: Send + Sync {
    /// Builds the stage around the rest of the pipeline.
    fn build(&self, input: ExchangeInput) -> ExchangeIO;
}

impl<F> Exchange for F
where
    F: Fn(ExchangeInput) -> ExchangeIO + Send + Sync,
{
    fn build(&self, input: ExchangeInput) -> ExchangeIO {
        self(input)
    }
}

/// Several exchanges acting as one.
pub struct ComposedExchange {
    exchanges: Vec<Box<dyn Exchange>>,
}

/// Composes exchanges front-to-back.
pub fn compose_exchanges(exchanges: Vec<Box<dyn Exchange>>) -> ComposedExchange {
    ComposedExchange { exchanges }
}

impl Exchange for ComposedExchange {
    fn build(&self, input: ExchangeInput) -> ExchangeIO {
        let ExchangeInput { client, forward } = input;
        self.exchanges
            .iter()
            .rev()
            .fold(forward, |forward, exchange| {
                exchange.build(ExchangeInput {
                    client: Arc::clone(&client),
                    forward,
                })
            })
    }
}

/// Runs `callback` once `stream` is exhausted.
pub(crate) fn on_end<S, F>(stream: S, callback: F) -> impl Stream<Item = S::Item>
where
    S: Stream,
    F: FnOnce(),
{
    stream.chain(
        stream::once(async move { callback() }).filter_map(|()| future::ready(None::<S::Item>)),
    )
}

/// Terminal stage: swallows everything that reaches the end of the pipeline.
///
/// Teardowns are expected to arrive here; anything else means no stage
/// handled the operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct FallbackExchange;

impl FallbackExchange {
    /// Returns a forward continuation that drops every operation.
    pub fn io() -> ExchangeIO {
        Box::new(|ops: OperationStream| {
            ops.filter_map(|operation| {
                if operation.kind != OperationKind::Teardown {
                    warn!(
                        kind = %operation.kind,
                        key = operation.key,
                        "no exchange handled operation; dropping it"
                    );
                }
                future::ready(None::<OperationResult>)
            })
            .boxed()
        })
    }
}

impl Exchange for FallbackExchange {
    fn build(&self, _input: ExchangeInput) -> ExchangeIO {
        Self::io()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExchangeResult;
    use driftql_core::{
        Document, GraphQLRequest, OperationContext, SerializedRequest, Value, Variables,
    };
    use parking_lot::Mutex;

    struct NoopClient;

    impl Client for NoopClient {
        fn create_request_operation(
            &self,
            kind: OperationKind,
            _request: &SerializedRequest,
        ) -> ExchangeResult<Operation> {
            Ok(operation(kind))
        }

        fn reexecute_operation(&self, _operation: Operation) {}
    }

    fn operation(kind: OperationKind) -> Operation {
        Operation::new(
            kind,
            GraphQLRequest::new(Document::default(), Variables::new()),
            OperationContext::default(),
        )
    }

    fn input(forward: ExchangeIO) -> ExchangeInput {
        ExchangeInput {
            client: Arc::new(NoopClient),
            forward,
        }
    }

    /// Answers every operation with a result whose data names the stages it
    /// passed, innermost last.
    fn echo() -> ExchangeIO {
        Box::new(|ops: OperationStream| {
            ops.map(|operation| {
                let data = Value::string(operation.context.url.clone().unwrap_or_default());
                OperationResult::new(Arc::new(operation), Some(data))
            })
            .boxed()
        })
    }

    fn tagging(tag: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Box<dyn Exchange> {
        Box::new(move |input: ExchangeInput| -> ExchangeIO {
            log.lock().push(tag);
            let forward = input.forward;
            Box::new(move |ops: OperationStream| {
                forward(
                    ops.map(move |mut operation| {
                        let mut url = operation.context.url.take().unwrap_or_default();
                        url.push_str(tag);
                        operation.context.url = Some(url);
                        operation
                    })
                    .boxed(),
                )
            })
        })
    }

    #[tokio::test]
    async fn composes_front_to_back() {
        let built = Arc::new(Mutex::new(Vec::new()));
        let composed = compose_exchanges(vec![
            tagging("a", Arc::clone(&built)),
            tagging("b", Arc::clone(&built)),
        ]);

        let io = composed.build(input(echo()));
        let results: Vec<_> = io(stream::iter(vec![operation(OperationKind::Query)]).boxed())
            .collect()
            .await;

        assert_eq!(results[0].data, Some(Value::string("ab")));
        // Built back-to-front so each stage can wrap the rest.
        assert_eq!(*built.lock(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn empty_composition_is_the_forward() {
        let io = compose_exchanges(vec![]).build(input(echo()));
        let results: Vec<_> = io(stream::iter(vec![operation(OperationKind::Query)]).boxed())
            .collect()
            .await;
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn on_end_runs_after_last_item() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&log);
        let ended = Arc::clone(&log);

        let items: Vec<i32> = on_end(
            stream::iter(vec![1, 2]).inspect(move |n| seen.lock().push(*n)),
            move || ended.lock().push(0),
        )
        .collect()
        .await;

        assert_eq!(items, vec![1, 2]);
        assert_eq!(*log.lock(), vec![1, 2, 0]);
    }

    #[tokio::test]
    async fn fallback_drops_everything() {
        let io = FallbackExchange.build(input(echo()));
        let results: Vec<_> = io(stream::iter(vec![
            operation(OperationKind::Query),
            operation(OperationKind::Teardown),
        ])
        .boxed())
        .collect()
        .await;
        assert!(results.is_empty());
    }
}
