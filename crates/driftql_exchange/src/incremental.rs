//! Folding incremental deliveries into results.

use std::sync::Arc;

use driftql_core::{
    merge_result_patch, CoreError, Delivery, ExecutionResult, NetworkError, Operation,
    OperationResult,
};
use futures::future;
use futures::stream::{Stream, StreamExt};
use tracing::warn;

use crate::exchange::ResultStream;

/// Turns the raw payloads of one operation into a stream of results.
///
/// The first payload is a plain response; every later one is merged into the
/// previous result. An undecodable payload yields one error result and ends
/// the stream.
pub fn accumulate_incremental<S>(operation: Arc<Operation>, payloads: S) -> ResultStream
where
    S: Stream<Item = serde_json::Value> + Send + 'static,
{
    let mut previous: Option<OperationResult> = None;
    let mut failed = false;

    payloads
        .map(move |payload| {
            if failed {
                return None;
            }
            let next = match &previous {
                None => serde_json::from_value::<ExecutionResult>(payload)
                    .map(|response| OperationResult::from_response(Arc::clone(&operation), response))
                    .map_err(CoreError::from),
                Some(previous) => {
                    Delivery::from_json(payload).map(|delivery| merge_result_patch(previous, delivery))
                }
            };
            match next {
                Ok(result) => {
                    previous = Some(result.clone());
                    Some(result)
                }
                Err(err) => {
                    warn!(key = operation.key, error = %err, "undecodable payload");
                    failed = true;
                    Some(OperationResult::from_network_error(
                        Arc::clone(&operation),
                        NetworkError::new(err.to_string()),
                    ))
                }
            }
        })
        .take_while(|result| future::ready(result.is_some()))
        .filter_map(future::ready)
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftql_core::{
        Document, GraphQLRequest, OperationContext, OperationKind, Value, Variables,
    };
    use futures::stream;
    use serde_json::json;

    fn operation() -> Arc<Operation> {
        Arc::new(Operation::new(
            OperationKind::Query,
            GraphQLRequest::new(Document::default(), Variables::new()),
            OperationContext::default(),
        ))
    }

    #[tokio::test]
    async fn folds_deferred_payloads() {
        let payloads = vec![
            json!({ "data": { "author": { "id": "1" } }, "hasNext": true }),
            json!({
                "incremental": [{ "data": { "name": "Ada" }, "path": ["author"] }],
                "hasNext": true
            }),
            json!({ "hasNext": false }),
        ];

        let results: Vec<_> = accumulate_incremental(operation(), stream::iter(payloads))
            .collect()
            .await;

        assert_eq!(results.len(), 3);
        assert!(results[0].has_next);
        assert_eq!(
            results[1].data,
            Some(Value::from(json!({ "author": { "id": "1", "name": "Ada" } })))
        );
        assert!(!results[2].has_next);
        assert!(results[2]
            .data
            .as_ref()
            .unwrap()
            .ptr_eq(results[1].data.as_ref().unwrap()));
    }

    #[tokio::test]
    async fn stops_after_undecodable_payload() {
        let payloads = vec![
            json!({ "data": { "list": [] }, "hasNext": true }),
            json!("garbage"),
            json!({ "hasNext": false }),
        ];

        let results: Vec<_> = accumulate_incremental(operation(), stream::iter(payloads))
            .collect()
            .await;

        assert_eq!(results.len(), 2);
        let error = results[1].error.as_ref().unwrap();
        assert!(error.network_error.is_some());
    }
}
