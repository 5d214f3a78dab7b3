//! Merge command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use driftql_core::{
    merge_result_patch, Delivery, Document, ExecutionResult, GraphQLRequest, Operation,
    OperationContext, OperationKind, OperationResult, Variables,
};
use tracing::debug;

use super::{read_json, CliError, CliResult, Format};

/// Folds `payloads` into the response stored in `base`, in order.
pub fn merge_files(base: &Path, payloads: &[PathBuf]) -> CliResult<OperationResult> {
    let response: ExecutionResult = read_json(base)?;
    let operation = Arc::new(Operation::new(
        OperationKind::Query,
        GraphQLRequest::new(Document::default(), Variables::new()),
        OperationContext::default(),
    ));
    let mut result = OperationResult::from_response(operation, response);

    for path in payloads {
        let payload: serde_json::Value = read_json(path)?;
        let delivery = Delivery::from_json(payload).map_err(|source| CliError::Payload {
            path: path.clone(),
            source,
        })?;
        debug!(payload = %path.display(), "merging payload");
        result = merge_result_patch(&result, delivery);
    }

    Ok(result)
}

/// Runs the merge command.
pub fn run(base: &Path, payloads: &[PathBuf], format: Format) -> CliResult<()> {
    let result = merge_files(base, payloads)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result.to_response_json())?),
        Format::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &OperationResult) {
    println!("Merged Result");
    println!("=============");
    println!("has next: {}", result.has_next);
    match &result.error {
        Some(error) => println!("errors:\n{}", error.message()),
        None => println!("errors: none"),
    }
    match &result.data {
        Some(data) => println!("data: {data}"),
        None => println!("data: none"),
    }
}
