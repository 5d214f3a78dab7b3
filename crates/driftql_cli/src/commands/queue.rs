//! Queue command implementation.
//!
//! Shows a persisted replay queue: the JSON list of serialized mutations an
//! offline client writes to its metadata storage.

use std::path::Path;

use driftql_core::SerializedRequest;
use serde::Serialize;

use super::{read_json, CliResult, Format};

/// Summary of one queued request.
#[derive(Debug, Serialize, PartialEq)]
pub struct QueueEntry {
    /// Position in replay order.
    pub position: usize,
    /// First line of the query text.
    pub summary: String,
    /// Names of the variables supplied.
    pub variables: Vec<String>,
}

/// Loads and summarizes a persisted queue.
pub fn inspect(path: &Path) -> CliResult<Vec<QueueEntry>> {
    let requests: Vec<SerializedRequest> = read_json(path)?;
    Ok(requests
        .iter()
        .enumerate()
        .map(|(position, request)| QueueEntry {
            position,
            summary: summarize(&request.query),
            variables: request.variables.keys().cloned().collect(),
        })
        .collect())
}

/// Runs the queue command.
pub fn run(path: &Path, format: Format) -> CliResult<()> {
    let entries = inspect(path)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        Format::Text => {
            println!("Replay Queue: {}", path.display());
            println!("==============");
            if entries.is_empty() {
                println!("(empty)");
            }
            for entry in &entries {
                println!(
                    "{:>3}  {}  [{}]",
                    entry.position,
                    entry.summary,
                    entry.variables.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn summarize(query: &str) -> String {
    let first_line = query.lines().next().unwrap_or_default();
    first_line.trim_end().trim_end_matches('{').trim_end().to_string()
}
