//! DriftQL CLI
//!
//! Command-line tools for inspecting DriftQL client state.
//!
//! # Commands
//!
//! - `merge` - Fold incremental payload files into a base response
//! - `queue` - Show a persisted replay queue
//! - `classify` - Check whether a transport error counts as offline

mod commands;

use clap::{Parser, Subcommand};
use commands::Format;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DriftQL command-line tools.
#[derive(Parser)]
#[command(name = "driftql")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fold incremental payloads into a base response
    Merge {
        /// Base response (JSON)
        base: PathBuf,

        /// Payload envelopes (JSON), applied in order
        payloads: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
    },

    /// Show a persisted replay queue
    Queue {
        /// Persisted queue (JSON list of serialized requests)
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Check whether a transport error counts as offline
    Classify {
        /// Transport error message
        message: String,

        /// The server sent a response
        #[arg(long)]
        has_response: bool,

        /// The host reports no connectivity
        #[arg(long)]
        host_offline: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Merge {
            base,
            payloads,
            format,
        } => {
            commands::merge::run(&base, &payloads, format)?;
        }
        Commands::Queue { path, format } => {
            commands::queue::run(&path, format)?;
        }
        Commands::Classify {
            message,
            has_response,
            host_offline,
        } => {
            commands::classify::run(&message, has_response, host_offline);
        }
        Commands::Version => {
            println!("DriftQL CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
