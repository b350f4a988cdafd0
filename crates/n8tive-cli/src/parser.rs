//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for running n8n as a supervised local service.
#[derive(Parser)]
#[command(name = "n8tive")]
#[command(about = "Run and manage a local n8n instance")]
#[command(version)]
pub struct Cli {
    /// Override the application data directory for this invocation
    #[arg(long = "data-dir", global = true, env = "N8TIVE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
