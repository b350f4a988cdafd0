//! Top-level subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::config_commands::{ConfigCommand, PortCommand};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Start n8n and supervise it until Ctrl-C
    Run(RunArgs),
    /// View or change persisted settings (port, proxy, CA certificate)
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Show where service logs are written and print the latest lines
    Logs {
        /// Number of trailing lines to print
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
    },
    /// Inspect local port availability
    Port {
        #[command(subcommand)]
        command: PortCommand,
    },
}

/// Arguments for `n8tive run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Use exactly this port (fails if it is in use). Overrides the saved port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory containing the n8n distribution
    #[arg(long = "install-dir", env = "N8N_DIST_PATH")]
    pub install_dir: Option<PathBuf>,

    /// Stdout text signalling that n8n is ready
    #[arg(long)]
    pub marker: Option<String>,

    /// Seconds to wait for readiness before giving up (0 disables)
    #[arg(long = "ready-timeout")]
    pub ready_timeout: Option<u64>,
}
