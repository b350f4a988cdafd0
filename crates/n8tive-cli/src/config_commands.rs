//! Configuration and port subcommands.

use std::path::PathBuf;

use clap::Subcommand;
use n8tive_core::{DEFAULT_BASE_PORT, DEFAULT_MAX_PORT_ATTEMPTS};

/// Configuration management commands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show all saved settings
    Show,
    /// Print the settings file location
    Path,
    /// Delete the settings file and return to defaults
    Reset,
    /// Always run n8n on this port (>= 1024)
    SetPort {
        port: u16,
    },
    /// Go back to automatic port selection
    ClearPort,
    /// Route n8n's outbound traffic through a proxy
    SetProxy {
        /// Proxy server URL, e.g. http://proxy.corp:3128
        #[arg(long)]
        server: String,
        /// Comma-separated hosts that bypass the proxy
        #[arg(long)]
        bypass: Option<String>,
    },
    /// Remove the proxy configuration
    ClearProxy,
    /// Trust an extra CA certificate bundle (PEM)
    SetCaCert {
        path: PathBuf,
    },
    /// Remove the extra CA certificate
    ClearCaCert,
}

/// Port inspection commands.
#[derive(Subcommand)]
pub enum PortCommand {
    /// Check whether a port is free on 127.0.0.1
    Check {
        port: u16,
    },
    /// Find the first free port starting at `--start`
    Find {
        #[arg(long, default_value_t = DEFAULT_BASE_PORT)]
        start: u16,
        #[arg(long, default_value_t = DEFAULT_MAX_PORT_ATTEMPTS)]
        attempts: u16,
    },
}
