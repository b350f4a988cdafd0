//! Error taxonomy for supervisor operations.
//!
//! Every variant is fatal to the `start` attempt that produced it, never to
//! the host process. A child that exits on its own is not an error: it is an
//! observed transition back to `Idle`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced by the port allocator and the process supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupervisorError {
    /// Neither the configured override nor the packaged default exists.
    #[error("Service installation not found at {}", path.display())]
    InstallationNotFound { path: PathBuf },

    /// The preferred port is busy. There is no fallback to scanning.
    #[error("Port {0} is already in use. Please choose a different port.")]
    PortUnavailable(u16),

    /// Every candidate in the scanned range was busy.
    #[error("No available port found in range {start}-{end}")]
    PortExhausted { start: u16, end: u16 },

    /// The OS could not create the child process.
    #[error("Failed to spawn service: {0}")]
    SpawnFailure(String),

    /// `start` was called while a child already exists.
    #[error("Service is already running")]
    AlreadyRunning,

    /// The readiness marker was not seen in time.
    #[error("Service did not report readiness within {0:?}")]
    ReadinessTimeout(Duration),

    /// The log sink could not be opened.
    #[error("Failed to open service log: {0}")]
    LogSink(String),
}

impl SupervisorError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub const fn as_label(&self) -> &'static str {
        match self {
            Self::InstallationNotFound { .. } => "installation_not_found",
            Self::PortUnavailable(_) => "port_unavailable",
            Self::PortExhausted { .. } => "port_exhausted",
            Self::SpawnFailure(_) => "spawn_failure",
            Self::AlreadyRunning => "already_running",
            Self::ReadinessTimeout(_) => "readiness_timeout",
            Self::LogSink(_) => "log_sink",
        }
    }
}
