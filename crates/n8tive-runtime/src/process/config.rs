//! Supervisor configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use n8tive_core::{
    DEFAULT_BASE_PORT, DEFAULT_LOG_LEVEL, DEFAULT_MAX_PORT_ATTEMPTS, DEFAULT_PROTOCOL,
    DEFAULT_READINESS_MARKER, DEFAULT_READY_TIMEOUT, DEFAULT_STOP_TIMEOUT,
};

use super::logs::DEFAULT_LOG_PREFIX;

/// Program and arguments used to launch the child service.
///
/// Relative paths in `args` resolve against the installation directory,
/// which is the child's working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ServiceCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// Names of the environment variables the supervisor sets on the child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvKeys {
    pub port: String,
    pub host: String,
    pub protocol: String,
    pub log_level: String,
    pub user_folder: String,
}

impl Default for EnvKeys {
    fn default() -> Self {
        Self {
            port: "N8N_PORT".to_string(),
            host: "N8N_HOST".to_string(),
            protocol: "N8N_PROTOCOL".to_string(),
            log_level: "N8N_LOG_LEVEL".to_string(),
            user_folder: "N8N_USER_FOLDER".to_string(),
        }
    }
}

/// Everything the supervisor needs to launch and watch one child service.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub command: ServiceCommand,
    /// Configured installation override. Must exist when set.
    pub install_override: Option<PathBuf>,
    /// Installation shipped with the application.
    pub packaged_install: PathBuf,
    /// Working/user-data directory handed to the child.
    pub data_dir: PathBuf,
    /// Directory receiving the daily service log files.
    pub log_dir: PathBuf,
    pub log_prefix: String,
    /// Substring of a stdout line that marks the service as ready.
    pub readiness_marker: String,
    pub base_port: u16,
    pub max_port_attempts: u16,
    /// Grace period between SIGTERM and SIGKILL.
    pub stop_timeout: Duration,
    /// Give up on readiness after this long. `None` waits forever.
    pub ready_timeout: Option<Duration>,
    pub protocol: String,
    pub log_level: String,
    pub env_keys: EnvKeys,
    /// Sub-directory of the installation exported as `NODE_PATH`.
    pub modules_subdir: Option<PathBuf>,
    /// Also report every stderr line through `on_error`.
    pub escalate_secondary_output: bool,
}

impl SupervisorConfig {
    /// Generic configuration for an arbitrary service command.
    pub fn new(
        command: ServiceCommand,
        packaged_install: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            command,
            install_override: None,
            packaged_install: packaged_install.into(),
            data_dir: data_dir.into(),
            log_dir: log_dir.into(),
            log_prefix: DEFAULT_LOG_PREFIX.to_string(),
            readiness_marker: DEFAULT_READINESS_MARKER.to_string(),
            base_port: DEFAULT_BASE_PORT,
            max_port_attempts: DEFAULT_MAX_PORT_ATTEMPTS,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            ready_timeout: Some(DEFAULT_READY_TIMEOUT),
            protocol: DEFAULT_PROTOCOL.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            env_keys: EnvKeys::default(),
            modules_subdir: None,
            escalate_secondary_output: false,
        }
    }

    /// Preset for a bundled n8n distribution (`node_modules/n8n/bin/n8n start`).
    pub fn n8n(
        packaged_install: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
    ) -> Self {
        let command = ServiceCommand::new("node")
            .arg(Path::new("node_modules").join("n8n").join("bin").join("n8n").to_string_lossy())
            .arg("start");
        let mut config = Self::new(command, packaged_install, data_dir, log_dir);
        config.modules_subdir = Some(PathBuf::from("node_modules"));
        config
    }

    #[must_use]
    pub fn with_install_override(mut self, path: Option<PathBuf>) -> Self {
        self.install_override = path;
        self
    }

    #[must_use]
    pub fn with_readiness_marker(mut self, marker: impl Into<String>) -> Self {
        self.readiness_marker = marker.into();
        self
    }

    #[must_use]
    pub const fn with_port_range(mut self, base_port: u16, max_attempts: u16) -> Self {
        self.base_port = base_port;
        self.max_port_attempts = max_attempts;
        self
    }

    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_ready_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.ready_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_secondary_escalation(mut self, escalate: bool) -> Self {
        self.escalate_secondary_output = escalate;
        self
    }
}
