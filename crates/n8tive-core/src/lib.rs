//! Core domain types and port definitions for n8tive.
//!
//! This crate holds everything the supervisor and its owners share without
//! touching processes or sockets:
//!
//! - `settings` - network settings, persisted config shape and defaults
//! - `config_store` - JSON persistence of the owner's configuration
//! - `domain` - log records and the supervisor state machine vocabulary
//! - `ports` - observer and log sink traits plus the supervisor error taxonomy
//! - `paths` - data, log and installation directory resolution

pub mod config_store;
pub mod domain;
pub mod paths;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use config_store::{CONFIG_FILE_NAME, ConfigError, ConfigStore};
pub use domain::{ExitReport, LogRecord, LogSource, SupervisorState};
pub use paths::{
    PathError, config_path, data_root, ensure_directory, logs_dir, resolve_install_dir,
};
pub use ports::{Callbacks, LogSinkPort, NoopObserver, SupervisorError, SupervisorObserver};
pub use settings::{
    AppConfig, CaCertConfig, DEFAULT_BASE_PORT, DEFAULT_LOG_LEVEL, DEFAULT_MAX_PORT_ATTEMPTS,
    DEFAULT_PROTOCOL, DEFAULT_READINESS_MARKER, DEFAULT_READY_TIMEOUT, DEFAULT_STOP_TIMEOUT,
    LOOPBACK_HOST, NetworkSettings, ProxyConfig, SettingsError, validate_config,
};
