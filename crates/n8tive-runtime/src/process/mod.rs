//! Child service supervision.
//!
//! # Structure
//!
//! - `ServiceSupervisor` - Lifecycle state machine for one child service
//! - `SupervisorConfig` / `ServiceCommand` - What to launch and how
//! - `FileLogSink` - Dated log file plus in-memory tail of captured output
//! - `probe` / `find_available` - Loopback port allocation
//! - `build_environment` - Environment overlay handed to the child

mod config;
mod env;
mod logs;
mod ports;
pub mod shutdown;
mod stream;
mod supervisor;

pub use config::{EnvKeys, ServiceCommand, SupervisorConfig};
pub use env::build_environment;
pub use logs::{DEFAULT_LOG_PREFIX, FileLogSink};
pub use ports::{find_available, find_available_default, probe};
pub use supervisor::ServiceSupervisor;
