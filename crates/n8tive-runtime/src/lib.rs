//! Process supervision runtime for n8tive.
//!
//! Launches a bundled web service as a child process on a free loopback
//! port, captures its output into dated log files, detects readiness from
//! its stdout and terminates it gracefully with a forceful fallback.

#![deny(unsafe_code)]

pub mod process;

pub use process::{
    DEFAULT_LOG_PREFIX, EnvKeys, FileLogSink, ServiceCommand, ServiceSupervisor,
    SupervisorConfig, build_environment, find_available, find_available_default, probe,
};
