//! Port definitions (trait abstractions) between the supervisor and its owner.
//!
//! Ports define the interfaces the runtime expects from its surroundings.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - Observers never receive process handles, only text
//! - Log sinks are best-effort and never fail the caller
//! - Errors are semantic, not OS-specific

pub mod log_sink;
pub mod observer;
pub mod supervisor_error;

pub use log_sink::LogSinkPort;
pub use observer::{Callbacks, NoopObserver, SupervisorObserver};
pub use supervisor_error::SupervisorError;
