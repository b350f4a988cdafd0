//! Command-line shell for supervising a local n8n instance.
//!
//! The binary in `main.rs` is the composition root; this library holds the
//! argument definitions and command handlers so they can be tested.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod config_commands;
pub mod handlers;
pub mod parser;
pub mod signals;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, RunArgs};
pub use config_commands::{ConfigCommand, PortCommand};
pub use parser::Cli;
