//! Command handlers.
//!
//! Handlers follow the pattern `execute(ctx, ...) -> Result<()>`: validate
//! CLI input, call into core/runtime, format output for the terminal.

pub mod config;
pub mod logs;
pub mod port;
pub mod run;
