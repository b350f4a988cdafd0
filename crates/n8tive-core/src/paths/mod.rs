//! Path utilities for n8tive data directories and the service installation.
//!
//! This module provides the canonical path resolution for all components:
//! - Application data root (config file, child user folder)
//! - Logs directory
//! - Service installation directory
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O - owners handle user prompts separately

mod ensure;
mod error;
mod install;
mod platform;

#[cfg(test)]
mod test_utils;

pub use ensure::ensure_directory;
pub use error::PathError;
pub use install::resolve_install_dir;
pub use platform::{DATA_DIR_ENV, config_path, data_root, logs_dir};
