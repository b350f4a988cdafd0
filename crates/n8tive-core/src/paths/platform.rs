//! Platform-specific data directory resolution.

use std::env;
use std::path::PathBuf;

use super::ensure::ensure_directory;
use super::error::PathError;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "N8TIVE_DATA_DIR";

const APP_DIR_NAME: &str = "n8tive";

/// Get the root directory for application data (config, child user folder).
///
/// Resolution order:
/// 1. `N8TIVE_DATA_DIR` environment variable (highest priority)
/// 2. System data directory (e.g., `~/.local/share/n8tive`)
///
/// The directory is created if it does not exist.
pub fn data_root() -> Result<PathBuf, PathError> {
    let root = match env::var(DATA_DIR_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => dirs::data_local_dir()
            .ok_or(PathError::NoDataDir)?
            .join(APP_DIR_NAME),
    };

    ensure_directory(&root)?;
    Ok(root)
}

/// Directory holding the child service's daily log files.
pub fn logs_dir() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("logs"))
}

/// Location of the persisted owner configuration.
pub fn config_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(crate::config_store::CONFIG_FILE_NAME))
}
