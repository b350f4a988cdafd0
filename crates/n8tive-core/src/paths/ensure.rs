//! Directory creation utilities.

use std::fs;
use std::path::Path;

use super::error::PathError;

/// Ensure the provided directory exists, creating it (and parents) if missing.
///
/// An existing non-directory at `path` is an error.
pub fn ensure_directory(path: &Path) -> Result<(), PathError> {
    if path.as_os_str().is_empty() {
        return Err(PathError::EmptyPath);
    }

    if path.exists() {
        if !path.is_dir() {
            return Err(PathError::NotADirectory(path.to_path_buf()));
        }
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|e| PathError::CreateFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
