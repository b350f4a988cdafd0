//! Service installation directory resolution.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ports::SupervisorError;

/// Resolve where the child service is installed.
///
/// A configured override wins and must exist: there is no silent fallback
/// to the packaged default when an override was given. Without an override
/// the packaged default is used if it exists.
pub fn resolve_install_dir(
    override_path: Option<&Path>,
    packaged_default: &Path,
) -> Result<PathBuf, SupervisorError> {
    let candidate = match override_path {
        Some(path) if !path.as_os_str().is_empty() => path,
        _ => packaged_default,
    };

    if candidate.exists() {
        debug!(path = %candidate.display(), "Resolved service installation");
        Ok(candidate.to_path_buf())
    } else {
        Err(SupervisorError::InstallationNotFound {
            path: candidate.to_path_buf(),
        })
    }
}
