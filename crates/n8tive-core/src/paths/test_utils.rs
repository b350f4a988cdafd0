//! Isolation for tests that point `N8TIVE_DATA_DIR` somewhere else.

use std::env;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Mutex;

use super::platform::DATA_DIR_ENV;

/// Serializes tests that touch the process environment.
pub static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Overrides the data root until dropped, then restores the previous value.
pub struct DataDirOverride {
    previous: Option<OsString>,
}

impl DataDirOverride {
    #[allow(unsafe_code)]
    pub fn new(root: &Path) -> Self {
        let previous = env::var_os(DATA_DIR_ENV);
        // SAFETY: callers hold ENV_LOCK
        unsafe { env::set_var(DATA_DIR_ENV, root) };
        Self { previous }
    }
}

impl Drop for DataDirOverride {
    #[allow(unsafe_code)]
    fn drop(&mut self) {
        // SAFETY: callers hold ENV_LOCK
        match self.previous.take() {
            Some(value) => unsafe { env::set_var(DATA_DIR_ENV, value) },
            None => unsafe { env::remove_var(DATA_DIR_ENV) },
        }
    }
}
