//! CLI composition root: resolves directories and opens the settings store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use n8tive_core::{CONFIG_FILE_NAME, ConfigStore, data_root, ensure_directory};

/// Inputs for building a [`CliContext`].
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Explicit data directory (`--data-dir`), otherwise the platform default.
    pub data_dir: Option<PathBuf>,
}

impl CliConfig {
    pub fn with_defaults() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        self.data_dir = data_dir;
        self
    }
}

/// Resolved directories and stores shared by all handlers.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub data_root: PathBuf,
    pub logs_dir: PathBuf,
    pub store: ConfigStore,
}

/// Resolve directories (creating them) and open the settings store.
pub fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let data_root = match config.data_dir {
        Some(dir) => {
            ensure_directory(&dir)
                .with_context(|| format!("Cannot use data directory {}", dir.display()))?;
            dir
        }
        None => data_root().context("Cannot resolve the application data directory")?,
    };
    let logs_dir = data_root.join("logs");
    ensure_directory(&logs_dir)?;
    let store = ConfigStore::new(data_root.join(CONFIG_FILE_NAME));

    Ok(CliContext {
        data_root,
        logs_dir,
        store,
    })
}
