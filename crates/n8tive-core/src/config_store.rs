//! JSON persistence of the owner configuration.
//!
//! The store reads and writes `n8tive_config.json` in the data root. Every
//! accessor reloads the file so edits made by other tools are picked up.
//! A missing file means "all defaults"; a corrupt file is logged and treated
//! the same way rather than blocking startup.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::paths::{PathError, config_path};
use crate::settings::{
    AppConfig, CaCertConfig, NetworkSettings, ProxyConfig, SettingsError, validate_config,
};

/// File name of the persisted configuration inside the data root.
pub const CONFIG_FILE_NAME: &str = "n8tive_config.json";

/// Errors from reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("Failed to parse config file {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error(transparent)]
    Invalid(#[from] SettingsError),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Reads and writes the owner's `AppConfig`.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location inside the data root.
    pub fn open_default() -> Result<Self, ConfigError> {
        Ok(Self::new(config_path()?))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, falling back to defaults on any read problem.
    pub fn load(&self) -> AppConfig {
        match self.try_load() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                AppConfig::default()
            }
        }
    }

    /// Load the configuration, reporting unreadable or corrupt files.
    ///
    /// A missing file is not an error.
    pub fn try_load(&self) -> Result<AppConfig, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AppConfig::default()),
            Err(e) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Validate and persist the configuration as pretty JSON.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        validate_config(config)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                crate::paths::ensure_directory(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(config).map_err(|e| ConfigError::Parse {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        fs::write(&self.path, content).map_err(|e| ConfigError::Io {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        debug!(path = %self.path.display(), "Saved config");
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut AppConfig)) -> Result<(), ConfigError> {
        let mut config = self.load();
        f(&mut config);
        self.save(&config)
    }

    /// Preferred port, if configured.
    pub fn port(&self) -> Option<u16> {
        self.load().port
    }

    pub fn set_port(&self, port: u16) -> Result<(), ConfigError> {
        self.update(|c| c.port = Some(port))
    }

    /// Return to automatic port discovery.
    pub fn clear_port(&self) -> Result<(), ConfigError> {
        self.update(|c| c.port = None)
    }

    pub fn proxy(&self) -> Option<ProxyConfig> {
        self.load().proxy
    }

    pub fn set_proxy(&self, proxy: ProxyConfig) -> Result<(), ConfigError> {
        self.update(|c| c.proxy = Some(proxy))
    }

    pub fn clear_proxy(&self) -> Result<(), ConfigError> {
        self.update(|c| c.proxy = None)
    }

    pub fn ca_cert(&self) -> Option<CaCertConfig> {
        self.load().ca_cert
    }

    pub fn set_ca_cert(&self, ca_cert: CaCertConfig) -> Result<(), ConfigError> {
        self.update(|c| c.ca_cert = Some(ca_cert))
    }

    pub fn clear_ca_cert(&self) -> Result<(), ConfigError> {
        self.update(|c| c.ca_cert = None)
    }

    pub fn network_settings(&self) -> NetworkSettings {
        self.load().network_settings()
    }

    pub fn set_network_settings(&self, settings: NetworkSettings) -> Result<(), ConfigError> {
        self.update(|c| c.set_network_settings(settings))
    }

    /// Delete the configuration file entirely. A missing file is fine.
    pub fn reset(&self) -> Result<(), ConfigError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ConfigError::Io {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }
}
