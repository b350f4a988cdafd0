//! Settings domain types and validation.
//!
//! These are the only configuration values the supervisor consumes: the
//! preferred port and the network settings forwarded to the child service.
//! They are pure data types with no infrastructure dependencies.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// First port probed when no preferred port is configured.
pub const DEFAULT_BASE_PORT: u16 = 5678;

/// Number of consecutive ports probed before giving up.
pub const DEFAULT_MAX_PORT_ATTEMPTS: u16 = 100;

/// Grace period between the graceful and the forceful termination signal.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a child may stay in `Starting` before readiness is declared failed.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// Banner printed by n8n once its editor endpoint is serving.
pub const DEFAULT_READINESS_MARKER: &str = "Editor is now accessible via";

/// The child service only ever binds loopback.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Protocol passed to the child and used to build the ready URL.
pub const DEFAULT_PROTOCOL: &str = "http";

/// Log verbosity passed to the child.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Proxy configuration for corporate network environments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Whether the proxy is enabled.
    pub enabled: bool,
    /// Proxy server URL (e.g. `http://proxy.example.com:8080`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Comma-separated hosts that bypass the proxy (e.g. `localhost,127.0.0.1,*.local`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bypass: Option<String>,
}

impl ProxyConfig {
    /// Create an enabled proxy pointing at `server`.
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            enabled: true,
            server: Some(server.into()),
            bypass: None,
        }
    }

    /// Set the bypass list.
    #[must_use]
    pub fn with_bypass(mut self, bypass: impl Into<String>) -> Self {
        self.bypass = Some(bypass.into());
        self
    }

    /// The server address, only when the proxy is enabled and non-empty.
    pub fn active_server(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.server
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Custom CA certificate settings (e.g. for TLS-intercepting proxies).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaCertConfig {
    /// Whether the custom CA certificate is enabled.
    pub enabled: bool,
    /// Path to the CA certificate file (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl CaCertConfig {
    /// Create an enabled CA certificate descriptor.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            path: Some(path.into()),
        }
    }

    /// The certificate path, only when enabled and non-empty.
    pub fn active_path(&self) -> Option<&PathBuf> {
        if !self.enabled {
            return None;
        }
        self.path.as_ref().filter(|p| !p.as_os_str().is_empty())
    }
}

/// Network settings forwarded verbatim to the child's environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<CaCertConfig>,
}

impl NetworkSettings {
    /// True when neither descriptor is present.
    pub const fn is_empty(&self) -> bool {
        self.proxy.is_none() && self.ca_cert.is_none()
    }
}

/// Persisted owner configuration (`n8tive_config.json`).
///
/// All fields are optional: a missing file or key means "automatic".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Preferred port. When set, start uses exactly this port or fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<CaCertConfig>,
}

impl AppConfig {
    /// The network portion of the configuration.
    pub fn network_settings(&self) -> NetworkSettings {
        NetworkSettings {
            proxy: self.proxy.clone(),
            ca_cert: self.ca_cert.clone(),
        }
    }

    /// Replace both network descriptors at once.
    pub fn set_network_settings(&mut self, settings: NetworkSettings) {
        self.proxy = settings.proxy;
        self.ca_cert = settings.ca_cert;
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("Proxy is enabled but no proxy server is configured")]
    EmptyProxyServer,

    #[error("CA certificate is enabled but no certificate path is configured")]
    EmptyCaCertPath,
}

/// Validate configuration values before they are persisted.
pub fn validate_config(config: &AppConfig) -> Result<(), SettingsError> {
    if let Some(port) = config.port {
        if port < 1024 {
            return Err(SettingsError::InvalidPort(port));
        }
    }

    if let Some(proxy) = &config.proxy {
        if proxy.enabled && proxy.active_server().is_none() {
            return Err(SettingsError::EmptyProxyServer);
        }
    }

    if let Some(ca) = &config.ca_cert {
        if ca.enabled && ca.active_path().is_none() {
            return Err(SettingsError::EmptyCaCertPath);
        }
    }

    Ok(())
}
