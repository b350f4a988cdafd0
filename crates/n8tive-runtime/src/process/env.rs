//! Child environment construction.
//!
//! The child inherits the supervisor's environment; these values are
//! overlaid on top. They are write-only configuration for the child and
//! are never read back.

use std::collections::BTreeMap;
use std::path::Path;

use n8tive_core::{LOOPBACK_HOST, NetworkSettings};

use super::config::SupervisorConfig;

const PROXY_KEYS: [&str; 4] = ["HTTP_PROXY", "HTTPS_PROXY", "http_proxy", "https_proxy"];
const NO_PROXY_KEYS: [&str; 2] = ["NO_PROXY", "no_proxy"];
const CA_CERT_KEY: &str = "NODE_EXTRA_CA_CERTS";
const NODE_PATH_KEY: &str = "NODE_PATH";

/// Build the environment overlay for one spawn.
pub fn build_environment(
    config: &SupervisorConfig,
    install_dir: &Path,
    port: u16,
    network: &NetworkSettings,
) -> BTreeMap<String, String> {
    let keys = &config.env_keys;
    let mut env = BTreeMap::new();

    env.insert(keys.port.clone(), port.to_string());
    env.insert(keys.host.clone(), LOOPBACK_HOST.to_string());
    env.insert(keys.protocol.clone(), config.protocol.clone());
    env.insert(keys.log_level.clone(), config.log_level.clone());
    env.insert(
        keys.user_folder.clone(),
        config.data_dir.to_string_lossy().into_owned(),
    );

    if let Some(subdir) = &config.modules_subdir {
        env.insert(
            NODE_PATH_KEY.to_string(),
            install_dir.join(subdir).to_string_lossy().into_owned(),
        );
    }

    if let Some(proxy) = &network.proxy {
        if let Some(server) = proxy.active_server() {
            for key in PROXY_KEYS {
                env.insert(key.to_string(), server.to_string());
            }
            if let Some(bypass) = proxy.bypass.as_deref().filter(|b| !b.trim().is_empty()) {
                for key in NO_PROXY_KEYS {
                    env.insert(key.to_string(), bypass.to_string());
                }
            }
        }
    }

    if let Some(path) = network.ca_cert.as_ref().and_then(|ca| ca.active_path()) {
        env.insert(CA_CERT_KEY.to_string(), path.to_string_lossy().into_owned());
    }

    env
}
