//! Proxy configuration.
//!
//! A JSON file mirroring the shape `{useProxy, proxyProtocol, proxyHost,
//! proxyPort, proxyAuth: {username, password}}`. Any read or parse failure
//! degrades to a logged no-proxy default instead of aborting.

use std::fs;
use std::path::Path;

use log::warn;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxyConfig {
    pub use_proxy: bool,
    pub proxy_protocol: String,
    pub proxy_host: String,
    pub proxy_port: u16,
    pub proxy_auth: ProxyAuth,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Read the proxy config, degrading to the no-proxy default on failure.
pub fn load_proxy_config(path: &Path) -> ProxyConfig {
    let parsed = fs::read_to_string(path)
        .map_err(|err| err.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|err| err.to_string()));
    match parsed {
        Ok(config) => config,
        Err(err) => {
            warn!(
                "failed to load proxy configuration from {}: {err}; continuing without proxy",
                path.display()
            );
            ProxyConfig::default()
        }
    }
}

impl ProxyConfig {
    /// Build the reqwest proxy when enabled and well-formed.
    pub fn to_proxy(&self) -> Option<reqwest::Proxy> {
        if !self.use_proxy {
            return None;
        }
        let url = format!(
            "{}://{}:{}",
            self.proxy_protocol, self.proxy_host, self.proxy_port
        );
        match reqwest::Proxy::all(&url) {
            Ok(proxy) => {
                Some(proxy.basic_auth(&self.proxy_auth.username, &self.proxy_auth.password))
            }
            Err(err) => {
                warn!("invalid proxy url {url}: {err}; continuing without proxy");
                None
            }
        }
    }
}
