//! Connection configuration for the live adapters.
//!
//! Configuration is loaded from a TOML file or from the environment.
//!
//! ```toml
//! [docker]
//! socket = "/var/run/docker.sock"
//!
//! [etcd]
//! endpoint = "http://127.0.0.1:4001"
//!
//! [watch]
//! default_window_ms = 2000
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use watch_core::WatchConfig;

/// Environment variable overriding the etcd endpoint.
pub const ETCD_ENDPOINT_VAR: &str = "NAVY_ETCD_ENDPOINT";
/// Linked-container host variable for etcd (port 4001).
pub const ETCD_LINK_HOST_VAR: &str = "ETCD_PORT_4001_TCP_ADDR";
/// Environment variable overriding the docker socket path.
pub const DOCKER_SOCKET_VAR: &str = "NAVY_DOCKER_SOCKET";

/// Root configuration for the live adapters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Container runtime connection.
    #[serde(default)]
    pub docker: DockerConfig,
    /// Coordination store connection.
    #[serde(default)]
    pub etcd: EtcdConfig,
    /// Polling and window settings.
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Container runtime connection.
#[derive(Debug, Clone, Deserialize)]
pub struct DockerConfig {
    /// Unix socket path (default: the runtime's local defaults).
    pub socket: Option<PathBuf>,
    /// Request timeout in seconds for non-streaming calls (default: 120).
    #[serde(default = "default_docker_timeout_secs")]
    pub timeout_secs: u64,
}

/// Coordination store connection.
#[derive(Debug, Clone, Deserialize)]
pub struct EtcdConfig {
    /// Base URL of the v2 keys API (default: http://127.0.0.1:4001).
    #[serde(default = "default_etcd_endpoint")]
    pub endpoint: String,
    /// Timeout in seconds for everything except watches (default: 10).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_docker_timeout_secs() -> u64 {
    120
}

fn default_etcd_endpoint() -> String {
    "http://127.0.0.1:4001".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: None,
            timeout_secs: default_docker_timeout_secs(),
        }
    }
}

impl Default for EtcdConfig {
    fn default() -> Self {
        Self {
            endpoint: default_etcd_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EtcdConfig {
    /// Timeout for non-watch requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides read through `var`.
    ///
    /// `NAVY_ETCD_ENDPOINT` wins over `ETCD_PORT_4001_TCP_ADDR`, which only
    /// replaces the host.
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(endpoint) = var(ETCD_ENDPOINT_VAR).filter(|v| !v.is_empty()) {
            self.etcd.endpoint = endpoint;
        } else if let Some(host) = var(ETCD_LINK_HOST_VAR).filter(|v| !v.is_empty()) {
            self.etcd.endpoint = format!("http://{}:4001", host);
        }
        if let Some(socket) = var(DOCKER_SOCKET_VAR).filter(|v| !v.is_empty()) {
            self.docker.socket = Some(PathBuf::from(socket));
        }
        self
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },
}
