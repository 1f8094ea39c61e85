//! Connection settings for live runs.

use std::path::Path;
use watch_client::{ClientConfig, ConfigError};

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_VAR: &str = "NAVY_E2E_CONFIG";

/// Load the config file named by `NAVY_E2E_CONFIG`, or fall back to the
/// environment. Environment overrides apply on top of a file as well.
pub fn load() -> Result<ClientConfig, ConfigError> {
    let env = |name: &str| std::env::var(name).ok();
    let base = match env(CONFIG_PATH_VAR) {
        Some(path) => ClientConfig::from_file(Path::new(&path))?,
        None => ClientConfig::default(),
    };
    Ok(base.with_env_overrides(env))
}
