//! Configuration file loader.

use std::path::Path;

use aa_core::ActivationConfig;
use anyhow::{Context, Result};
use tracing::info;

pub const DEFAULT_CONFIG_FILE: &str = "account-assistant.toml";

/// Loads the activation configuration from a TOML file.
///
/// A missing file yields the defaults; a malformed one is an error.
pub fn load_config(path: &Path) -> Result<ActivationConfig> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        return Ok(ActivationConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config failed: {}", path.display()))?;
    let value: toml::Value = toml::from_str(&content)
        .with_context(|| format!("parse config failed: {}", path.display()))?;
    ActivationConfig::from_toml(&value)
}
