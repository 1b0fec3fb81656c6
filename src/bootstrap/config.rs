//! Configuration path resolution.

use std::path::{Path, PathBuf};

use aa_core::ActivationConfig;
use aa_infra::config::DEFAULT_CONFIG_FILE;
use anyhow::Context;

pub const CONFIG_ENV_VAR: &str = "ACCOUNT_ASSISTANT_CONFIG";

/// Picks the config file: `--config`, then the environment, then the
/// default file name in the working directory.
pub fn resolve_config_path(cli_path: Option<&Path>, env_path: Option<String>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    env_path
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Resolves the config path and loads it.
pub fn load_config(cli_path: Option<&Path>) -> anyhow::Result<ActivationConfig> {
    let path = resolve_config_path(cli_path, std::env::var(CONFIG_ENV_VAR).ok());
    aa_infra::load_config(&path)
        .with_context(|| format!("Failed to load config: {}", path.display()))
}
