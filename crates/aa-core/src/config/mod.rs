//! # Activation configuration DTO
//!
//! Plain data mapped from TOML. Missing keys fall back to [`ActivationConfig::default`];
//! values are not validated here.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::activation::ActivationPolicy;

pub const DEFAULT_CODE_LENGTH: usize = 4;
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 30;

/// Activation configuration
/// 激活配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationConfig {
    /// Number of characters in an activation code
    pub code_length: usize,

    /// Account service RPC endpoint
    pub account_service_url: String,

    /// SIP domain the accounts live in
    pub domain: String,

    /// Upper bound for one remote call before it counts as failed
    pub response_timeout_secs: u64,

    /// Keep the old behaviour of dropping failed alias responses silently
    pub legacy_alias_failure_drop: bool,

    /// Directory holding the linked account store
    pub data_dir: PathBuf,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            account_service_url: "https://accounts.example.org/rpc".to_string(),
            domain: "sip.example.org".to_string(),
            response_timeout_secs: DEFAULT_RESPONSE_TIMEOUT_SECS,
            legacy_alias_failure_drop: false,
            data_dir: PathBuf::from("."),
        }
    }
}

impl ActivationConfig {
    /// Create ActivationConfig from TOML value
    /// 从 TOML 值创建 ActivationConfig
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let section = |name: &str, key: &str| toml_value.get(name).and_then(|s| s.get(key));

        Ok(Self {
            code_length: section("activation", "code_length")
                .and_then(|v| v.as_integer())
                .map(|v| v.max(1) as usize)
                .unwrap_or(defaults.code_length),
            account_service_url: section("account_service", "url")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or(defaults.account_service_url),
            domain: section("account_service", "domain")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or(defaults.domain),
            response_timeout_secs: section("activation", "response_timeout_secs")
                .and_then(|v| v.as_integer())
                .map(|v| v.max(0) as u64)
                .unwrap_or(defaults.response_timeout_secs),
            legacy_alias_failure_drop: section("activation", "legacy_alias_failure_drop")
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.legacy_alias_failure_drop),
            data_dir: section("storage", "data_dir")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        })
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs.max(1))
    }

    pub fn policy(&self) -> ActivationPolicy {
        ActivationPolicy {
            // An empty code would be complete before anything is typed.
            required_code_length: self.code_length.max(1),
            legacy_alias_failure_drop: self.legacy_alias_failure_drop,
        }
    }
}
