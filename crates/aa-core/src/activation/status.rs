use std::fmt;

use serde::{Deserialize, Serialize};

/// Status reported by the account service for an activation call.
///
/// Only `Activated` and `RequestFailed` carry meaning for the workflow; every
/// other value lands in the open-ended `Other` bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationStatus {
    Activated,
    RequestFailed,
    Other(String),
}

impl ActivationStatus {
    /// Maps a status string from the wire.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ACCOUNT_ACTIVATED" | "OK" => Self::Activated,
            "REQUEST_FAILED" => Self::RequestFailed,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn is_activated(&self) -> bool {
        matches!(self, Self::Activated)
    }
}

impl fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated => f.write_str("ACCOUNT_ACTIVATED"),
            Self::RequestFailed => f.write_str("REQUEST_FAILED"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Result of an account activation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountActivationResponse {
    pub status: ActivationStatus,
    /// Username or phone echoed back by the service.
    pub identity: Option<String>,
}

impl AccountActivationResponse {
    pub fn new(status: ActivationStatus, identity: Option<String>) -> Self {
        Self { status, identity }
    }

    pub fn request_failed() -> Self {
        Self::new(ActivationStatus::RequestFailed, None)
    }
}
