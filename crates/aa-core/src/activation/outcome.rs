use serde::{Deserialize, Serialize};

/// Terminal result of one submit attempt.
///
/// 单次提交的最终结果，每次提交只投递一次。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Outcome {
    Activated { identity: String, is_username: bool },
    LinkEstablished { derived_prefix: String },
    InvalidCode,
    ServiceUnavailable,
}

impl Outcome {
    /// Whether the user may submit another code after this outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InvalidCode | Self::ServiceUnavailable)
    }
}

/// Account the presentation layer should sign in with after activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedAccount {
    pub username: String,
    pub phone: String,
    pub ha1: Option<String>,
}
