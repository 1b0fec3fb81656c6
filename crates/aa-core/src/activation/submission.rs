use serde::{Deserialize, Serialize};

/// Credentials of an account previously stored on this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub username: String,
    /// Credential hash used to authenticate the alias activation.
    pub ha1: Option<String>,
}

/// What one submit attempt sends to the account service.
///
/// The request itself stays untouched; everything resolved at submit time
/// (username fallback, linked credentials, the code) lives here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationSubmission {
    pub username: String,
    pub ha1: Option<String>,
    /// Canonical E.164 phone identity.
    pub phone: String,
    pub activation_code: String,
}
