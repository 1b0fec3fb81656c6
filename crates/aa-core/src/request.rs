//! Activation request domain model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the activation screen was entered.
///
/// 激活模式：普通创建、找回账号、关联手机号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ActivationMode {
    /// Activating a freshly created account.
    Normal,
    /// Recovering access to an existing account.
    Recover,
    /// Attaching a phone alias to a locally stored account.
    Link { account_index: u32 },
}

/// Title the presentation layer shows for a given mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenTitle {
    CreateAccount,
    RecoverAccount,
    LinkAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("activation request needs a username or a phone number")]
    MissingSubject,
}

/// Immutable snapshot of what is being activated.
///
/// Built once when the activation screen is entered, from the output of the
/// registration or recovery step that preceded it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRequest {
    username: Option<String>,
    phone_number: String,
    dial_code: String,
    mode: ActivationMode,
}

impl ActivationRequest {
    pub fn new(
        username: Option<String>,
        phone_number: impl Into<String>,
        dial_code: impl Into<String>,
        mode: ActivationMode,
    ) -> Result<Self, RequestError> {
        let username = username.filter(|name| !name.trim().is_empty());
        let phone_number = phone_number.into();
        if username.is_none() && phone_number.trim().is_empty() {
            return Err(RequestError::MissingSubject);
        }
        Ok(Self {
            username,
            phone_number,
            dial_code: dial_code.into(),
            mode,
        })
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn dial_code(&self) -> &str {
        &self.dial_code
    }

    pub fn mode(&self) -> ActivationMode {
        self.mode
    }

    pub fn is_recovering(&self) -> bool {
        matches!(self.mode, ActivationMode::Recover)
    }

    pub fn linked_account_index(&self) -> Option<u32> {
        match self.mode {
            ActivationMode::Link { account_index } => Some(account_index),
            _ => None,
        }
    }

    pub fn screen_title(&self) -> ScreenTitle {
        match self.mode {
            ActivationMode::Normal => ScreenTitle::CreateAccount,
            ActivationMode::Recover => ScreenTitle::RecoverAccount,
            ActivationMode::Link { .. } => ScreenTitle::LinkAccount,
        }
    }

    /// Canonical E.164 form of the phone identity.
    ///
    /// A number that already carries a leading `+` is taken as complete;
    /// otherwise the dial code is prepended. Separators are dropped.
    pub fn canonical_phone(&self) -> String {
        let number = self.phone_number.trim();
        if number.starts_with('+') {
            format!("+{}", digits(number))
        } else {
            format!("+{}{}", digits(&self.dial_code), digits(number))
        }
    }

    /// Phone number as shown on the activation screen.
    pub fn display_phone(&self) -> String {
        self.canonical_phone()
    }

    /// Subject used for a normal or recovery activation.
    ///
    /// Falls back to the canonical phone identity when no username was given.
    pub fn activation_subject(&self) -> String {
        match &self.username {
            Some(username) => username.clone(),
            None => self.canonical_phone(),
        }
    }
}

/// Heuristic used to tell a server-echoed phone identity from a username.
pub fn looks_like_phone_number(identity: &str) -> bool {
    let rest = identity.strip_prefix('+').unwrap_or(identity);
    rest.len() >= 3 && rest.chars().all(|c| c.is_ascii_digit())
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}
