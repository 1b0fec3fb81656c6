//! Console presentation layer.
//!
//! Prints what the activation workflow reports and applies its storage
//! requests to the linked account store.

use std::sync::Arc;

use aa_core::ports::{LinkedAccountStorePort, OutcomeSinkPort};
use aa_core::{ActivatedAccount, ActivationRequest, Outcome, ScreenTitle};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error};

pub fn screen_title(title: ScreenTitle) -> &'static str {
    match title {
        ScreenTitle::CreateAccount => "Create account",
        ScreenTitle::RecoverAccount => "Recover account",
        ScreenTitle::LinkAccount => "Link account",
    }
}

pub fn banner(request: &ActivationRequest) -> String {
    format!(
        "{}\nEnter the code sent by SMS to {}",
        screen_title(request.screen_title()),
        request.display_phone()
    )
}

pub fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Activated {
            identity,
            is_username: true,
        } => format!("Account {identity} activated"),
        Outcome::Activated { identity, .. } => format!("Phone number {identity} activated"),
        Outcome::LinkEstablished { derived_prefix } if derived_prefix.is_empty() => {
            "Phone number linked to your account".to_string()
        }
        Outcome::LinkEstablished { derived_prefix } => {
            format!("Phone number linked to your account (prefix +{derived_prefix})")
        }
        Outcome::InvalidCode => "The confirmation code is wrong".to_string(),
        Outcome::ServiceUnavailable => {
            "The account server is unavailable, please try again later".to_string()
        }
    }
}

/// Outcome sink for the terminal.
///
/// Outcomes are printed and also forwarded to `outcomes` so the input loop
/// knows when an attempt finished.
pub struct ConsoleOutcomeSink {
    store: Arc<dyn LinkedAccountStorePort>,
    outcomes: mpsc::UnboundedSender<Outcome>,
}

impl ConsoleOutcomeSink {
    pub fn new(
        store: Arc<dyn LinkedAccountStorePort>,
        outcomes: mpsc::UnboundedSender<Outcome>,
    ) -> Self {
        Self { store, outcomes }
    }
}

#[async_trait]
impl OutcomeSinkPort for ConsoleOutcomeSink {
    async fn notify(&self, outcome: Outcome) {
        println!("{}", describe(&outcome));
        if self.outcomes.send(outcome).is_err() {
            debug!("input loop gone, outcome not forwarded");
        }
    }

    async fn submit_enabled_changed(&self, enabled: bool) {
        debug!(enabled, "submit enabled changed");
    }

    async fn request_login(&self, account: ActivatedAccount) {
        println!("Signing in as {} ({})", account.username, account.phone);
    }

    async fn request_verification_flow(&self, identity: String) {
        println!("Next: confirm the email address for {identity}");
    }

    async fn request_fallback_login_flow(&self, phone: String, dial_code: String) {
        println!("You can also sign in with phone number {phone} (dial code {dial_code})");
    }

    async fn persist_derived_prefix(&self, account_index: u32, prefix: String) {
        if let Err(err) = self.store.set_prefix(account_index, &prefix).await {
            error!(error = %err, account_index, "failed to persist dial prefix");
        }
    }

    async fn clear_link_reminder_timer(&self) {
        if let Err(err) = self.store.clear_link_reminder().await {
            error!(error = %err, "failed to clear link reminder");
        }
    }
}
