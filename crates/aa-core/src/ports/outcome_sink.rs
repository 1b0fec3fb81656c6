use async_trait::async_trait;

use crate::activation::{ActivatedAccount, Outcome};

/// Presentation layer callbacks.
///
/// Calls never fail. A sink whose screen is gone must turn them into no-ops.
///
/// Calls are awaited while the workflow holds its dispatch lock, so an
/// implementation must not call back into the workflow (`code_changed`,
/// `submit_code`, `settled`); it would wait on itself forever.
#[async_trait]
pub trait OutcomeSinkPort: Send + Sync {
    async fn notify(&self, outcome: Outcome);

    async fn submit_enabled_changed(&self, enabled: bool);

    async fn request_login(&self, account: ActivatedAccount);

    async fn request_verification_flow(&self, identity: String);

    async fn request_fallback_login_flow(&self, phone: String, dial_code: String);

    async fn persist_derived_prefix(&self, account_index: u32, prefix: String);

    async fn clear_link_reminder_timer(&self);
}
