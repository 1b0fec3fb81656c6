use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aa_core::ports::OutcomeSinkPort;
use aa_core::{ActivatedAccount, Outcome};
use async_trait::async_trait;
use tracing::debug;

/// Outcome sink that turns into a no-op once its screen is torn down.
///
/// The workflow calls its sink unconditionally; presentation layers wrap
/// their sink in this type and call [`DisposableOutcomeSink::dispose`] when
/// the screen goes away, so late responses are swallowed.
pub struct DisposableOutcomeSink {
    inner: Arc<dyn OutcomeSinkPort>,
    disposed: AtomicBool,
}

impl DisposableOutcomeSink {
    pub fn new(inner: Arc<dyn OutcomeSinkPort>) -> Self {
        Self {
            inner,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn live(&self, call: &'static str) -> Option<&dyn OutcomeSinkPort> {
        if self.is_disposed() {
            debug!(call, "outcome sink disposed, dropping call");
            return None;
        }
        Some(self.inner.as_ref())
    }
}

#[async_trait]
impl OutcomeSinkPort for DisposableOutcomeSink {
    async fn notify(&self, outcome: Outcome) {
        if let Some(sink) = self.live("notify") {
            sink.notify(outcome).await;
        }
    }

    async fn submit_enabled_changed(&self, enabled: bool) {
        if let Some(sink) = self.live("submit_enabled_changed") {
            sink.submit_enabled_changed(enabled).await;
        }
    }

    async fn request_login(&self, account: ActivatedAccount) {
        if let Some(sink) = self.live("request_login") {
            sink.request_login(account).await;
        }
    }

    async fn request_verification_flow(&self, identity: String) {
        if let Some(sink) = self.live("request_verification_flow") {
            sink.request_verification_flow(identity).await;
        }
    }

    async fn request_fallback_login_flow(&self, phone: String, dial_code: String) {
        if let Some(sink) = self.live("request_fallback_login_flow") {
            sink.request_fallback_login_flow(phone, dial_code).await;
        }
    }

    async fn persist_derived_prefix(&self, account_index: u32, prefix: String) {
        if let Some(sink) = self.live("persist_derived_prefix") {
            sink.persist_derived_prefix(account_index, prefix).await;
        }
    }

    async fn clear_link_reminder_timer(&self) {
        if let Some(sink) = self.live("clear_link_reminder_timer") {
            sink.clear_link_reminder_timer().await;
        }
    }
}
