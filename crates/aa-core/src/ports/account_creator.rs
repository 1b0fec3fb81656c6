use async_trait::async_trait;

use crate::activation::{AccountActivationResponse, ActivationStatus, ActivationSubmission};

/// Remote account management service.
///
/// Errors stand for transport failures; the workflow treats them like a
/// `RequestFailed` status.
#[async_trait]
pub trait AccountCreatorPort: Send + Sync {
    async fn activate_account(
        &self,
        submission: &ActivationSubmission,
    ) -> anyhow::Result<AccountActivationResponse>;

    async fn activate_alias(
        &self,
        submission: &ActivationSubmission,
    ) -> anyhow::Result<ActivationStatus>;
}
