//! Linked account store port
//!
//! Accounts already configured on this device, addressed by their index.

use async_trait::async_trait;

use crate::activation::LinkedAccount;

#[async_trait]
pub trait LinkedAccountStorePort: Send + Sync {
    /// Load the account stored at `index`, if any.
    async fn load_account(&self, index: u32) -> anyhow::Result<Option<LinkedAccount>>;

    /// Cache the dial prefix derived from the account's linked phone.
    async fn set_prefix(&self, index: u32, prefix: &str) -> anyhow::Result<()>;

    /// Forget when the "link your phone" reminder was last shown.
    async fn clear_link_reminder(&self) -> anyhow::Result<()>;
}
