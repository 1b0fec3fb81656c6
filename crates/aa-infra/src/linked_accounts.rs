//! File-based linked account store
//!
//! Keeps the accounts configured on this device, their cached dial prefix
//! and the link reminder timestamp in one JSON file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aa_core::ports::LinkedAccountStorePort;
use aa_core::LinkedAccount;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

pub const DEFAULT_LINKED_ACCOUNTS_FILE: &str = "linked_accounts.json";

/// One stored account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccount {
    pub username: String,
    #[serde(default)]
    pub ha1: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    accounts: BTreeMap<u32, StoredAccount>,
    #[serde(default)]
    link_popup_time: Option<String>,
}

pub struct FileLinkedAccountStore {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileLinkedAccountStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Create store with defaults
    pub fn with_defaults(base_dir: impl AsRef<Path>) -> Self {
        Self::new(base_dir.as_ref().join(DEFAULT_LINKED_ACCOUNTS_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the account at `index`.
    pub async fn save_account(&self, index: u32, account: StoredAccount) -> Result<()> {
        self.update(|file| {
            file.accounts.insert(index, account);
        })
        .await
    }

    pub async fn stored_account(&self, index: u32) -> Result<Option<StoredAccount>> {
        Ok(self.read().await?.accounts.get(&index).cloned())
    }

    pub async fn set_link_reminder(&self, timestamp: impl Into<String>) -> Result<()> {
        let timestamp = timestamp.into();
        self.update(|file| file.link_popup_time = Some(timestamp))
            .await
    }

    pub async fn link_reminder(&self) -> Result<Option<String>> {
        Ok(self.read().await?.link_popup_time)
    }

    async fn read(&self) -> Result<StoreFile> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(StoreFile::default());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read linked accounts failed: {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(StoreFile::default());
        }

        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse linked accounts: {e}"))
    }

    async fn update(&self, change: impl FnOnce(&mut StoreFile)) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read().await?;
        change(&mut file);
        self.atomic_write(&file).await
    }

    async fn atomic_write(&self, file: &StoreFile) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create store dir failed: {}", dir.display()))?;
        }

        let json = serde_json::to_string_pretty(file)
            .map_err(|e| anyhow::anyhow!("Failed to serialize linked accounts: {e}"))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .await
            .with_context(|| format!("write temp store failed: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).await.with_context(|| {
            format!(
                "rename temp store to target failed: {} -> {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;
        debug!(path = %self.path.display(), "linked accounts written");
        Ok(())
    }
}

#[async_trait]
impl LinkedAccountStorePort for FileLinkedAccountStore {
    async fn load_account(&self, index: u32) -> Result<Option<LinkedAccount>> {
        Ok(self.stored_account(index).await?.map(|stored| LinkedAccount {
            username: stored.username,
            ha1: stored.ha1,
        }))
    }

    async fn set_prefix(&self, index: u32, prefix: &str) -> Result<()> {
        let prefix = prefix.to_string();
        self.update(|file| {
            file.accounts.entry(index).or_default().prefix = Some(prefix);
        })
        .await
    }

    async fn clear_link_reminder(&self) -> Result<()> {
        self.update(|file| file.link_popup_time = None).await
    }
}
