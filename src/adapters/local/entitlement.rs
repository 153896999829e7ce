//! Premium flag persisted as a small JSON document.

use crate::ports::entitlement::{EntitlementPort, PurchaseOutcome, REMOVE_ADS_SKU};
use crate::ports::PortError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredEntitlement {
    is_premium_user: bool,
    #[serde(default)]
    purchased_skus: Vec<String>,
}

/// Local entitlement store. A purchase is granted immediately and recorded
/// in the file, so later restores find it.
#[derive(Debug)]
pub struct JsonEntitlementStore {
    path: PathBuf,
    premium: watch::Sender<bool>,
    processing: AtomicBool,
}

impl JsonEntitlementStore {
    /// Open the store; a missing or unreadable file means "not premium".
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stored = match Self::read(&path).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to load premium status from {:?}: {}", path, e);
                StoredEntitlement::default()
            }
        };
        let (premium, _) = watch::channel(stored.is_premium_user);

        Self {
            path,
            premium,
            processing: AtomicBool::new(false),
        }
    }

    async fn read(path: &Path) -> Result<StoredEntitlement, PortError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredEntitlement::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, stored: &StoredEntitlement) -> Result<(), PortError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(stored)?).await?;
        Ok(())
    }

    async fn purchase(&self) -> Result<PurchaseOutcome, PortError> {
        let mut stored = Self::read(&self.path).await?;
        if !stored.purchased_skus.iter().any(|sku| sku == REMOVE_ADS_SKU) {
            stored.purchased_skus.push(REMOVE_ADS_SKU.to_string());
        }
        stored.is_premium_user = true;
        self.write(&stored).await?;
        self.premium.send_replace(true);
        info!("Purchased {}", REMOVE_ADS_SKU);
        Ok(PurchaseOutcome::Purchased)
    }
}

#[async_trait]
impl EntitlementPort for JsonEntitlementStore {
    fn is_premium(&self) -> bool {
        *self.premium.borrow()
    }

    fn watch_premium(&self) -> watch::Receiver<bool> {
        self.premium.subscribe()
    }

    async fn request_purchase(&self) -> Result<PurchaseOutcome, PortError> {
        if self.processing.swap(true, Ordering::SeqCst) {
            return Ok(PurchaseOutcome::AlreadyProcessing);
        }
        let result = self.purchase().await;
        self.processing.store(false, Ordering::SeqCst);
        result
    }

    async fn restore_purchases(&self) -> Result<bool, PortError> {
        let stored = Self::read(&self.path).await?;
        let restored = stored.purchased_skus.iter().any(|sku| sku == REMOVE_ADS_SKU);
        if restored {
            if !stored.is_premium_user {
                self.write(&StoredEntitlement {
                    is_premium_user: true,
                    ..stored
                })
                .await?;
            }
            self.premium.send_replace(true);
        }
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_free_tier() {
        let dir = tempdir().unwrap();
        let store = JsonEntitlementStore::open(dir.path().join("premium.json")).await;
        assert!(!store.is_premium());
        assert!(!store.restore_purchases().await.unwrap());
    }

    #[tokio::test]
    async fn test_purchase_persists_and_notifies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("premium.json");
        let store = JsonEntitlementStore::open(&path).await;
        let mut watcher = store.watch_premium();

        assert_eq!(
            store.request_purchase().await.unwrap(),
            PurchaseOutcome::Purchased
        );
        watcher.changed().await.unwrap();
        assert!(*watcher.borrow());

        let reopened = JsonEntitlementStore::open(&path).await;
        assert!(reopened.is_premium());
        assert!(reopened.restore_purchases().await.unwrap());
    }

    #[tokio::test]
    async fn test_restore_upgrades_flag() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("premium.json");
        std::fs::write(
            &path,
            r#"{"is_premium_user": false, "purchased_skus": ["remove_ads"]}"#,
        )
        .unwrap();

        let store = JsonEntitlementStore::open(&path).await;
        assert!(!store.is_premium());
        assert!(store.restore_purchases().await.unwrap());
        assert!(store.is_premium());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_free_tier() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("premium.json");
        std::fs::write(&path, "not json").unwrap();

        let store = JsonEntitlementStore::open(&path).await;
        assert!(!store.is_premium());
    }
}
