use super::PortError;
use async_trait::async_trait;
use tokio::sync::watch;

/// Product that removes ads and unlocks premium limits.
pub const REMOVE_ADS_SKU: &str = "remove_ads";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased,
    Cancelled,
    /// A previous request has not finished yet
    AlreadyProcessing,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntitlementPort: Send + Sync {
    fn is_premium(&self) -> bool;

    /// Receiver notified whenever the premium flag changes.
    fn watch_premium(&self) -> watch::Receiver<bool>;

    async fn request_purchase(&self) -> Result<PurchaseOutcome, PortError>;

    /// Returns true when a prior purchase of [`REMOVE_ADS_SKU`] was found.
    async fn restore_purchases(&self) -> Result<bool, PortError>;
}
