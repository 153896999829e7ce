use super::PortError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdEvent {
    Loaded,
    EarnedReward,
    Closed,
}

/// One rewarded ad instance. It is reloaded after every presentation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardedAdPort: Send + Sync {
    /// Start loading; completion is reported as [`AdEvent::Loaded`].
    async fn load(&self) -> Result<(), PortError>;

    async fn show(&self) -> Result<(), PortError>;

    fn subscribe(&self) -> broadcast::Receiver<AdEvent>;
}
