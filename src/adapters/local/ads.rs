//! Stand-in rewarded ad for hosts without an ad network.

use super::events::AdEventHub;
use crate::config::AdConfig;
use crate::ports::ads::{AdEvent, RewardedAdPort};
use crate::ports::PortError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Rewarded ad that "plays" instantly. Loading completes immediately and a
/// presentation either grants the reward or is skipped, followed by a close.
#[derive(Debug)]
pub struct SimulatedRewardedAd {
    hub: Arc<AdEventHub>,
    unit_id: String,
    grant_reward: bool,
    loaded: AtomicBool,
}

impl SimulatedRewardedAd {
    pub fn new(config: &AdConfig, hub: Arc<AdEventHub>) -> Self {
        Self {
            hub,
            unit_id: config.rewarded_ad_unit_id.clone(),
            grant_reward: true,
            loaded: AtomicBool::new(false),
        }
    }

    /// Simulate a viewer who closes the ad before the reward.
    pub fn skipping(mut self) -> Self {
        self.grant_reward = false;
        self
    }
}

#[async_trait]
impl RewardedAdPort for SimulatedRewardedAd {
    async fn load(&self) -> Result<(), PortError> {
        self.loaded.store(true, Ordering::SeqCst);
        self.hub.publish(AdEvent::Loaded);
        Ok(())
    }

    async fn show(&self) -> Result<(), PortError> {
        if !self.loaded.swap(false, Ordering::SeqCst) {
            return Err(PortError::Unavailable(format!("ad {}", self.unit_id)));
        }
        info!(unit = %self.unit_id, "Presenting rewarded ad");
        if self.grant_reward {
            self.hub.publish(AdEvent::EarnedReward);
        }
        self.hub.publish(AdEvent::Closed);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AdEvent> {
        self.hub.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdConfig {
        AdConfig::for_build(true)
    }

    #[tokio::test]
    async fn test_show_emits_reward_then_close() {
        let ad = SimulatedRewardedAd::new(&config(), Arc::new(AdEventHub::new()));
        let mut events = ad.subscribe();

        ad.load().await.unwrap();
        ad.show().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), AdEvent::Loaded);
        assert_eq!(events.recv().await.unwrap(), AdEvent::EarnedReward);
        assert_eq!(events.recv().await.unwrap(), AdEvent::Closed);
    }

    #[tokio::test]
    async fn test_skipping_viewer_only_closes() {
        let ad = SimulatedRewardedAd::new(&config(), Arc::new(AdEventHub::new())).skipping();
        let mut events = ad.subscribe();

        ad.load().await.unwrap();
        ad.show().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), AdEvent::Loaded);
        assert_eq!(events.recv().await.unwrap(), AdEvent::Closed);
    }

    #[tokio::test]
    async fn test_show_requires_load() {
        let ad = SimulatedRewardedAd::new(&config(), Arc::new(AdEventHub::new()));
        assert!(matches!(ad.show().await, Err(PortError::Unavailable(_))));
    }
}
