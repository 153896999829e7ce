//! Save requests behind the rewarded ad.
//!
//! The controller is the single owner of the [`DeferredActionGate`]. Commands
//! from the host UI and events from the ad instance are consumed one at a
//! time, in arrival order, from one task.

use super::press::{BatchRequest, BatchSummary, PressService};
use super::PressError;
use crate::domain::gate::{Admission, DeferredActionGate, GateError};
use crate::domain::media::{MediaKind, ProcessedMedia};
use crate::ports::ads::{AdEvent, RewardedAdPort};
use crate::ports::codec::ImageCodecPort;
use crate::ports::entitlement::{EntitlementPort, PurchaseOutcome};
use crate::ports::library::MediaLibraryPort;
use crate::ports::video::VideoCleanerPort;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

/// Work that waits for the reward.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveAction {
    SingleSaveVideo(ProcessedMedia),
    BatchSave(BatchRequest),
}

#[derive(Debug)]
pub enum ControllerCommand {
    /// Save the processed item on screen
    Save(ProcessedMedia),
    /// Process and save the whole selection
    SaveAll(BatchRequest),
    Share { media: ProcessedMedia, name: String },
    Purchase,
    Restore,
}

/// Feedback for the host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Saved(PathBuf),
    BatchDone(BatchSummary),
    Shared,
    AdNotReady,
    Busy,
    /// The ad closed without a reward; the request was dropped
    Abandoned,
    PermissionDenied { can_ask_again: bool },
    Purchase(PurchaseOutcome),
    Restored(bool),
    PremiumChanged(bool),
    Failed(String),
}

enum Input<A> {
    Command(Option<ControllerCommand>),
    Replace(Option<A>),
    Ad(Result<AdEvent, broadcast::error::RecvError>),
    Premium(Result<(), watch::error::RecvError>),
}

pub struct MonetizationController<Ad, E, C, V, L> {
    gate: DeferredActionGate<SaveAction>,
    ad: Ad,
    ad_events: broadcast::Receiver<AdEvent>,
    entitlement: E,
    press: Arc<PressService<C, V, L>>,
    notices: mpsc::UnboundedSender<Notice>,
    replacements: Option<mpsc::Receiver<Ad>>,
}

impl<Ad, E, C, V, L> MonetizationController<Ad, E, C, V, L>
where
    Ad: RewardedAdPort,
    E: EntitlementPort,
    C: ImageCodecPort,
    V: VideoCleanerPort,
    L: MediaLibraryPort,
{
    pub fn new(
        ad: Ad,
        entitlement: E,
        press: Arc<PressService<C, V, L>>,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        // Subscribe before the first load so its completion is not missed.
        let ad_events = ad.subscribe();
        Self {
            gate: DeferredActionGate::new(),
            ad,
            ad_events,
            entitlement,
            press,
            notices,
            replacements: None,
        }
    }

    /// Sender through which a running controller accepts new ad instances.
    /// Calling it again drops the previous sender's channel.
    pub fn ad_replacements(&mut self) -> mpsc::Sender<Ad> {
        let (sender, receiver) = mpsc::channel(1);
        self.replacements = Some(receiver);
        sender
    }

    pub fn gate(&self) -> &DeferredActionGate<SaveAction> {
        &self.gate
    }

    /// Begin loading the first ad unless the user is premium.
    pub async fn start(&mut self) {
        if !self.entitlement.is_premium() {
            self.load_ad().await;
        }
    }

    /// Swap in a new ad instance. Signals from the old one are no longer
    /// listened to, and an action parked on it is abandoned. While [`run`]
    /// owns the controller this happens through [`ad_replacements`].
    ///
    /// [`run`]: Self::run
    /// [`ad_replacements`]: Self::ad_replacements
    pub async fn replace_ad(&mut self, ad: Ad) {
        if self.gate.on_ad_dismissed_without_reward().is_some() {
            self.notify(Notice::Abandoned);
        }
        self.gate.on_ad_unloaded();
        self.ad_events = ad.subscribe();
        self.ad = ad;
        self.start().await;
    }

    /// Drive the controller until the command channel closes.
    pub async fn run(mut self, mut commands: mpsc::Receiver<ControllerCommand>) {
        let mut premium = self.entitlement.watch_premium();
        let mut ads_open = true;
        let mut premium_open = true;

        self.start().await;

        loop {
            let input = tokio::select! {
                biased;
                event = self.ad_events.recv(), if ads_open => Input::Ad(event),
                changed = premium.changed(), if premium_open => Input::Premium(changed),
                ad = next_replacement(&mut self.replacements) => Input::Replace(ad),
                command = commands.recv() => Input::Command(command),
            };

            match input {
                Input::Ad(Ok(event)) => self.handle_ad_event(event).await,
                Input::Ad(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    warn!("Missed {} ad events", skipped);
                }
                Input::Ad(Err(broadcast::error::RecvError::Closed)) => ads_open = false,
                Input::Premium(Ok(())) => {
                    let is_premium = *premium.borrow_and_update();
                    self.handle_premium_change(is_premium).await;
                }
                Input::Premium(Err(_)) => premium_open = false,
                Input::Replace(Some(ad)) => {
                    info!("Switching to a new ad instance");
                    self.replace_ad(ad).await;
                    ads_open = true;
                }
                Input::Replace(None) => self.replacements = None,
                Input::Command(Some(command)) => self.handle_command(command).await,
                Input::Command(None) => break,
            }
        }
        debug!("Controller stopped");
    }

    pub async fn handle_command(&mut self, command: ControllerCommand) {
        match command {
            ControllerCommand::Save(media) if media.kind == MediaKind::Image => {
                self.save_single(&media).await;
            }
            ControllerCommand::Save(media) => {
                self.request(SaveAction::SingleSaveVideo(media)).await;
            }
            ControllerCommand::SaveAll(batch) => {
                if batch.assets.is_empty() {
                    return;
                }
                self.request(SaveAction::BatchSave(batch)).await;
            }
            ControllerCommand::Share { media, name } => {
                match self.press.share(&media, &name).await {
                    Ok(()) => self.notify(Notice::Shared),
                    Err(e) => self.notify_error(e),
                }
            }
            ControllerCommand::Purchase => match self.entitlement.request_purchase().await {
                Ok(outcome) => self.notify(Notice::Purchase(outcome)),
                Err(e) => self.notify(Notice::Failed(e.to_string())),
            },
            ControllerCommand::Restore => match self.entitlement.restore_purchases().await {
                Ok(restored) => self.notify(Notice::Restored(restored)),
                Err(e) => {
                    warn!("Restore failed: {}", e);
                    self.notify(Notice::Restored(false));
                }
            },
        }
    }

    pub async fn handle_ad_event(&mut self, event: AdEvent) {
        debug!(?event, state = ?self.gate.state(), "Ad event");
        match event {
            AdEvent::Loaded => self.gate.on_ad_loaded(),
            AdEvent::EarnedReward => {
                if let Some(action) = self.gate.on_reward_earned() {
                    self.perform(action).await;
                }
            }
            AdEvent::Closed => {
                if self.gate.on_ad_dismissed_without_reward().is_some() {
                    info!("Ad closed before reward, request dropped");
                    self.notify(Notice::Abandoned);
                }
                if !self.entitlement.is_premium() {
                    self.load_ad().await;
                }
            }
        }
    }

    pub async fn handle_premium_change(&mut self, is_premium: bool) {
        self.notify(Notice::PremiumChanged(is_premium));
        if !is_premium && !self.gate.is_ad_loaded() {
            self.load_ad().await;
        }
    }

    async fn request(&mut self, action: SaveAction) {
        let premium = self.entitlement.is_premium();
        match self.gate.request_gated_action(action, premium) {
            Ok(Admission::Execute(action)) => self.perform(action).await,
            Ok(Admission::PresentAd) => {
                if let Err(e) = self.ad.show().await {
                    warn!("Could not present ad: {}", e);
                    self.gate.on_ad_dismissed_without_reward();
                    self.notify(Notice::AdNotReady);
                    self.load_ad().await;
                }
            }
            Err(GateError::NotReady) => self.notify(Notice::AdNotReady),
            Err(GateError::Busy) => self.notify(Notice::Busy),
        }
    }

    async fn perform(&mut self, action: SaveAction) {
        match action {
            SaveAction::SingleSaveVideo(media) => self.save_single(&media).await,
            SaveAction::BatchSave(batch) => match self.press.save_batch(&batch).await {
                Ok(summary) => self.notify(Notice::BatchDone(summary)),
                Err(e) => self.notify_error(e),
            },
        }
    }

    async fn save_single(&self, media: &ProcessedMedia) {
        match self.press.save_single(media).await {
            Ok(path) => self.notify(Notice::Saved(path)),
            Err(e) => self.notify_error(e),
        }
    }

    async fn load_ad(&self) {
        if let Err(e) = self.ad.load().await {
            warn!("Rewarded ad failed to load: {}", e);
        }
    }

    fn notify_error(&self, error: PressError) {
        match error {
            PressError::PermissionDenied { can_ask_again } => {
                self.notify(Notice::PermissionDenied { can_ask_again })
            }
            other => {
                warn!("Save failed: {}", other);
                self.notify(Notice::Failed(other.to_string()))
            }
        }
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("Notice dropped, nobody is listening");
        }
    }
}

async fn next_replacement<Ad>(replacements: &mut Option<mpsc::Receiver<Ad>>) -> Option<Ad> {
    match replacements {
        Some(receiver) => receiver.recv().await,
        None => std::future::pending().await,
    }
}
