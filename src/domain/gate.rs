//! Rewarded-ad gate for user actions.
//!
//! A gated action is either run straight away (premium) or parked until the
//! ad reports a reward. The gate owns the only copy of the parked action, so
//! handing it back out on a reward is what guarantees it runs once.

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Nothing pending and an ad is ready to be shown
    Idle,
    /// Nothing pending and no ad loaded yet
    AwaitingAdReady,
    /// An action is parked while the ad is on screen
    AwaitingReward,
}

/// What the caller must do after a successful request.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<A> {
    /// Premium user: run the action now
    Execute(A),
    /// The action is parked: present the ad
    PresentAd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("rewarded ad is not ready yet")]
    NotReady,
    #[error("another action is waiting for its reward")]
    Busy,
}

#[derive(Debug)]
pub struct DeferredActionGate<A> {
    pending: Option<A>,
    ad_loaded: bool,
}

impl<A> Default for DeferredActionGate<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> DeferredActionGate<A> {
    pub fn new() -> Self {
        Self {
            pending: None,
            ad_loaded: false,
        }
    }

    pub fn state(&self) -> GateState {
        match (&self.pending, self.ad_loaded) {
            (Some(_), _) => GateState::AwaitingReward,
            (None, true) => GateState::Idle,
            (None, false) => GateState::AwaitingAdReady,
        }
    }

    pub fn pending(&self) -> Option<&A> {
        self.pending.as_ref()
    }

    pub fn is_ad_loaded(&self) -> bool {
        self.ad_loaded
    }

    /// Load-complete signal of the current ad instance.
    pub fn on_ad_loaded(&mut self) {
        self.ad_loaded = true;
    }

    /// Forget a loaded ad, e.g. when its instance is replaced.
    pub fn on_ad_unloaded(&mut self) {
        self.ad_loaded = false;
    }

    /// Request `action`.
    ///
    /// Premium requests bypass the gate and leave the ad untouched. Otherwise
    /// the action is parked and the loaded ad is marked consumed, so a stale
    /// "loaded" flag can never present the same ad twice.
    pub fn request_gated_action(
        &mut self,
        action: A,
        premium: bool,
    ) -> Result<Admission<A>, GateError> {
        if premium {
            return Ok(Admission::Execute(action));
        }
        if self.pending.is_some() {
            debug!("gated request rejected, one is already pending");
            return Err(GateError::Busy);
        }
        if !self.ad_loaded {
            return Err(GateError::NotReady);
        }

        self.pending = Some(action);
        self.ad_loaded = false;
        Ok(Admission::PresentAd)
    }

    /// Reward signal. Yields the parked action at most once; a reward with
    /// nothing pending is ignored.
    pub fn on_reward_earned(&mut self) -> Option<A> {
        let action = self.pending.take();
        if action.is_none() {
            warn!("reward received with no pending action, ignoring");
        }
        action
    }

    /// The ad closed before granting a reward. The parked action, if any, is
    /// abandoned and returned to the caller.
    pub fn on_ad_dismissed_without_reward(&mut self) -> Option<A> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Action {
        SaveVideo,
        SaveAll,
    }

    fn ready_gate() -> DeferredActionGate<Action> {
        let mut gate = DeferredActionGate::new();
        gate.on_ad_loaded();
        gate
    }

    #[test]
    fn test_starts_waiting_for_ad() {
        let gate: DeferredActionGate<Action> = DeferredActionGate::new();
        assert_eq!(gate.state(), GateState::AwaitingAdReady);
        assert!(gate.pending().is_none());
    }

    #[test]
    fn test_premium_executes_without_touching_ad() {
        let mut gate = ready_gate();
        let admission = gate.request_gated_action(Action::SaveAll, true).unwrap();

        assert_eq!(admission, Admission::Execute(Action::SaveAll));
        assert!(gate.is_ad_loaded());
        assert_eq!(gate.state(), GateState::Idle);
        assert!(gate.pending().is_none());
    }

    #[test]
    fn test_not_ready_without_ad() {
        let mut gate: DeferredActionGate<Action> = DeferredActionGate::new();
        let result = gate.request_gated_action(Action::SaveVideo, false);

        assert_eq!(result, Err(GateError::NotReady));
        assert_eq!(gate.state(), GateState::AwaitingAdReady);
        assert!(gate.pending().is_none());
    }

    #[test]
    fn test_request_parks_action_and_consumes_ad() {
        let mut gate = ready_gate();
        let admission = gate.request_gated_action(Action::SaveVideo, false).unwrap();

        assert_eq!(admission, Admission::PresentAd);
        assert_eq!(gate.state(), GateState::AwaitingReward);
        assert_eq!(gate.pending(), Some(&Action::SaveVideo));
        assert!(!gate.is_ad_loaded());
    }

    #[test]
    fn test_reward_fires_exactly_once() {
        let mut gate = ready_gate();
        gate.request_gated_action(Action::SaveAll, false).unwrap();

        assert_eq!(gate.on_reward_earned(), Some(Action::SaveAll));
        assert_eq!(gate.on_reward_earned(), None);
        assert_eq!(gate.state(), GateState::AwaitingAdReady);
    }

    #[test]
    fn test_second_request_is_rejected_while_pending() {
        let mut gate = ready_gate();
        gate.request_gated_action(Action::SaveVideo, false).unwrap();
        // A reload completing mid-presentation must not let a second request in.
        gate.on_ad_loaded();

        let second = gate.request_gated_action(Action::SaveAll, false);
        assert_eq!(second, Err(GateError::Busy));
        assert_eq!(gate.pending(), Some(&Action::SaveVideo));
        assert_eq!(gate.on_reward_earned(), Some(Action::SaveVideo));
    }

    #[test]
    fn test_dismiss_abandons_pending_action() {
        let mut gate = ready_gate();
        gate.request_gated_action(Action::SaveAll, false).unwrap();

        assert_eq!(gate.on_ad_dismissed_without_reward(), Some(Action::SaveAll));
        assert_eq!(gate.on_reward_earned(), None);
        assert_eq!(gate.state(), GateState::AwaitingAdReady);
    }

    #[test]
    fn test_rearms_after_reload() {
        let mut gate = ready_gate();
        gate.request_gated_action(Action::SaveAll, false).unwrap();
        gate.on_reward_earned();
        gate.on_ad_dismissed_without_reward();
        gate.on_ad_loaded();

        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(
            gate.request_gated_action(Action::SaveVideo, false),
            Ok(Admission::PresentAd)
        );
    }

    #[test]
    fn test_reward_with_nothing_pending_is_a_no_op() {
        let mut gate = ready_gate();
        assert_eq!(gate.on_reward_earned(), None);
        assert_eq!(gate.state(), GateState::Idle);
    }
}
