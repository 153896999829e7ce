//! Local adapters for desktop/server hosts.

pub mod ads;
pub mod entitlement;
pub mod events;
pub mod image_codec;
pub mod library;
pub mod video;

pub use ads::SimulatedRewardedAd;
pub use entitlement::JsonEntitlementStore;
pub use events::AdEventHub;
pub use image_codec::LocalImageCodec;
pub use library::FsLibrary;
pub use video::FfmpegVideoCleaner;
