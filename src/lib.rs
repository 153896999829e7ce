//! PhotoPress - Media cleaning and size targeting library
//!
//! Hexagonal Architecture:
//! - domain/: Pure business logic (compression search, ad gate, selection, naming)
//! - ports/: Trait definitions
//! - adapters/: Concrete implementations
//! - application/: Generic services
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports for convenience
pub use application::monetization::{ControllerCommand, MonetizationController, Notice};
pub use application::press::PressService;
pub use config::PressConfig;
pub use domain::compression::SizeTargetingCompressor;
pub use domain::gate::DeferredActionGate;
