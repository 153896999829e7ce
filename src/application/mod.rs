//! Application layer - Services that drive the ports.

pub mod monetization;
pub mod press;

use crate::domain::compression::CompressError;
use crate::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum PressError {
    #[error(transparent)]
    Compress(#[from] CompressError),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error("media library permission denied")]
    PermissionDenied { can_ask_again: bool },
}
