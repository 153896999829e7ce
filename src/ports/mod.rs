//! Ports - trait definitions for every external collaborator.

pub mod ads;
pub mod codec;
pub mod entitlement;
pub mod library;
pub mod video;

use std::path::PathBuf;

/// Failure reported by an adapter.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("codec error: {0}")]
    Codec(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{program} exited with {status}: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("{0:?} does not exist")]
    Missing(PathBuf),
    #[error("{0} is unavailable")]
    Unavailable(String),
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
