use super::PortError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedVideo {
    pub uri: PathBuf,
    pub size_bytes: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoCleanerPort: Send + Sync {
    /// Rewrite `source` without any container or stream metadata.
    /// Progress is published as a fraction in `0.0..=1.0`.
    async fn clean(
        &self,
        source: &Path,
        progress: &watch::Sender<f32>,
    ) -> Result<CleanedVideo, PortError>;
}
