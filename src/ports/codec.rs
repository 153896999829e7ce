use super::PortError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressOptions {
    /// Output width in pixels; height follows the source aspect ratio
    pub width: u32,
    /// Encoder quality in `0.0..=1.0`
    pub quality: f32,
}

/// An encoded image produced by the codec. The caller owns the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub uri: PathBuf,
    pub width: u32,
    pub height: u32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageCodecPort: Send + Sync {
    /// Re-encode `source` at the requested width and quality. The output
    /// carries no metadata from the source.
    async fn compress(
        &self,
        source: &Path,
        options: CompressOptions,
    ) -> Result<EncodedImage, PortError>;

    /// Size of an encoded file in bytes, `None` when it cannot be measured.
    async fn measure_size(&self, uri: &Path) -> Option<u64>;

    /// Remove a file the codec produced and that is no longer needed.
    async fn discard(&self, uri: &Path);
}
