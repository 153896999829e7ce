use super::PressError;
use crate::domain::compression::{CompressionBudget, SearchPolicy, SizeTargetingCompressor};
use crate::domain::media::{MediaAsset, MediaKind, ProcessedMedia, SizeReport, TargetSize};
use crate::domain::naming::{with_extension, FileNames};
use crate::ports::codec::ImageCodecPort;
use crate::ports::library::{MediaLibraryPort, Permission};
use crate::ports::video::VideoCleanerPort;
use chrono::NaiveDateTime;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{error, info};

/// Everything needed to save the whole selection in one go.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub assets: Vec<MediaAsset>,
    pub target: TargetSize,
    pub names: FileNames,
    /// Used for default file names
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub saved: usize,
    pub failed: usize,
    pub saved_paths: Vec<PathBuf>,
    /// One per saved path
    pub reports: Vec<SizeReport>,
}

pub struct PressService<C, V, L> {
    compressor: SizeTargetingCompressor<C>,
    video: V,
    library: L,
}

impl<C, V, L> PressService<C, V, L>
where
    C: ImageCodecPort,
    V: VideoCleanerPort,
    L: MediaLibraryPort,
{
    pub fn new(codec: C, video: V, library: L) -> Self {
        Self::with_policy(codec, video, library, SearchPolicy::default())
    }

    pub fn with_policy(codec: C, video: V, library: L, policy: SearchPolicy) -> Self {
        Self {
            compressor: SizeTargetingCompressor::with_policy(codec, policy),
            video,
            library,
        }
    }

    /// Clean one asset. Images are resized towards `target`; videos only
    /// lose their metadata. Video progress is published on `progress`.
    pub async fn process_asset(
        &self,
        asset: &MediaAsset,
        target: TargetSize,
        progress: Option<&watch::Sender<f32>>,
    ) -> Result<ProcessedMedia, PressError> {
        match asset.kind {
            MediaKind::Video => {
                let fallback;
                let progress = match progress {
                    Some(progress) => progress,
                    None => {
                        fallback = watch::channel(0.0).0;
                        &fallback
                    }
                };
                let cleaned = self.video.clean(&asset.uri, progress).await?;
                Ok(ProcessedMedia {
                    uri: cleaned.uri,
                    kind: MediaKind::Video,
                    width: asset.width,
                    height: asset.height,
                    size_bytes: cleaned.size_bytes,
                })
            }
            MediaKind::Image => {
                let candidate = match target {
                    TargetSize::Original => {
                        self.compressor
                            .clean_original(&asset.uri, asset.width)
                            .await?
                    }
                    TargetSize::Bytes(bytes) => match CompressionBudget::new(bytes) {
                        Some(budget) => {
                            self.compressor
                                .compress_to_target(&asset.uri, asset.width, budget)
                                .await?
                        }
                        None => {
                            self.compressor
                                .clean_original(&asset.uri, asset.width)
                                .await?
                        }
                    },
                };
                Ok(ProcessedMedia {
                    uri: candidate.uri,
                    kind: MediaKind::Image,
                    width: candidate.width_used,
                    height: candidate.height,
                    size_bytes: candidate.size_bytes,
                })
            }
        }
    }

    pub async fn save_single(&self, media: &ProcessedMedia) -> Result<PathBuf, PressError> {
        self.ensure_permission().await?;
        Ok(self.library.save_to_library(&media.uri).await?)
    }

    /// Copy `media` under `name` and hand it to the share surface.
    pub async fn share(&self, media: &ProcessedMedia, name: &str) -> Result<(), PressError> {
        let staged = self
            .library
            .stage(&media.uri, &with_extension(name, &media.uri))
            .await?;
        self.library.share(&staged).await?;
        Ok(())
    }

    /// Process and save every asset in order. A failing asset is counted
    /// and skipped; only a refused library permission aborts the batch.
    pub async fn save_batch(&self, request: &BatchRequest) -> Result<BatchSummary, PressError> {
        self.ensure_permission().await?;

        let mut summary = BatchSummary::default();
        for (index, asset) in request.assets.iter().enumerate() {
            match self.save_one(request, index, asset).await {
                Ok((path, report)) => {
                    summary.saved += 1;
                    summary.saved_paths.push(path);
                    summary.reports.push(report);
                }
                Err(e) => {
                    error!("Error saving asset {} ({:?}): {}", index, asset.uri, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            saved = summary.saved,
            failed = summary.failed,
            "Batch save finished"
        );
        Ok(summary)
    }

    async fn save_one(
        &self,
        request: &BatchRequest,
        index: usize,
        asset: &MediaAsset,
    ) -> Result<(PathBuf, SizeReport), PressError> {
        let processed = self.process_asset(asset, request.target, None).await?;
        let name = request.names.resolve(&asset.uri, index, request.timestamp);

        let staged = self
            .library
            .stage(&processed.uri, &with_extension(&name, &processed.uri))
            .await;
        self.compressor.codec().discard(&processed.uri).await;

        let staged = staged?;
        let saved = self.library.save_to_library(&staged).await;
        if saved.as_ref().map_or(true, |saved| *saved != staged) {
            self.compressor.codec().discard(&staged).await;
        }
        Ok((saved?, SizeReport::new(asset.file_size, processed.size_bytes)))
    }

    async fn ensure_permission(&self) -> Result<(), PressError> {
        match self.library.request_permission().await {
            Permission::Granted => Ok(()),
            Permission::Denied { can_ask_again } => {
                Err(PressError::PermissionDenied { can_ask_again })
            }
        }
    }
}
