//! Image codec backed by the `image` crate.
//!
//! Decoding and re-encoding drops every EXIF/XMP segment of the source, so a
//! full-width compression doubles as metadata stripping. The EXIF orientation
//! is applied to the pixels first, otherwise the stripped copy would come out
//! rotated.

use crate::domain::media::{MediaAsset, MediaKind};
use crate::ports::codec::{CompressOptions, EncodedImage, ImageCodecPort};
use crate::ports::PortError;
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ExtendedColorType, ImageDecoder, ImageError, ImageReader};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct LocalImageCodec {
    work_dir: PathBuf,
}

impl LocalImageCodec {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Describe a file on disk the way a picker would.
    pub async fn probe(&self, path: &Path) -> Result<MediaAsset, PortError> {
        let metadata = tokio::fs::metadata(path).await?;
        let kind = MediaKind::from_path(path);

        let (width, height) = match kind {
            MediaKind::Video => (0, 0),
            MediaKind::Image => {
                let path = path.to_path_buf();
                tokio::task::spawn_blocking(move || oriented_dimensions(&path)).await??
            }
        };

        Ok(MediaAsset {
            uri: path.to_path_buf(),
            asset_id: None,
            kind,
            width,
            height,
            file_size: Some(metadata.len()),
        })
    }
}

fn codec_error(e: ImageError) -> PortError {
    PortError::Codec(e.to_string())
}

/// Quarter turns swap width and height.
fn swaps_axes(orientation: Orientation) -> bool {
    matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    )
}

/// Dimensions as the image is meant to be displayed.
fn oriented_dimensions(path: &Path) -> Result<(u32, u32), PortError> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(codec_error)?;
    let orientation = decoder.orientation().map_err(codec_error)?;
    let (width, height) = decoder.dimensions();
    if swaps_axes(orientation) {
        Ok((height, width))
    } else {
        Ok((width, height))
    }
}

/// Decode with the EXIF orientation baked into the pixels.
fn decode_oriented(path: &Path) -> Result<DynamicImage, PortError> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()
        .map_err(codec_error)?;
    let orientation = decoder.orientation().map_err(codec_error)?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(codec_error)?;
    img.apply_orientation(orientation);
    Ok(img)
}

fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    if width == 0 {
        return height.max(1);
    }
    ((height as u64 * target_width as u64 + width as u64 / 2) / width as u64).max(1) as u32
}

fn jpeg_quality(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

#[async_trait]
impl ImageCodecPort for LocalImageCodec {
    async fn compress(
        &self,
        source: &Path,
        options: CompressOptions,
    ) -> Result<EncodedImage, PortError> {
        let source = source.to_path_buf();
        let work_dir = self.work_dir.clone();

        tokio::task::spawn_blocking(move || -> Result<EncodedImage, PortError> {
            let img = decode_oriented(&source)?;

            let width = options.width.max(1);
            let height = scaled_height(img.width(), img.height(), width);
            let resized = if width == img.width() && height == img.height() {
                img
            } else {
                img.resize_exact(width, height, FilterType::Lanczos3)
            };
            let rgb = resized.to_rgb8();

            std::fs::create_dir_all(&work_dir)?;
            let (file, path) = tempfile::Builder::new()
                .prefix("photopress-")
                .suffix(".jpg")
                .tempfile_in(&work_dir)?
                .keep()
                .map_err(|e| PortError::Io(e.error))?;

            let mut writer = BufWriter::new(file);
            let mut encoder =
                JpegEncoder::new_with_quality(&mut writer, jpeg_quality(options.quality));
            encoder
                .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(codec_error)?;
            writer.flush()?;

            Ok(EncodedImage {
                uri: path,
                width: rgb.width(),
                height: rgb.height(),
            })
        })
        .await?
    }

    async fn measure_size(&self, uri: &Path) -> Option<u64> {
        match tokio::fs::metadata(uri).await {
            Ok(metadata) => Some(metadata.len()),
            Err(e) => {
                warn!("Could not measure {:?}: {}", uri, e);
                None
            }
        }
    }

    async fn discard(&self, uri: &Path) {
        if let Err(e) = tokio::fs::remove_file(uri).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove {:?}: {}", uri, e);
            }
        }
    }
}
