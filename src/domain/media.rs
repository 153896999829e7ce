use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Guess the media kind from a file extension. Anything that is not a
    /// known video container is treated as an image.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("mp4" | "mov" | "m4v" | "3gp" | "webm" | "mkv") => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

/// A picked photo or video, as described by the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub uri: PathBuf,
    /// Library identifier, when the picker exposes one
    pub asset_id: Option<String>,
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,
    /// Size of the picked file in bytes, if known
    pub file_size: Option<u64>,
}

/// Result of cleaning (and possibly resizing) one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedMedia {
    pub uri: PathBuf,
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
}

/// Byte-size goal chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSize {
    /// Strip metadata only, keep the original resolution
    Original,
    Bytes(u64),
}

impl TargetSize {
    pub const ONE_MB: TargetSize = TargetSize::Bytes(1024 * 1024);
    pub const FIVE_HUNDRED_KB: TargetSize = TargetSize::Bytes(500 * 1024);
    pub const TWO_HUNDRED_KB: TargetSize = TargetSize::Bytes(200 * 1024);

    pub const PRESETS: [TargetSize; 4] = [
        TargetSize::Original,
        TargetSize::ONE_MB,
        TargetSize::FIVE_HUNDRED_KB,
        TargetSize::TWO_HUNDRED_KB,
    ];
}

impl Default for TargetSize {
    fn default() -> Self {
        TargetSize::ONE_MB
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TargetSize::Original => write!(f, "original"),
            TargetSize::Bytes(0) => write!(f, "0 bytes"),
            TargetSize::Bytes(b) if b % (1024 * 1024) == 0 => write!(f, "{} MB", b / (1024 * 1024)),
            TargetSize::Bytes(b) if b % 1024 == 0 => write!(f, "{} KB", b / 1024),
            TargetSize::Bytes(b) => write!(f, "{} bytes", b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target size {0:?} (expected original, a size such as 500kb or 2mb, or a byte count)")]
pub struct ParseTargetSizeError(String);

impl FromStr for TargetSize {
    type Err = ParseTargetSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        if normalized == "original" || normalized == "0" {
            return Ok(TargetSize::Original);
        }

        let (digits, unit) = match normalized.find(|c: char| !c.is_ascii_digit()) {
            Some(split) => normalized.split_at(split),
            None => (normalized.as_str(), ""),
        };
        let multiplier: u64 = match unit {
            "" | "b" | "bytes" => 1,
            "kb" => 1024,
            "mb" => 1024 * 1024,
            _ => return Err(ParseTargetSizeError(s.to_string())),
        };

        match digits.parse::<u64>().ok().and_then(|n| n.checked_mul(multiplier)) {
            Some(bytes) if bytes > 0 => Ok(TargetSize::Bytes(bytes)),
            _ => Err(ParseTargetSizeError(s.to_string())),
        }
    }
}

/// Before/after sizes of one processed asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    pub original_bytes: Option<u64>,
    pub processed_bytes: u64,
}

impl SizeReport {
    pub fn new(original_bytes: Option<u64>, processed_bytes: u64) -> Self {
        Self {
            original_bytes,
            processed_bytes,
        }
    }

    /// Bytes saved; negative when processing grew the file.
    pub fn saved_bytes(&self) -> Option<i64> {
        self.original_bytes
            .map(|original| original as i64 - self.processed_bytes as i64)
    }

    pub fn reduction_percent(&self) -> Option<f64> {
        match self.original_bytes {
            Some(original) if original > 0 => {
                Some((1.0 - self.processed_bytes as f64 / original as f64) * 100.0)
            }
            _ => None,
        }
    }
}
