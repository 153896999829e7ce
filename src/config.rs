//! Configuration loaded from the environment.

use crate::domain::compression::SearchPolicy;
use crate::domain::media::TargetSize;
use std::env;
use std::path::PathBuf;
use tracing::warn;

const TEST_REWARDED_AD_UNIT_ID: &str = "ca-app-pub-3940256099942544/5224354917";
const PRODUCTION_REWARDED_AD_UNIT_ID: &str = "ca-app-pub-9278680005368587/2929384111";

/// Ad units for the current build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdConfig {
    pub rewarded_ad_unit_id: String,
}

impl AdConfig {
    /// Development builds always use the public test unit.
    pub fn for_build(dev: bool) -> Self {
        let unit = if dev {
            TEST_REWARDED_AD_UNIT_ID
        } else {
            PRODUCTION_REWARDED_AD_UNIT_ID
        };
        Self {
            rewarded_ad_unit_id: unit.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PressConfig {
    /// Where saved media ends up
    pub output_dir: PathBuf,
    /// Renamed copies waiting to be saved or shared
    pub cache_dir: PathBuf,
    /// Intermediate compression candidates
    pub work_dir: PathBuf,
    /// JSON file holding the premium flag
    pub entitlement_file: PathBuf,
    /// ffmpeg executable used to clean videos
    pub ffmpeg: String,
    /// ffprobe executable used to read video durations
    pub ffprobe: String,
    pub default_target: TargetSize,
    pub search: SearchPolicy,
    pub ads: AdConfig,
}

impl PressConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let default_target = match env::var("PHOTOPRESS_TARGET") {
            Ok(label) => label.parse().unwrap_or_else(|e| {
                warn!("{}, using the default target", e);
                TargetSize::default()
            }),
            Err(_) => TargetSize::default(),
        };

        let dev = env::var("PHOTOPRESS_DEV")
            .unwrap_or_else(|_| String::from("true"))
            .parse()
            .unwrap_or(true);

        let temp = env::temp_dir();

        Self {
            output_dir: env::var("PHOTOPRESS_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./PhotoPress")),
            cache_dir: env::var("PHOTOPRESS_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| temp.join("photopress-cache")),
            work_dir: env::var("PHOTOPRESS_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| temp.join("photopress-work")),
            entitlement_file: env::var("PHOTOPRESS_ENTITLEMENT_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./photopress-premium.json")),
            ffmpeg: env::var("PHOTOPRESS_FFMPEG").unwrap_or_else(|_| String::from("ffmpeg")),
            ffprobe: env::var("PHOTOPRESS_FFPROBE").unwrap_or_else(|_| String::from("ffprobe")),
            default_target,
            search: SearchPolicy::default(),
            ads: AdConfig::for_build(dev),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ad_unit_per_build() {
        assert_eq!(
            AdConfig::for_build(true).rewarded_ad_unit_id,
            TEST_REWARDED_AD_UNIT_ID
        );
        assert_eq!(
            AdConfig::for_build(false).rewarded_ad_unit_id,
            PRODUCTION_REWARDED_AD_UNIT_ID
        );
    }
}
