//! Target-size image compression.
//!
//! The codec only knows how to re-encode an image at a given width, so hitting
//! a byte budget is a search over width. Each probe is a full
//! compress-then-measure round trip, which bounds the number of attempts.

use crate::ports::codec::{CompressOptions, EncodedImage, ImageCodecPort};
use crate::ports::PortError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Tunables of the width search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchPolicy {
    /// Encoder quality used for the baseline and every probe
    pub quality: f32,
    /// Lower bound of the width search
    pub min_width: u32,
    /// Probes allowed after the baseline
    pub max_attempts: u32,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            quality: 0.9,
            min_width: 100,
            max_attempts: 6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionBudget {
    target_bytes: u64,
}

impl CompressionBudget {
    /// `None` for a zero budget.
    pub fn new(target_bytes: u64) -> Option<Self> {
        (target_bytes > 0).then_some(Self { target_bytes })
    }

    pub fn target_bytes(&self) -> u64 {
        self.target_bytes
    }

    pub fn fits(&self, size_bytes: u64) -> bool {
        size_bytes <= self.target_bytes
    }
}

/// Inclusive width interval still worth probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthBounds {
    pub low: u32,
    pub high: u32,
}

impl WidthBounds {
    pub fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    pub fn is_open(&self) -> bool {
        self.low <= self.high
    }

    pub fn midpoint(&self) -> u32 {
        self.low + (self.high - self.low) / 2
    }

    /// `mid` fit the budget, look for something wider.
    pub fn raise(&mut self, mid: u32) {
        self.low = mid + 1;
    }

    /// `mid` was too big, look for something narrower.
    pub fn lower(&mut self, mid: u32) {
        self.high = mid.saturating_sub(1);
    }
}

/// A measured compression result. The file at `uri` belongs to the holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub uri: PathBuf,
    pub width_used: u32,
    pub height: u32,
    pub size_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("compressing at width {width} failed: {source}")]
    CompressionFailed {
        width: u32,
        #[source]
        source: PortError,
    },
    #[error("size of {0:?} could not be measured")]
    MeasurementUnavailable(PathBuf),
}

pub struct SizeTargetingCompressor<C> {
    codec: C,
    policy: SearchPolicy,
}

impl<C> SizeTargetingCompressor<C>
where
    C: ImageCodecPort,
{
    pub fn new(codec: C) -> Self {
        Self::with_policy(codec, SearchPolicy::default())
    }

    pub fn with_policy(codec: C, policy: SearchPolicy) -> Self {
        Self { codec, policy }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Re-encode at full width purely to drop metadata.
    pub async fn clean_original(
        &self,
        source: &Path,
        original_width: u32,
    ) -> Result<Candidate, CompressError> {
        let encoded = self.encode(source, original_width).await?;
        match self.codec.measure_size(&encoded.uri).await {
            Some(size_bytes) => Ok(Candidate {
                uri: encoded.uri,
                width_used: encoded.width,
                height: encoded.height,
                size_bytes,
            }),
            None => {
                self.codec.discard(&encoded.uri).await;
                Err(CompressError::MeasurementUnavailable(encoded.uri))
            }
        }
    }

    /// Produce the widest candidate whose size fits `budget`.
    ///
    /// The clean full-width baseline is returned untouched when it already
    /// fits, and also when no probed width fits at all. A probe whose size
    /// cannot be measured ends the search with the best fit found so far.
    pub async fn compress_to_target(
        &self,
        source: &Path,
        original_width: u32,
        budget: CompressionBudget,
    ) -> Result<Candidate, CompressError> {
        let baseline = self.clean_original(source, original_width).await?;
        if budget.fits(baseline.size_bytes) {
            debug!(
                size = baseline.size_bytes,
                target = budget.target_bytes(),
                "baseline already fits"
            );
            return Ok(baseline);
        }

        let mut bounds = WidthBounds::new(self.policy.min_width, original_width);
        let mut best_fit: Option<Candidate> = None;
        let mut attempts = 0;

        while attempts < self.policy.max_attempts && bounds.is_open() {
            let mid = bounds.midpoint();
            let encoded = match self.encode(source, mid).await {
                Ok(encoded) => encoded,
                Err(e) => {
                    self.codec.discard(&baseline.uri).await;
                    if let Some(fit) = &best_fit {
                        self.codec.discard(&fit.uri).await;
                    }
                    return Err(e);
                }
            };

            let Some(size) = self.codec.measure_size(&encoded.uri).await else {
                warn!(attempt = attempts, width = mid, "size unavailable, stopping search");
                self.codec.discard(&encoded.uri).await;
                break;
            };

            info!(
                attempt = attempts,
                width = mid,
                size,
                target = budget.target_bytes(),
                "search attempt"
            );

            if budget.fits(size) {
                let fit = Candidate {
                    uri: encoded.uri,
                    width_used: encoded.width,
                    height: encoded.height,
                    size_bytes: size,
                };
                if let Some(superseded) = best_fit.replace(fit) {
                    self.codec.discard(&superseded.uri).await;
                }
                bounds.raise(mid);
            } else {
                self.codec.discard(&encoded.uri).await;
                bounds.lower(mid);
            }
            attempts += 1;
        }

        match best_fit {
            Some(fit) => {
                self.codec.discard(&baseline.uri).await;
                Ok(fit)
            }
            None => {
                warn!(
                    size = baseline.size_bytes,
                    target = budget.target_bytes(),
                    "no width fits, keeping baseline"
                );
                Ok(baseline)
            }
        }
    }

    async fn encode(
        &self,
        source: &Path,
        width: u32,
    ) -> Result<EncodedImage, CompressError> {
        let options = CompressOptions {
            width,
            quality: self.policy.quality,
        };
        self.codec
            .compress(source, options)
            .await
            .map_err(|source| CompressError::CompressionFailed { width, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::codec::MockImageCodecPort;
    use proptest::prelude::*;

    fn candidate_path(width: u32) -> PathBuf {
        PathBuf::from(format!("candidate-{}.jpg", width))
    }

    fn width_of(uri: &Path) -> u32 {
        uri.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix("candidate-"))
            .and_then(|w| w.parse().ok())
            .unwrap()
    }

    /// Codec whose output size is a pure function of the encoded width.
    fn model_codec<F>(size_of: F) -> MockImageCodecPort
    where
        F: Fn(u32) -> Option<u64> + Send + 'static,
    {
        let mut codec = MockImageCodecPort::new();
        codec.expect_compress().returning(|_, options| {
            Ok(EncodedImage {
                uri: candidate_path(options.width),
                width: options.width,
                height: options.width * 3 / 4,
            })
        });
        codec
            .expect_measure_size()
            .returning(move |uri| size_of(width_of(uri)));
        codec.expect_discard().returning(|_| ());
        codec
    }

    fn budget(bytes: u64) -> CompressionBudget {
        CompressionBudget::new(bytes).unwrap()
    }

    #[test]
    fn test_zero_budget_rejected() {
        assert!(CompressionBudget::new(0).is_none());
    }

    #[test]
    fn test_bounds_midpoint_floors() {
        let bounds = WidthBounds::new(100, 4000);
        assert_eq!(bounds.midpoint(), 2050);
        let bounds = WidthBounds::new(3026, 4000);
        assert_eq!(bounds.midpoint(), 3513);
    }

    #[tokio::test]
    async fn test_baseline_returned_when_it_fits() {
        let mut codec = MockImageCodecPort::new();
        codec
            .expect_compress()
            .withf(|_, options| options.width == 1200 && options.quality == 0.9)
            .times(1)
            .returning(|_, options| {
                Ok(EncodedImage {
                    uri: candidate_path(options.width),
                    width: options.width,
                    height: 900,
                })
            });
        codec.expect_measure_size().times(1).returning(|_| Some(80_000));
        codec.expect_discard().times(0);

        let compressor = SizeTargetingCompressor::new(codec);
        let result = compressor
            .compress_to_target(Path::new("in.jpg"), 1200, budget(80_000))
            .await
            .unwrap();

        assert_eq!(result.width_used, 1200);
        assert_eq!(result.size_bytes, 80_000);
    }

    #[tokio::test]
    async fn test_converges_on_quadratic_model() {
        let mut codec = MockImageCodecPort::new();
        codec.expect_compress().times(7).returning(|_, options| {
            Ok(EncodedImage {
                uri: candidate_path(options.width),
                width: options.width,
                height: options.width * 3 / 4,
            })
        });
        // The metadata-laden baseline is far above the model at full width.
        codec.expect_measure_size().times(7).returning(|uri| {
            let width = width_of(uri) as u64;
            if width == 4000 {
                Some(3_000_000)
            } else {
                Some(width * width / 50)
            }
        });
        codec.expect_discard().returning(|_| ());

        let compressor = SizeTargetingCompressor::new(codec);
        let result = compressor
            .compress_to_target(Path::new("in.jpg"), 4000, budget(500_000))
            .await
            .unwrap();

        assert!(result.size_bytes <= 500_000);
        // 2050, 3025, 3513, 3757, 3879, 3940 all fit; the last is widest.
        assert_eq!(result.width_used, 3940);
        assert_eq!(result.size_bytes, 3940 * 3940 / 50);
    }

    #[tokio::test]
    async fn test_search_moves_down_when_too_big() {
        // size = width * 100, target 150_000 -> widest fit is 1500
        let codec = model_codec(|width| Some(width as u64 * 100));
        let compressor = SizeTargetingCompressor::new(codec);
        let result = compressor
            .compress_to_target(Path::new("in.jpg"), 3000, budget(150_000))
            .await
            .unwrap();

        assert!(result.size_bytes <= 150_000);
        assert!(result.width_used >= 100 && result.width_used <= 1500);
    }

    #[tokio::test]
    async fn test_nothing_fits_returns_baseline() {
        let codec = model_codec(|_| Some(10_000_000));
        let compressor = SizeTargetingCompressor::new(codec);
        let result = compressor
            .compress_to_target(Path::new("in.jpg"), 2000, budget(1_000))
            .await
            .unwrap();

        assert_eq!(result.width_used, 2000);
        assert_eq!(result.size_bytes, 10_000_000);
    }

    #[tokio::test]
    async fn test_baseline_measurement_failure_is_an_error() {
        let codec = model_codec(|_| None);
        let compressor = SizeTargetingCompressor::new(codec);
        let result = compressor
            .compress_to_target(Path::new("in.jpg"), 2000, budget(1_000))
            .await;

        assert!(matches!(
            result,
            Err(CompressError::MeasurementUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_mid_search_measurement_failure_keeps_best_fit() {
        // First probe (1050) fits, the second probe (1525) cannot be measured.
        let codec = model_codec(|width| match width {
            2000 => Some(900_000),
            1050 => Some(40_000),
            _ => None,
        });
        let compressor = SizeTargetingCompressor::new(codec);
        let result = compressor
            .compress_to_target(Path::new("in.jpg"), 2000, budget(50_000))
            .await
            .unwrap();

        assert_eq!(result.width_used, 1050);
        assert_eq!(result.size_bytes, 40_000);
    }

    #[tokio::test]
    async fn test_compression_failure_propagates_and_cleans_up() {
        let mut codec = MockImageCodecPort::new();
        codec.expect_compress().times(2).returning(|_, options| {
            if options.width == 2000 {
                Ok(EncodedImage {
                    uri: candidate_path(options.width),
                    width: options.width,
                    height: 1500,
                })
            } else {
                Err(PortError::Unavailable("encoder".to_string()))
            }
        });
        codec.expect_measure_size().times(1).returning(|_| Some(900_000));
        codec
            .expect_discard()
            .withf(|uri| uri == candidate_path(2000).as_path())
            .times(1)
            .returning(|_| ());

        let compressor = SizeTargetingCompressor::new(codec);
        let result = compressor
            .compress_to_target(Path::new("in.jpg"), 2000, budget(50_000))
            .await;

        match result {
            Err(CompressError::CompressionFailed { width, .. }) => assert_eq!(width, 1050),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_superseded_candidates_are_discarded() {
        let mut codec = MockImageCodecPort::new();
        codec.expect_compress().times(7).returning(|_, options| {
            Ok(EncodedImage {
                uri: candidate_path(options.width),
                width: options.width,
                height: options.width,
            })
        });
        codec
            .expect_measure_size()
            .returning(|uri| Some(width_of(uri) as u64 * 10));
        // Baseline 1000 is too big. Probes: 550 fits, 775 / 662 / 606 too
        // big, 578 fits, 592 fits. Everything but 592 must be removed.
        let kept = candidate_path(592);
        codec
            .expect_discard()
            .withf(move |uri| uri != kept.as_path())
            .times(6)
            .returning(|_| ());

        let compressor = SizeTargetingCompressor::new(codec);
        let result = compressor
            .compress_to_target(Path::new("in.jpg"), 1000, budget(6_000))
            .await
            .unwrap();

        assert_eq!(result.width_used, 592);
        assert_eq!(result.size_bytes, 5_920);
    }

    #[tokio::test]
    async fn test_narrow_source_skips_search() {
        let mut codec = MockImageCodecPort::new();
        codec.expect_compress().times(1).returning(|_, options| {
            Ok(EncodedImage {
                uri: candidate_path(options.width),
                width: options.width,
                height: options.width,
            })
        });
        codec.expect_measure_size().times(1).returning(|_| Some(5_000));

        let compressor = SizeTargetingCompressor::new(codec);
        let result = compressor
            .compress_to_target(Path::new("in.jpg"), 80, budget(1_000))
            .await
            .unwrap();

        assert_eq!(result.width_used, 80);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_monotonic_model_finds_a_fit(
            original_width in 100u32..8000,
            per_pixel in 1u64..400,
            // Six probes narrow the interval to 1/64 of the range, so only
            // budgets reachable above that resolution are guaranteed a fit.
            target_fraction in 0.05f64..1.0,
        ) {
            let size_of = move |width: u32| width as u64 * per_pixel + 1_000;
            let min_size = size_of(100);
            let max_size = size_of(original_width);
            let target = min_size + ((max_size - min_size) as f64 * target_fraction) as u64;

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let result = runtime.block_on(async {
                let compressor = SizeTargetingCompressor::new(model_codec(move |w| Some(size_of(w))));
                compressor
                    .compress_to_target(Path::new("in.jpg"), original_width, budget(target))
                    .await
                    .unwrap()
            });

            prop_assert!(result.size_bytes <= target);
            prop_assert!(result.width_used >= 100);
            prop_assert!(result.width_used <= original_width);
        }
    }
}
