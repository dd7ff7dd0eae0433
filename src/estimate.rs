//! Output size estimation from a downsampled preview
//!
//! One sample file is decoded once; a fixed 400x400 version of it is kept
//! around and re-encoded whenever the quality changes. The encoded preview
//! size is scaled by the ratio of original to preview pixel counts.
//! Compressed size is not strictly linear in pixel count, so the result is
//! an approximation.

use crate::encode::{resize_exact, EncoderConfig, Quality};
use crate::raw::{DecodedImage, RawDecoder};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Edge length of the square preview used for estimation
pub const PREVIEW_SIZE: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeEstimate {
    Unavailable,
    Bytes(u64),
}

impl SizeEstimate {
    pub fn bytes(&self) -> Option<u64> {
        match self {
            SizeEstimate::Bytes(b) => Some(*b),
            SizeEstimate::Unavailable => None,
        }
    }

    pub fn kilobytes(&self) -> Option<f64> {
        self.bytes().map(|b| b as f64 / 1024.0)
    }
}

impl fmt::Display for SizeEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kilobytes() {
            Some(kb) => write!(f, "Estimated size: ~{:.1} KB", kb),
            None => write!(f, "Estimated size: N/A"),
        }
    }
}

struct PreviewSample {
    preview: DecodedImage,
    original_pixel_count: u64,
}

pub struct SizeEstimator {
    encoder: EncoderConfig,
    sample: Option<PreviewSample>,
}

impl SizeEstimator {
    pub fn new(encoder: EncoderConfig) -> Self {
        Self { encoder, sample: None }
    }

    /// Decode `path` and cache its preview. Returns false (and clears any
    /// previous sample) when the file cannot be decoded.
    pub fn load_sample(&mut self, decoder: &dyn RawDecoder, path: &Path) -> bool {
        self.sample = None;

        let decoded = match decoder.decode(path) {
            Ok(img) => img,
            Err(e) => {
                warn!("Preview unavailable for {}: {}", path.display(), e);
                return false;
            }
        };

        self.load_decoded(&decoded)
    }

    /// Cache a preview of an already decoded image
    pub fn load_decoded(&mut self, decoded: &DecodedImage) -> bool {
        match resize_exact(decoded, PREVIEW_SIZE, PREVIEW_SIZE) {
            Ok(preview) => {
                debug!(
                    "Preview sample {}x{} -> {}x{}",
                    decoded.width, decoded.height, PREVIEW_SIZE, PREVIEW_SIZE
                );
                self.sample = Some(PreviewSample {
                    preview,
                    original_pixel_count: decoded.pixel_count(),
                });
                true
            }
            Err(e) => {
                warn!("Preview downsample failed: {}", e);
                self.sample = None;
                false
            }
        }
    }

    pub fn has_sample(&self) -> bool {
        self.sample.is_some()
    }

    pub fn set_encoder(&mut self, encoder: EncoderConfig) {
        self.encoder = encoder;
    }

    /// Estimate the full-resolution output size at `quality`
    pub fn estimate(&self, quality: Quality) -> SizeEstimate {
        let Some(sample) = &self.sample else {
            return SizeEstimate::Unavailable;
        };

        let encoded = match self.encoder.with_quality(quality).encode(&sample.preview) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Preview encode failed: {}", e);
                return SizeEstimate::Unavailable;
            }
        };

        SizeEstimate::Bytes(extrapolate(
            encoded.len() as u64,
            sample.original_pixel_count,
            sample.preview.pixel_count(),
        ))
    }
}

/// `preview_bytes * original_pixels / preview_pixels`
pub fn extrapolate(preview_bytes: u64, original_pixels: u64, preview_pixels: u64) -> u64 {
    if preview_pixels == 0 {
        return 0;
    }
    let scale = original_pixels as f64 / preview_pixels as f64;
    (preview_bytes as f64 * scale).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::tests::textured;
    use crate::encode::OutputFormat;
    use crate::error::{ConvertError, Result};

    struct FixedDecoder(Option<DecodedImage>);

    impl RawDecoder for FixedDecoder {
        fn decode(&self, _path: &Path) -> Result<DecodedImage> {
            self.0.clone().ok_or_else(|| ConvertError::Decode("corrupt".to_string()))
        }
    }

    #[test]
    fn test_extrapolate_scales_by_pixel_ratio() {
        assert_eq!(extrapolate(1000, 160_000 * 4, 160_000), 4000);
        assert_eq!(extrapolate(1000, 80_000, 160_000), 500);
        assert_eq!(extrapolate(1000, 10, 0), 0);
    }

    #[test]
    fn test_unavailable_without_sample() {
        let estimator = SizeEstimator::new(EncoderConfig::default());
        assert_eq!(estimator.estimate(Quality::default()), SizeEstimate::Unavailable);
        assert_eq!(estimator.estimate(Quality::default()).to_string(), "Estimated size: N/A");
    }

    #[test]
    fn test_decode_failure_reports_unavailable() {
        let mut estimator = SizeEstimator::new(EncoderConfig::default());
        let good = FixedDecoder(Some(textured(800, 600)));
        assert!(estimator.load_sample(&good, Path::new("a.NEF")));
        assert!(estimator.has_sample());

        let bad = FixedDecoder(None);
        assert!(!estimator.load_sample(&bad, Path::new("b.NEF")));
        assert_eq!(estimator.estimate(Quality::new(50)), SizeEstimate::Unavailable);
    }

    #[test]
    fn test_estimate_matches_extrapolated_preview() {
        let original = textured(800, 600);
        let mut estimator = SizeEstimator::new(EncoderConfig::default());
        assert!(estimator.load_decoded(&original));

        let preview = resize_exact(&original, PREVIEW_SIZE, PREVIEW_SIZE).unwrap();
        let preview_bytes = EncoderConfig::default()
            .with_quality(Quality::new(70))
            .encode(&preview)
            .unwrap()
            .len() as u64;

        let expected = extrapolate(preview_bytes, 480_000, 160_000);
        assert_eq!(estimator.estimate(Quality::new(70)), SizeEstimate::Bytes(expected));
    }

    #[test]
    fn test_higher_quality_does_not_decrease_estimate() {
        let mut estimator = SizeEstimator::new(EncoderConfig::default());
        assert!(estimator.load_decoded(&textured(640, 480)));

        let sizes: Vec<u64> = [5, 30, 60, 90, 100]
            .iter()
            .map(|q| estimator.estimate(Quality::new(*q)).bytes().unwrap())
            .collect();

        for pair in sizes.windows(2) {
            assert!(pair[0] <= pair[1], "estimates not monotonic: {:?}", sizes);
        }
    }

    #[test]
    fn test_webp_estimate_available() {
        let mut estimator =
            SizeEstimator::new(EncoderConfig::new(OutputFormat::Webp, Quality::default()));
        assert!(estimator.load_decoded(&textured(500, 500)));
        assert!(estimator.estimate(Quality::new(80)).bytes().unwrap() > 0);
    }

    #[test]
    fn test_display_in_kilobytes() {
        assert_eq!(SizeEstimate::Bytes(2048).to_string(), "Estimated size: ~2.0 KB");
        assert_eq!(SizeEstimate::Bytes(1536).to_string(), "Estimated size: ~1.5 KB");
    }
}
