//! Resizing and lossy encoding of decoded RGB buffers

use crate::error::{ConvertError, Result};
use crate::raw::DecodedImage;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Self {
        Self(value.clamp(Self::MIN, Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Webp,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
        }
    }

    /// Label used by front ends, e.g. "Convert to JPG"
    pub fn display_name(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "JPG",
            OutputFormat::Webp => "WEBP",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderConfig {
    pub format: OutputFormat,
    pub quality: Quality,
}

impl EncoderConfig {
    pub fn new(format: OutputFormat, quality: Quality) -> Self {
        Self { format, quality }
    }

    pub fn with_quality(self, quality: Quality) -> Self {
        Self { quality, ..self }
    }

    /// Encode an RGB image into an in-memory file
    pub fn encode(&self, img: &DecodedImage) -> Result<Vec<u8>> {
        match self.format {
            OutputFormat::Jpeg => {
                let mut out = Vec::new();
                let mut encoder = JpegEncoder::new_with_quality(&mut out, self.quality.value());
                encoder
                    .encode(&img.rgb, img.width, img.height, ExtendedColorType::Rgb8)
                    .map_err(|e| ConvertError::Encode(format!("JPEG encode failed: {}", e)))?;
                Ok(out)
            }
            OutputFormat::Webp => {
                // Direct libwebp FFI encoding
                let encoder = webp::Encoder::from_rgb(&img.rgb, img.width, img.height);
                let webp_data = encoder.encode(self.quality.value() as f32);
                if webp_data.is_empty() {
                    return Err(ConvertError::Encode("libwebp produced no data".to_string()));
                }
                Ok(webp_data.to_vec())
            }
        }
    }
}

/// Resize to exact dimensions (aspect ratio not preserved) using fast_image_resize
pub fn resize_exact(img: &DecodedImage, dst_w: u32, dst_h: u32) -> Result<DecodedImage> {
    use fast_image_resize as fr;
    use fr::images::{Image as FrImage, ImageRef};

    // Borrow the source pixels, full-resolution buffers are large
    let src_image = ImageRef::new(img.width, img.height, &img.rgb, fr::PixelType::U8x3)
        .map_err(|e| ConvertError::Encode(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = FrImage::new(dst_w, dst_h, fr::PixelType::U8x3);

    let mut resizer = fr::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, None)
        .map_err(|e| ConvertError::Encode(format!("Resize failed: {:?}", e)))?;

    DecodedImage::new(dst_w, dst_h, dst_image.buffer().to_vec())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Deterministic textured image, rough enough that quality matters
    pub(crate) fn textured(width: u32, height: u32) -> DecodedImage {
        let mut rgb = Vec::with_capacity((width * height * 3) as usize);
        let mut state: u32 = 0x1234_5678;
        for y in 0..height {
            for x in 0..width {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let noise = (state >> 24) as u8 / 4;
                rgb.push(((x * 255 / width.max(1)) as u8).wrapping_add(noise));
                rgb.push(((y * 255 / height.max(1)) as u8).wrapping_add(noise));
                rgb.push((((x ^ y) & 0xff) as u8).wrapping_add(noise));
            }
        }
        DecodedImage::new(width, height, rgb).unwrap()
    }

    #[test]
    fn test_quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn test_quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn test_extensions() {
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
        assert_eq!(OutputFormat::Webp.extension(), "webp");
    }

    #[test]
    fn test_jpeg_encode_produces_jpeg() {
        let img = textured(64, 48);
        let bytes = EncoderConfig::default().encode(&img).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_webp_encode_produces_riff() {
        let img = textured(32, 32);
        let config = EncoderConfig::new(OutputFormat::Webp, Quality::new(80));
        let bytes = config.encode(&img).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let img = textured(128, 128);
        let low = EncoderConfig::default().with_quality(Quality::new(10)).encode(&img).unwrap();
        let high = EncoderConfig::default().with_quality(Quality::new(95)).encode(&img).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_resize_exact_ignores_aspect_ratio() {
        let img = textured(300, 100);
        let small = resize_exact(&img, 40, 40).unwrap();
        assert_eq!((small.width, small.height), (40, 40));
        assert_eq!(small.rgb.len(), 40 * 40 * 3);
    }
}
