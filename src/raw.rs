//! RAW decoding
//!
//! RAW formats go through LibRaw (via `rsraw`) with its default development
//! parameters. Anything LibRaw refuses to open is handed to the `image` crate,
//! so TIFF/PNG/JPEG inputs still convert.

use crate::error::{ConvertError, Result};
use rsraw::{RawImage, BIT_DEPTH_8};
use std::path::Path;
use tracing::debug;

/// Full-resolution 8-bit RGB pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Interleaved RGB, `width * height * 3` bytes
    pub rgb: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || rgb.len() != expected {
            return Err(ConvertError::Decode(format!(
                "Buffer of {} bytes does not match {}x{} RGB",
                rgb.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, rgb })
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Anything that can turn a file into RGB pixels.
///
/// The batch converter and the size estimator only talk to this trait, which
/// keeps them testable without real RAW files.
pub trait RawDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedImage>;
}

/// RAW image processing using libraw via FFI
#[derive(Debug, Default, Clone, Copy)]
pub struct RawProcessor;

impl RawProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Check if file is a RAW format using tree_magic_mini for MIME detection
    pub fn is_raw_format(path: &Path) -> bool {
        let mime_type = tree_magic_mini::from_filepath(path);

        matches!(
            mime_type,
            Some("image/x-canon-cr2") |
            Some("image/x-canon-cr3") |
            Some("image/x-canon-crw") |
            Some("image/x-nikon-nef") |
            Some("image/x-sony-arw") |
            Some("image/x-sony-srf") |
            Some("image/x-sony-sr2") |
            Some("image/x-pentax-pef") |
            Some("image/x-samsung-srw") |
            Some("image/x-olympus-orf") |
            Some("image/x-panasonic-raw") |
            Some("image/x-fuji-raf") |
            Some("image/x-sigma-x3f") |
            Some("image/x-adobe-dng") |
            Some("image/x-dcraw") |
            Some("image/tiff")  // Many RAW formats report as TIFF
        )
    }

    /// Decode file contents already in memory
    pub fn decode_from_memory(&self, file_data: &[u8]) -> Result<DecodedImage> {
        match RawImage::open(file_data) {
            Ok(mut raw) => {
                raw.unpack()
                    .map_err(|e| ConvertError::Decode(format!("Failed to unpack RAW: {:?}", e)))?;

                let processed = raw.process::<BIT_DEPTH_8>().map_err(|e| {
                    ConvertError::Decode(format!("LibRaw processing failed: {:?}", e))
                })?;

                if processed.colors() as usize != 3 {
                    return Err(ConvertError::Decode(format!(
                        "Expected 3 colour channels, LibRaw produced {}",
                        processed.colors()
                    )));
                }

                let width = processed.width();
                let height = processed.height();
                debug!("LibRaw decoded {}x{}", width, height);

                DecodedImage::new(width, height, processed.to_vec())
            }
            Err(raw_err) => {
                // Not a RAW container, try the standard image decoders
                let img = image::load_from_memory(file_data).map_err(|e| {
                    ConvertError::Decode(format!(
                        "Not a RAW file ({:?}) nor a supported image ({})",
                        raw_err, e
                    ))
                })?;
                let rgb = img.to_rgb8();
                let (width, height) = rgb.dimensions();
                debug!("image crate decoded {}x{}", width, height);

                DecodedImage::new(width, height, rgb.into_raw())
            }
        }
    }
}

impl RawDecoder for RawProcessor {
    fn decode(&self, path: &Path) -> Result<DecodedImage> {
        let file_data = std::fs::read(path)?;
        self.decode_from_memory(&file_data)
    }
}
