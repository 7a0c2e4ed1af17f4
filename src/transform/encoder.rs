//! Image transcoder: decode, resize, re-encode.
//!
//! # Design Decisions
//!
//! - **Content sniffing**: the input format is guessed from the leading bytes,
//!   never from the file extension.
//!
//! - **Single output format**: every response is a baseline JPEG, so the
//!   content type is fixed for the whole pipeline.
//!
//! - **Deterministic output**: identical source bytes and parameters always
//!   produce identical JPEG bytes.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::error::TransformError;

/// Default output quality (1-100).
pub const DEFAULT_QUALITY: u8 = 80;

/// Minimum allowed output quality.
pub const MIN_QUALITY: u8 = 1;

/// Maximum allowed output quality.
pub const MAX_QUALITY: u8 = 100;

/// Content type of every encoded output.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// Largest accepted output side in pixels, requested or computed.
pub const MAX_DIMENSION: u32 = 8192;

// =============================================================================
// Transcoder
// =============================================================================

/// Decodes source images, applies the resize policy and encodes JPEG output.
///
/// # Example
///
/// ```ignore
/// use image_delivery::transform::Transcoder;
///
/// let transcoder = Transcoder::new();
/// let source: Vec<u8> = std::fs::read("static/img/sample.png")?;
///
/// // 200px wide, height follows the aspect ratio, quality 80
/// let output = transcoder.transcode(&source, Some(200), None, 80)?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Transcoder {
    filter: FilterType,
}

impl Transcoder {
    /// Create a transcoder using Lanczos3 resampling.
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    /// Use a different resampling filter.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// The resampling filter in use.
    pub fn filter(&self) -> FilterType {
        self.filter
    }

    /// Decode, resize and encode in one step.
    pub fn transcode(
        &self,
        source: &[u8],
        width: Option<u32>,
        height: Option<u32>,
        quality: u8,
    ) -> Result<Bytes, TransformError> {
        let image = self.decode(source)?;
        let image = self.resize(image, width, height)?;
        self.encode(&image, quality)
    }

    /// Decode source bytes, detecting the format from their content.
    pub fn decode(&self, source: &[u8]) -> Result<DynamicImage, TransformError> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| TransformError::DecodeError {
                message: e.to_string(),
            })?;

        if reader.format().is_none() {
            return Err(TransformError::DecodeError {
                message: "unrecognized image format".to_string(),
            });
        }

        reader.decode().map_err(|e| TransformError::DecodeError {
            message: e.to_string(),
        })
    }

    /// Apply the resize policy.
    ///
    /// See [`target_dimensions`] for how the output size is chosen.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` if either output side would exceed
    /// [`MAX_DIMENSION`]. The check runs before any pixel buffer is
    /// allocated.
    pub fn resize(
        &self,
        image: DynamicImage,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<DynamicImage, TransformError> {
        let source = (image.width(), image.height());
        match target_dimensions(source, width, height) {
            Some((w, h)) if !is_valid_dimension(w) || !is_valid_dimension(h) => {
                Err(TransformError::EncodeError {
                    message: format!(
                        "output size {}x{} exceeds the {}px limit",
                        w, h, MAX_DIMENSION
                    ),
                })
            }
            Some(target) if target != source => {
                Ok(image.resize_exact(target.0, target.1, self.filter))
            }
            _ => Ok(image),
        }
    }

    /// Encode an image as JPEG at the given quality.
    ///
    /// # Errors
    ///
    /// Returns `EncodeError` if `quality` is outside 1-100 or the encoder
    /// fails.
    pub fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Bytes, TransformError> {
        if !is_valid_quality(quality) {
            return Err(TransformError::EncodeError {
                message: format!(
                    "quality {} out of range ({}-{})",
                    quality, MIN_QUALITY, MAX_QUALITY
                ),
            });
        }

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, quality);

        // JPEG carries no alpha; anything that is not plain grayscale is
        // flattened to RGB.
        let result = match image {
            DynamicImage::ImageLuma8(gray) => encoder.encode_image(gray),
            other => encoder.encode_image(&other.to_rgb8()),
        };

        result.map_err(|e| TransformError::EncodeError {
            message: e.to_string(),
        })?;

        Ok(Bytes::from(output))
    }

    /// Read image dimensions from the header without decoding pixels.
    ///
    /// # Returns
    ///
    /// `(width, height)` in pixels.
    pub fn dimensions(&self, source: &[u8]) -> Result<(u32, u32), TransformError> {
        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| TransformError::DecodeError {
                message: e.to_string(),
            })?;

        reader
            .into_dimensions()
            .map_err(|e| TransformError::DecodeError {
                message: e.to_string(),
            })
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Compute the output size for a source of `(w0, h0)`.
///
/// - both given: exactly `width × height`, aspect ratio ignored
/// - width only: height is `round(h0 * width / w0)`
/// - height only: width is `round(w0 * height / h0)`
/// - neither: `None`, the source passes through unresized
///
/// Zero counts as unspecified. Computed sides are at least 1 pixel.
pub fn target_dimensions(
    (w0, h0): (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> Option<(u32, u32)> {
    let width = width.filter(|w| *w > 0);
    let height = height.filter(|h| *h > 0);

    match (width, height) {
        (Some(w), Some(h)) => Some((w, h)),
        (Some(w), None) if w0 > 0 => Some((w, scale_side(h0, w, w0))),
        (None, Some(h)) if h0 > 0 => Some((scale_side(w0, h, h0), h)),
        _ => None,
    }
}

/// `round(side * num / den)`, clamped to at least 1.
fn scale_side(side: u32, num: u32, den: u32) -> u32 {
    let scaled = (side as f64 * num as f64 / den as f64).round();
    scaled.clamp(1.0, u32::MAX as f64) as u32
}

/// Check that an output side is within 1..=[`MAX_DIMENSION`].
#[inline]
pub fn is_valid_dimension(side: u32) -> bool {
    (1..=MAX_DIMENSION).contains(&side)
}

/// Validate a quality parameter.
///
/// Returns `true` if quality is in the valid range (1-100).
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_QUALITY..=MAX_QUALITY).contains(&quality)
}

// =============================================================================
// Tests
// =============================================================================
