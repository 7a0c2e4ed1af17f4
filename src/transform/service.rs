//! Image transform pipeline.
//!
//! The pipeline is the entry point for transform requests. It orchestrates:
//! - Cancellation check
//! - Cache lookup
//! - Source read
//! - Decode, resize and JPEG encode
//! - Result caching
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        ImagePipeline                            │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                      process()                          │    │
//! │  │  1. Check cancel      4. Read source                    │    │
//! │  │  2. Check cache       5. Transcode (blocking pool)      │    │
//! │  │  3. Guard quality     6. Cache & return                 │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌────────────┐      ┌──────────────┐    ┌──────────────┐     │
//! │    │ CacheStore │      │ ImageSource  │    │  Transcoder  │     │
//! │    └────────────┘      └──────────────┘    └──────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::cache::{build_key, CacheKey, CacheStats, CacheStore};
use crate::error::TransformError;

use super::encoder::{
    is_valid_dimension, is_valid_quality, Transcoder, DEFAULT_QUALITY, MAX_DIMENSION,
    OUTPUT_CONTENT_TYPE,
};
use super::source::ImageSource;

// =============================================================================
// Transform Request
// =============================================================================

/// A request for one transformed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    /// Source path, relative to the image source's root
    pub path: String,

    /// Target width in pixels (`None` = follow aspect ratio or keep)
    pub width: Option<u32>,

    /// Target height in pixels (`None` = follow aspect ratio or keep)
    pub height: Option<u32>,

    /// Output quality (1-100, defaults to 80)
    pub quality: u8,
}

impl TransformRequest {
    /// Create a request for the unresized source at default quality.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            width: None,
            height: None,
            quality: DEFAULT_QUALITY,
        }
    }

    /// Create a request from raw parts, where a dimension of 0 means
    /// "unspecified".
    pub fn from_parts(path: impl Into<String>, width: u32, height: u32, quality: u8) -> Self {
        Self::new(path)
            .with_width(width)
            .with_height(height)
            .with_quality(quality)
    }

    /// Set the target width (0 clears it).
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = (width > 0).then_some(width);
        self
    }

    /// Set the target height (0 clears it).
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = (height > 0).then_some(height);
        self
    }

    /// Set the output quality.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// The cache key identifying this request.
    pub fn cache_key(&self) -> CacheKey {
        build_key(&self.path, self.width, self.height, self.quality)
    }
}

// =============================================================================
// Transform Response
// =============================================================================

/// Response from the transform pipeline.
#[derive(Debug, Clone)]
pub struct TransformResponse {
    /// The encoded output image
    pub data: Bytes,

    /// Whether this image was served from cache
    pub cache_hit: bool,

    /// The quality used for encoding
    pub quality: u8,
}

// =============================================================================
// Image Pipeline
// =============================================================================

/// Service that produces resized, re-encoded images and caches the results.
///
/// The cache is injected at construction and may be shared with other
/// components (such as the background sweep) through its `Arc`.
///
/// # Type Parameters
///
/// * `S` - The image source (e.g. [`super::LocalImageSource`])
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use image_delivery::cache::CacheStore;
/// use image_delivery::transform::{ImagePipeline, LocalImageSource, TransformRequest};
///
/// let cache = Arc::new(CacheStore::default());
/// let pipeline = ImagePipeline::new(LocalImageSource::new("."), cache);
///
/// let request = TransformRequest::from_parts("./static/img/sample.png", 200, 0, 80);
/// let response = pipeline.process(&request, &CancellationToken::new()).await?;
///
/// println!("{} bytes, cache hit: {}", response.data.len(), response.cache_hit);
/// ```
pub struct ImagePipeline<S: ImageSource> {
    /// Where source images are read from
    source: S,

    /// Cache for encoded outputs
    cache: Arc<CacheStore>,

    /// Decoder / resizer / encoder
    transcoder: Transcoder,

    /// Number of completed decode-resize-encode runs
    transcodes: AtomicU64,
}

impl<S: ImageSource> ImagePipeline<S> {
    /// Create a pipeline over `source`, caching results in `cache`.
    pub fn new(source: S, cache: Arc<CacheStore>) -> Self {
        Self::with_transcoder(source, cache, Transcoder::new())
    }

    /// Create a pipeline with a custom transcoder.
    pub fn with_transcoder(source: S, cache: Arc<CacheStore>, transcoder: Transcoder) -> Self {
        Self {
            source,
            cache,
            transcoder,
            transcodes: AtomicU64::new(0),
        }
    }

    /// Produce the image described by `request`, using the cache when possible.
    ///
    /// # Errors
    ///
    /// - `Cancelled` if `cancel` is already cancelled on entry
    /// - `NotFound` if the source does not exist
    /// - `DecodeError` if the source is unreadable or not a supported image
    /// - `EncodeError` if the quality is out of range, an output side would
    ///   exceed [`MAX_DIMENSION`], or encoding fails
    #[instrument(skip(self, cancel), fields(path = %request.path))]
    pub async fn process(
        &self,
        request: &TransformRequest,
        cancel: &CancellationToken,
    ) -> Result<TransformResponse, TransformError> {
        if cancel.is_cancelled() {
            return Err(TransformError::Cancelled);
        }

        let key = request.cache_key();

        // Check cache first
        if let Some(data) = self.cache.get(key.as_str()).await {
            debug!(key = %key, "Cache hit");
            return Ok(TransformResponse {
                data,
                cache_hit: true,
                quality: request.quality,
            });
        }

        let data = self.generate(request).await?;

        self.cache.set(key, data.clone()).await;

        Ok(TransformResponse {
            data,
            cache_hit: false,
            quality: request.quality,
        })
    }

    /// Produce the image without consulting or populating the cache.
    pub async fn generate(&self, request: &TransformRequest) -> Result<Bytes, TransformError> {
        if !is_valid_quality(request.quality) {
            return Err(TransformError::EncodeError {
                message: format!("quality {} out of range (1-100)", request.quality),
            });
        }

        let oversized = [request.width, request.height]
            .into_iter()
            .flatten()
            .find(|side| !is_valid_dimension(*side));
        if let Some(side) = oversized {
            return Err(TransformError::EncodeError {
                message: format!("dimension {} exceeds the {}px limit", side, MAX_DIMENSION),
            });
        }

        let source = self.source.read(&request.path).await?;

        let transcoder = self.transcoder;
        let (width, height, quality) = (request.width, request.height, request.quality);
        let data = tokio::task::spawn_blocking(move || {
            transcoder.transcode(&source, width, height, quality)
        })
        .await
        .map_err(|e| TransformError::EncodeError {
            message: format!("transcode task failed: {}", e),
        })??;

        self.transcodes.fetch_add(1, Ordering::Relaxed);
        debug!(
            source = %self.source.describe(&request.path),
            width = ?width,
            height = ?height,
            quality,
            bytes = data.len(),
            "Transcoded image"
        );

        Ok(data)
    }

    /// Dimensions of a source image, read from its header.
    pub async fn source_dimensions(&self, path: &str) -> Result<(u32, u32), TransformError> {
        let source = self.source.read(path).await?;
        self.transcoder.dimensions(&source)
    }

    /// Content type of every image this pipeline returns.
    pub fn content_type(&self) -> &'static str {
        OUTPUT_CONTENT_TYPE
    }

    /// Number of decode-resize-encode runs performed so far.
    pub fn transcode_count(&self) -> u64 {
        self.transcodes.load(Ordering::Relaxed)
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Snapshot of cache statistics.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Clear the cache.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// The image source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

// =============================================================================
// Tests
// =============================================================================
