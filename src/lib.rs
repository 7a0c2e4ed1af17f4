//! # Image Delivery
//!
//! On-demand image resizing and re-encoding with an in-memory result cache.
//!
//! A request names a source image plus optional target dimensions and an
//! output quality. The first request for a given combination decodes the
//! source, resizes it and encodes a JPEG; the result is cached so repeated
//! requests are served from memory until the entry expires or is evicted.
//!
//! ## Features
//!
//! - **Bounded TTL cache**: Size-limited store with lazy expiry, access counts
//!   and a background sweep of expired entries
//! - **Deterministic keys**: SHA-256 over the normalized request parameters
//! - **Transcoding**: Decode any supported raster format, resize with
//!   Lanczos3, encode JPEG at the requested quality
//! - **HTTP adapter**: Axum router exposing `/optimized-image` and `/health`
//!
//! ## Architecture
//!
//! - [`cache`] - Cache store, key builder and background sweeper
//! - [`transform`] - Image sources, transcoder and the request pipeline
//! - [`server`] - Axum-based HTTP handlers and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types shared across the crate
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use image_delivery::{CacheStore, ImagePipeline, LocalImageSource, TransformRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Arc::new(CacheStore::default());
//!     let pipeline = ImagePipeline::new(LocalImageSource::new("."), cache);
//!
//!     let request = TransformRequest::new("./static/photo.png")
//!         .with_width(320)
//!         .with_quality(75);
//!
//!     let response = pipeline
//!         .process(&request, &CancellationToken::new())
//!         .await
//!         .unwrap();
//!     println!("{} bytes, cache hit: {}", response.data.len(), response.cache_hit);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod server;
pub mod transform;

// Re-export commonly used types
pub use cache::{
    build_key, normalize_path, CacheEntry, CacheKey, CacheStats, CacheStore, SweepHandle,
    CACHE_KEY_LEN, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL, DEFAULT_SWEEP_INTERVAL,
};
pub use config::Config;
pub use error::{RequestError, SourceError, TransformError};
pub use server::{
    create_router, health_handler, image_handler, is_safe_image_path, AppState, ErrorResponse,
    HandlerError, HealthResponse, ImageQueryParams, RouterConfig, STATIC_PREFIX,
};
pub use transform::{
    is_valid_dimension, is_valid_quality, target_dimensions, ImagePipeline, ImageSource,
    LocalImageSource, Transcoder, TransformRequest, TransformResponse, DEFAULT_QUALITY,
    MAX_DIMENSION, MAX_QUALITY, MIN_QUALITY, OUTPUT_CONTENT_TYPE,
};
