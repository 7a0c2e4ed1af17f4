//! Router configuration for the image server.
//!
//! # Route Structure
//!
//! ```text
//! /health             - Health check and cache statistics
//! /optimized-image    - Transformed image endpoint
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use image_delivery::cache::CacheStore;
//! use image_delivery::server::{create_router, RouterConfig};
//! use image_delivery::transform::{ImagePipeline, LocalImageSource};
//!
//! let cache = Arc::new(CacheStore::default());
//! let pipeline = ImagePipeline::new(LocalImageSource::new("."), cache);
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(pipeline, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, image_handler, AppState};
use crate::transform::{ImagePipeline, ImageSource, DEFAULT_QUALITY};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Quality used when a request omits `q`
    pub default_quality: u8,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Cancelled when the server shuts down; in-flight requests that have
    /// not started work fail fast
    pub shutdown: CancellationToken,
}

impl RouterConfig {
    /// Create a router configuration with defaults.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Cache max-age is 1 hour (3600 seconds)
    /// - Default quality is 80
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            default_quality: DEFAULT_QUALITY,
            enable_tracing: true,
            shutdown: CancellationToken::new(),
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Set the quality used when a request omits `q`.
    pub fn with_default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Use `token` as the shutdown signal.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// # Arguments
///
/// * `pipeline` - The image pipeline handling transform requests
/// * `config` - Router configuration
pub fn create_router<S>(pipeline: ImagePipeline<S>, config: RouterConfig) -> Router
where
    S: ImageSource + 'static,
{
    let app_state = AppState::new(pipeline)
        .with_cache_max_age(config.cache_max_age)
        .with_default_quality(config.default_quality)
        .with_shutdown(config.shutdown.clone());

    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler::<S>))
        .route("/optimized-image", get(image_handler::<S>))
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
