//! HTTP request handlers for the image API.
//!
//! This module contains the Axum handlers for serving transformed images and
//! health checks.
//!
//! # Endpoints
//!
//! - `GET /optimized-image?path=/static/...&w=&h=&q=` - Serve a transformed image
//! - `GET /health` - Health check with cache statistics

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::cache::CacheStats;
use crate::error::{RequestError, TransformError};
use crate::transform::{
    is_valid_dimension, is_valid_quality, ImagePipeline, ImageSource, TransformRequest,
    DEFAULT_QUALITY,
};

/// URL prefix every image path must start with.
pub const STATIC_PREFIX: &str = "/static/";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the image pipeline.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<S: ImageSource> {
    /// The pipeline for processing image requests
    pub pipeline: Arc<ImagePipeline<S>>,

    /// Cache-Control max-age in seconds for image responses
    pub cache_max_age: u32,

    /// Quality used when the request does not specify one
    pub default_quality: u8,

    /// Cancelled when the server begins shutting down
    pub shutdown: CancellationToken,
}

impl<S: ImageSource> AppState<S> {
    /// Create a new application state with the given pipeline.
    pub fn new(pipeline: ImagePipeline<S>) -> Self {
        Self::with_shared_pipeline(Arc::new(pipeline))
    }

    /// Create a new application state around an already shared pipeline.
    pub fn with_shared_pipeline(pipeline: Arc<ImagePipeline<S>>) -> Self {
        Self {
            pipeline,
            cache_max_age: 3600,
            default_quality: DEFAULT_QUALITY,
            shutdown: CancellationToken::new(),
        }
    }

    /// Set the Cache-Control max-age.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Set the quality used when a request omits `q`.
    pub fn with_default_quality(mut self, quality: u8) -> Self {
        self.default_quality = quality;
        self
    }

    /// Use `token` as the shutdown signal for in-flight requests.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

impl<S: ImageSource> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            cache_max_age: self.cache_max_age,
            default_quality: self.default_quality,
            shutdown: self.shutdown.clone(),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for image requests.
///
/// Values are kept as strings so malformed numbers produce a precise error
/// instead of a generic extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ImageQueryParams {
    /// Image path under `/static/`
    #[serde(default)]
    pub path: Option<String>,

    /// Target width in pixels
    #[serde(default)]
    pub w: Option<String>,

    /// Target height in pixels
    #[serde(default)]
    pub h: Option<String>,

    /// Output quality (1-100)
    #[serde(default)]
    pub q: Option<String>,
}

impl ImageQueryParams {
    /// Validate the parameters and build a transform request.
    ///
    /// The returned request's path is relative to the server root
    /// (`/static/a.png` becomes `./static/a.png`).
    pub fn into_request(self, default_quality: u8) -> Result<TransformRequest, RequestError> {
        let path = self
            .path
            .filter(|p| !p.is_empty())
            .ok_or(RequestError::MissingPath)?;

        if !is_safe_image_path(&path) {
            return Err(RequestError::InvalidPath(path));
        }

        let width = parse_dimension(self.w.as_deref()).map_err(RequestError::InvalidWidth)?;
        let height = parse_dimension(self.h.as_deref()).map_err(RequestError::InvalidHeight)?;

        let quality = match non_empty(self.q.as_deref()) {
            None => default_quality,
            Some(raw) => raw
                .parse::<u8>()
                .ok()
                .filter(|q| is_valid_quality(*q))
                .ok_or_else(|| RequestError::InvalidQuality(raw.to_string()))?,
        };

        Ok(TransformRequest::from_parts(
            format!(".{}", path),
            width.unwrap_or(0),
            height.unwrap_or(0),
            quality,
        ))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Parse an optional side length in 1..=[`MAX_DIMENSION`]; the error
/// carries the raw input.
///
/// [`MAX_DIMENSION`]: crate::transform::MAX_DIMENSION
fn parse_dimension(value: Option<&str>) -> Result<Option<u32>, String> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => match raw.parse::<u32>() {
            Ok(n) if is_valid_dimension(n) => Ok(Some(n)),
            _ => Err(raw.to_string()),
        },
    }
}

/// Check that `path` names a file under [`STATIC_PREFIX`] with no traversal.
///
/// The path must be in clean form: no empty, `.` or `..` segments, no
/// backslashes and no control characters.
pub fn is_safe_image_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix(STATIC_PREFIX) else {
        return false;
    };

    if path.contains('\\') || path.chars().any(char::is_control) {
        return false;
    }

    rest.split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Image cache statistics
    pub cache: CacheStats,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Build the JSON error response and log it by severity:
/// 5xx at ERROR, 404 at DEBUG, other 4xx at WARN.
fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

impl IntoResponse for TransformError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            TransformError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            TransformError::DecodeError { .. } => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "decode_error")
            }
            TransformError::EncodeError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encode_error")
            }
            TransformError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "cancelled"),
        };

        error_response(status, error_type, self.to_string())
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        error_response(StatusCode::BAD_REQUEST, "invalid_request", self.to_string())
    }
}

/// Error type returned by the image handler.
#[derive(Debug)]
pub enum HandlerError {
    Request(RequestError),
    Transform(TransformError),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Request(err) => err.into_response(),
            HandlerError::Transform(err) => err.into_response(),
        }
    }
}

impl From<RequestError> for HandlerError {
    fn from(err: RequestError) -> Self {
        HandlerError::Request(err)
    }
}

impl From<TransformError> for HandlerError {
    fn from(err: TransformError) -> Self {
        HandlerError::Transform(err)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle image requests.
///
/// # Endpoint
///
/// `GET /optimized-image`
///
/// # Query Parameters
///
/// - `path`: image path, must start with `/static/` (required)
/// - `w`: target width in pixels, 1-8192 (optional)
/// - `h`: target height in pixels, 1-8192 (optional)
/// - `q`: output quality 1-100 (optional, defaults to 80)
///
/// # Response
///
/// `200 OK` with the encoded image, `Content-Type: image/jpeg`,
/// `Cache-Control: public, max-age=<n>` and `X-Image-Cache-Hit`.
///
/// # Errors
///
/// - `400 Bad Request`: missing or malformed parameters, unsafe path
/// - `404 Not Found`: source image does not exist
/// - `415 Unsupported Media Type`: source is not a decodable image, or
///   exists but could not be read (message starts with "source unreadable")
/// - `500 Internal Server Error`: encoding failed, or the aspect-preserving
///   side computed from `w`/`h` exceeds 8192 pixels
/// - `503 Service Unavailable`: server is shutting down
pub async fn image_handler<S: ImageSource>(
    State(state): State<AppState<S>>,
    Query(params): Query<ImageQueryParams>,
) -> Result<Response, HandlerError> {
    let request = params.into_request(state.default_quality)?;

    let response = state.pipeline.process(&request, &state.shutdown).await?;

    let headers = [
        (
            header::CONTENT_TYPE,
            state.pipeline.content_type().to_string(),
        ),
        (
            header::CACHE_CONTROL,
            format!("public, max-age={}", state.cache_max_age),
        ),
    ];

    Ok((
        StatusCode::OK,
        headers,
        [("x-image-cache-hit", response.cache_hit.to_string())],
        response.data,
    )
        .into_response())
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "cache": { "entries": 3, "max_entries": 100, "hits": 12, ... }
/// }
/// ```
pub async fn health_handler<S: ImageSource>(
    State(state): State<AppState<S>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: state.pipeline.cache_stats().await,
    })
}

// =============================================================================
// Tests
// =============================================================================
