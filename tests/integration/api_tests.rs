//! API integration tests for image retrieval and error handling.
//!
//! Tests verify:
//! - Image retrieval with and without resizing
//! - Response headers (content type, cache control, cache hit marker)
//! - Error cases (missing image, bad parameters, unsafe paths, corrupt data)
//! - Health endpoint

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use image_delivery::{create_router, CacheStore, ImagePipeline, RouterConfig};

use super::test_utils::{
    corrupt_image_bytes, create_test_png, create_test_rgba_png, is_valid_jpeg, jpeg_dimensions,
    MockImageSource,
};

fn test_router(source: MockImageSource) -> Router {
    let pipeline = ImagePipeline::new(source, Arc::new(CacheStore::default()));
    create_router(pipeline, RouterConfig::new().with_tracing(false))
}

fn sample_router() -> Router {
    test_router(MockImageSource::new().with_image("/static/img/sample.png", create_test_png(400, 200)))
}

async fn get(router: Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    router.oneshot(request).await.unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Basic Image Retrieval
// =============================================================================

#[tokio::test]
async fn test_image_retrieval_success() {
    let response = get(sample_router(), "/optimized-image?path=/static/img/sample.png").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=3600"
    );
    assert_eq!(response.headers().get("x-image-cache-hit").unwrap(), "false");

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&body), "Response should be a valid JPEG");
    assert_eq!(jpeg_dimensions(&body), (400, 200));
}

#[tokio::test]
async fn test_resize_both_dimensions() {
    let response = get(
        sample_router(),
        "/optimized-image?path=/static/img/sample.png&w=200&h=100",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(jpeg_dimensions(&body), (200, 100));
}

#[tokio::test]
async fn test_resize_width_preserves_aspect_ratio() {
    let response = get(
        sample_router(),
        "/optimized-image?path=/static/img/sample.png&w=100",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(jpeg_dimensions(&body), (100, 50));
}

#[tokio::test]
async fn test_resize_height_preserves_aspect_ratio() {
    let response = get(
        sample_router(),
        "/optimized-image?path=/static/img/sample.png&h=50",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(jpeg_dimensions(&body), (100, 50));
}

#[tokio::test]
async fn test_transparent_source_is_flattened() {
    let router = test_router(
        MockImageSource::new().with_image("/static/logo.png", create_test_rgba_png(32, 32)),
    );

    let response = get(router, "/optimized-image?path=/static/logo.png&q=90").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&body));
}

#[tokio::test]
async fn test_second_request_is_cache_hit() {
    let router = sample_router();
    let uri = "/optimized-image?path=/static/img/sample.png&w=120&q=70";

    let first = get(router.clone(), uri).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers().get("x-image-cache-hit").unwrap(), "false");
    let first_body = first.into_body().collect().await.unwrap().to_bytes();

    let second = get(router, uri).await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.headers().get("x-image-cache-hit").unwrap(), "true");
    let second_body = second.into_body().collect().await.unwrap().to_bytes();

    assert_eq!(first_body, second_body);
}

#[tokio::test]
async fn test_custom_cache_max_age() {
    let source =
        MockImageSource::new().with_image("/static/img/sample.png", create_test_png(40, 20));
    let pipeline = ImagePipeline::new(source, Arc::new(CacheStore::default()));
    let router = create_router(
        pipeline,
        RouterConfig::new()
            .with_tracing(false)
            .with_cache_max_age(60),
    );

    let response = get(router, "/optimized-image?path=/static/img/sample.png").await;

    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=60"
    );
}

// =============================================================================
// Error Cases
// =============================================================================

#[tokio::test]
async fn test_missing_image_returns_404() {
    let response = get(sample_router(), "/optimized-image?path=/static/img/nope.png").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_missing_path_returns_400() {
    let response = get(sample_router(), "/optimized-image?w=100").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "invalid_request");
}

#[tokio::test]
async fn test_invalid_dimensions_return_400() {
    for uri in [
        "/optimized-image?path=/static/img/sample.png&w=abc",
        "/optimized-image?path=/static/img/sample.png&w=-5",
        "/optimized-image?path=/static/img/sample.png&h=0",
        "/optimized-image?path=/static/img/sample.png&h=1.5",
    ] {
        let response = get(sample_router(), uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {}", uri);
    }
}

#[tokio::test]
async fn test_invalid_quality_returns_400() {
    for q in ["0", "101", "high", "-1"] {
        let uri = format!("/optimized-image?path=/static/img/sample.png&q={}", q);
        let response = get(sample_router(), &uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "q: {}", q);
    }
}

#[tokio::test]
async fn test_unsafe_paths_return_400() {
    for path in [
        "/etc/passwd",
        "/static/../secret.png",
        "/static/img/../../secret.png",
        "static/img/sample.png",
        "/static//img/sample.png",
    ] {
        let uri = format!("/optimized-image?path={}", path);
        let response = get(sample_router(), &uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "path: {}", path);
    }
}

#[tokio::test]
async fn test_corrupt_image_returns_415() {
    let router = test_router(
        MockImageSource::new().with_image("/static/broken.png", corrupt_image_bytes()),
    );

    let response = get(router, "/optimized-image?path=/static/broken.png").await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = json_body(response).await;
    assert_eq!(json["error"], "decode_error");
}

#[tokio::test]
async fn test_unreadable_image_says_so() {
    let router = test_router(MockImageSource::new().with_unreadable("/static/locked.png"));

    let response = get(router, "/optimized-image?path=/static/locked.png").await;

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let json = json_body(response).await;
    assert_eq!(json["error"], "decode_error");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("source unreadable"));
}

#[tokio::test]
async fn test_huge_width_returns_400() {
    let router = sample_router();

    let response = get(
        router.clone(),
        "/optimized-image?path=/static/img/sample.png&w=4294967295",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"], "invalid_request");

    // The server is still answering afterwards
    let response = get(router, "/optimized-image?path=/static/img/sample.png&w=10").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_oversized_computed_side_returns_500() {
    let router = test_router(
        MockImageSource::new().with_image("/static/tall.png", create_test_png(2, 400)),
    );

    // 100px wide keeps the aspect ratio at 100x20000
    let response = get(router, "/optimized-image?path=/static/tall.png&w=100").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert_eq!(json["error"], "encode_error");
}

#[tokio::test]
async fn test_shutdown_returns_503() {
    let source =
        MockImageSource::new().with_image("/static/img/sample.png", create_test_png(40, 20));
    let pipeline = ImagePipeline::new(source, Arc::new(CacheStore::default()));
    let shutdown = tokio_util::sync::CancellationToken::new();
    let router = create_router(
        pipeline,
        RouterConfig::new()
            .with_tracing(false)
            .with_shutdown(shutdown.clone()),
    );

    shutdown.cancel();
    let response = get(router, "/optimized-image?path=/static/img/sample.png").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["error"], "cancelled");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let response = get(sample_router(), "/images/sample.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_reports_cache_stats() {
    let router = sample_router();

    let response = get(
        router.clone(),
        "/optimized-image?path=/static/img/sample.png&w=50",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(router, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["cache"]["entries"], 1);
    assert_eq!(json["cache"]["max_entries"], 100);
    assert_eq!(json["cache"]["misses"], 1);
    assert_eq!(json["cache"]["insertions"], 1);
}
