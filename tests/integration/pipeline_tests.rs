//! Pipeline integration tests against images on disk.
//!
//! Tests verify:
//! - Resizing and re-encoding through `LocalImageSource`
//! - Repeated requests skip decoding
//! - Each parameter combination is cached separately
//! - Expired and evicted results are regenerated

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use image_delivery::{
    CacheStore, ImagePipeline, LocalImageSource, TransformError, TransformRequest,
};

use super::test_utils::{
    corrupt_image_bytes, create_test_png, is_valid_jpeg, jpeg_dimensions, StaticDir,
};

fn disk_pipeline(dir: &StaticDir, cache: CacheStore) -> ImagePipeline<LocalImageSource> {
    ImagePipeline::new(LocalImageSource::new(dir.root()), Arc::new(cache))
}

/// Root-relative request path, as the HTTP adapter builds it.
fn local(http_path: &str) -> String {
    format!(".{}", http_path)
}

// =============================================================================
// Transform Results
// =============================================================================

#[tokio::test]
async fn test_resize_from_disk() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(400, 200));
    let pipeline = disk_pipeline(&dir, CacheStore::default());

    let request = TransformRequest::new(local(&path))
        .with_width(200)
        .with_height(100)
        .with_quality(80);
    let response = pipeline
        .process(&request, &CancellationToken::new())
        .await
        .unwrap();

    assert!(!response.cache_hit);
    assert_eq!(response.quality, 80);
    assert!(is_valid_jpeg(&response.data));
    assert_eq!(jpeg_dimensions(&response.data), (200, 100));
}

#[tokio::test]
async fn test_no_dimensions_keeps_source_size() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(64, 48));
    let pipeline = disk_pipeline(&dir, CacheStore::default());

    let response = pipeline
        .process(&TransformRequest::new(local(&path)), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(jpeg_dimensions(&response.data), (64, 48));
}

#[tokio::test]
async fn test_source_dimensions_from_disk() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(400, 200));
    let pipeline = disk_pipeline(&dir, CacheStore::default());

    let dims = pipeline.source_dimensions(&local(&path)).await.unwrap();
    assert_eq!(dims, (400, 200));
}

#[tokio::test]
async fn test_lower_quality_produces_smaller_output() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(256, 256));
    let pipeline = disk_pipeline(&dir, CacheStore::default());
    let cancel = CancellationToken::new();

    let high = pipeline
        .process(&TransformRequest::new(local(&path)).with_quality(95), &cancel)
        .await
        .unwrap();
    let low = pipeline
        .process(&TransformRequest::new(local(&path)).with_quality(10), &cancel)
        .await
        .unwrap();

    assert!(low.data.len() < high.data.len());
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_repeat_request_skips_decode() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(400, 200));
    let pipeline = disk_pipeline(&dir, CacheStore::default());
    let cancel = CancellationToken::new();

    let request = TransformRequest::new(local(&path)).with_width(100);

    let first = pipeline.process(&request, &cancel).await.unwrap();
    let second = pipeline.process(&request, &cancel).await.unwrap();

    assert!(!first.cache_hit);
    assert!(second.cache_hit);
    assert_eq!(first.data, second.data);
    assert_eq!(pipeline.transcode_count(), 1);

    let key = request.cache_key();
    assert_eq!(pipeline.cache().access_count(key.as_str()).await, Some(1));
}

#[tokio::test]
async fn test_cached_result_survives_source_removal() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(40, 20));
    let pipeline = disk_pipeline(&dir, CacheStore::default());
    let cancel = CancellationToken::new();
    let request = TransformRequest::new(local(&path));

    pipeline.process(&request, &cancel).await.unwrap();
    std::fs::remove_file(dir.root().join("static/img/sample.png")).unwrap();

    let response = pipeline.process(&request, &cancel).await.unwrap();
    assert!(response.cache_hit);
}

#[tokio::test]
async fn test_distinct_parameters_cached_separately() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(400, 200));
    let pipeline = disk_pipeline(&dir, CacheStore::default());
    let cancel = CancellationToken::new();

    let base = TransformRequest::new(local(&path)).with_width(100);
    pipeline.process(&base, &cancel).await.unwrap();
    pipeline
        .process(&base.clone().with_quality(50), &cancel)
        .await
        .unwrap();
    pipeline
        .process(&base.clone().with_height(10), &cancel)
        .await
        .unwrap();

    assert_eq!(pipeline.transcode_count(), 3);
    assert_eq!(pipeline.cache().len().await, 3);
}

#[tokio::test]
async fn test_expired_result_is_regenerated() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(40, 20));
    let pipeline = disk_pipeline(&dir, CacheStore::new(Duration::from_millis(50), 10));
    let cancel = CancellationToken::new();
    let request = TransformRequest::new(local(&path));

    pipeline.process(&request, &cancel).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let response = pipeline.process(&request, &cancel).await.unwrap();
    assert!(!response.cache_hit);
    assert_eq!(pipeline.transcode_count(), 2);
}

#[tokio::test]
async fn test_evicted_result_is_regenerated() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(40, 20));
    let pipeline = disk_pipeline(&dir, CacheStore::new(Duration::from_secs(60), 2));
    let cancel = CancellationToken::new();

    let a = TransformRequest::new(local(&path)).with_width(10);
    let b = TransformRequest::new(local(&path)).with_width(20);
    let c = TransformRequest::new(local(&path)).with_width(30);

    for request in [&a, &b, &c] {
        pipeline.process(request, &cancel).await.unwrap();
    }
    assert_eq!(pipeline.cache().len().await, 2);

    // `a` was written first, so it made room for `c`
    assert!(!pipeline.process(&a, &cancel).await.unwrap().cache_hit);
    assert!(pipeline.process(&c, &cancel).await.unwrap().cache_hit);
    assert_eq!(pipeline.cache_stats().await.evictions, 2);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let dir = StaticDir::new();
    let pipeline = disk_pipeline(&dir, CacheStore::default());

    let result = pipeline
        .process(
            &TransformRequest::new("./static/img/missing.png"),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(TransformError::NotFound { .. })));
}

#[tokio::test]
async fn test_directory_is_not_found() {
    let dir = StaticDir::new();
    let pipeline = disk_pipeline(&dir, CacheStore::default());

    let result = pipeline
        .process(
            &TransformRequest::new("./static/img"),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(TransformError::NotFound { .. })));
}

#[tokio::test]
async fn test_corrupt_file_is_decode_error() {
    let dir = StaticDir::new();
    let path = dir.add("broken.png", &corrupt_image_bytes());
    let pipeline = disk_pipeline(&dir, CacheStore::default());

    let result = pipeline
        .process(&TransformRequest::new(local(&path)), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(TransformError::DecodeError { .. })));
    assert!(pipeline.cache().is_empty().await);
}

#[tokio::test]
async fn test_oversized_width_is_encode_error() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(400, 200));
    let pipeline = disk_pipeline(&dir, CacheStore::default());

    let request = TransformRequest::new(local(&path)).with_width(u32::MAX);
    let result = pipeline.process(&request, &CancellationToken::new()).await;

    assert!(matches!(result, Err(TransformError::EncodeError { .. })));
    assert_eq!(pipeline.transcode_count(), 0);
    assert!(pipeline.cache().is_empty().await);
}

#[tokio::test]
async fn test_cancelled_request_does_no_work() {
    let dir = StaticDir::new();
    let path = dir.add("sample.png", &create_test_png(40, 20));
    let pipeline = disk_pipeline(&dir, CacheStore::default());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline
        .process(&TransformRequest::new(local(&path)), &cancel)
        .await;

    assert!(matches!(result, Err(TransformError::Cancelled)));
    assert_eq!(pipeline.transcode_count(), 0);
    assert!(pipeline.cache().is_empty().await);
}
