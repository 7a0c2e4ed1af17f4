//! Sources of original images.
//!
//! The pipeline reads source bytes through the [`ImageSource`] trait so that
//! it can be backed by the local filesystem in production and by in-memory
//! fixtures in tests.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::SourceError;

/// Trait for reading source images by path.
///
/// Paths are pre-validated by the caller: relative, without `..` segments.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Read the full contents of the source image at `path`.
    ///
    /// # Errors
    ///
    /// `SourceError::NotFound` if nothing exists at `path`,
    /// `SourceError::Unreadable` for any other failure.
    async fn read(&self, path: &str) -> Result<Bytes, SourceError>;

    /// Human-readable location of `path`, for logs.
    fn describe(&self, path: &str) -> String {
        path.to_string()
    }
}

// =============================================================================
// Local Filesystem Source
// =============================================================================

/// Reads source images from a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalImageSource {
    root: PathBuf,
}

impl LocalImageSource {
    /// Create a source rooted at `root`.
    ///
    /// Request paths are resolved relative to this directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl ImageSource for LocalImageSource {
    async fn read(&self, path: &str) -> Result<Bytes, SourceError> {
        let full_path = self.resolve(path);

        let metadata = match tokio::fs::metadata(&full_path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SourceError::NotFound(path.to_string()));
            }
            Err(e) => {
                return Err(SourceError::Unreadable {
                    path: path.to_string(),
                    message: e.to_string(),
                });
            }
        };

        if !metadata.is_file() {
            return Err(SourceError::NotFound(path.to_string()));
        }

        tokio::fs::read(&full_path)
            .await
            .map(Bytes::from)
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SourceError::NotFound(path.to_string()),
                _ => SourceError::Unreadable {
                    path: path.to_string(),
                    message: e.to_string(),
                },
            })
    }

    fn describe(&self, path: &str) -> String {
        self.resolve(path).display().to_string()
    }
}
