//! Cache key derivation for transform requests.
//!
//! A key is the SHA-256 digest of the normalized source path, the requested
//! dimensions and the quality, rendered as 64 lowercase hex characters. The
//! derivation is pure and stable across processes.

use std::fmt;

use sha2::{Digest, Sha256};

/// Separator between key fields (ASCII unit separator).
///
/// Validated image paths never contain control characters, so joining on it
/// keeps the encoding unambiguous.
const FIELD_SEPARATOR: char = '\u{1F}';

/// Length of a rendered key in characters.
pub const CACHE_KEY_LEN: usize = 64;

/// Opaque cache key for one transform request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key and return the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Build the cache key for a transform request.
///
/// `None` dimensions and explicit zeros are treated alike, matching the
/// "unspecified" meaning of zero at the request boundary.
pub fn build_key(path: &str, width: Option<u32>, height: Option<u32>, quality: u8) -> CacheKey {
    let material = format!(
        "{path}{sep}{w}{sep}{h}{sep}{q}",
        path = normalize_path(path),
        w = width.unwrap_or(0),
        h = height.unwrap_or(0),
        q = quality,
        sep = FIELD_SEPARATOR,
    );

    CacheKey(hex::encode(Sha256::digest(material.as_bytes())))
}

/// Lexically normalize a source path.
///
/// Drops `.` segments and empty segments so that `./static/a.png`,
/// `static//a.png` and `static/a.png` all name the same source. A leading
/// `/` is preserved. `..` is left untouched; such paths are rejected before
/// they reach the pipeline.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    let joined = segments.join("/");
    if path.starts_with('/') {
        format!("/{}", joined)
    } else {
        joined
    }
}
