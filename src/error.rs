use thiserror::Error;

/// Errors raised while reading a source image from storage
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The source does not exist (or is not a regular file)
    #[error("Source not found: {0}")]
    NotFound(String),

    /// The source exists but could not be read
    #[error("Failed to read {path}: {message}")]
    Unreadable { path: String, message: String },
}

/// Errors returned by the image transform pipeline.
///
/// Every variant is terminal for the request that produced it; the pipeline
/// never retries internally.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// The source image does not exist
    #[error("Image not found: {path}")]
    NotFound { path: String },

    /// The source could not be read, or its bytes are corrupt or in an
    /// unsupported format. Read failures carry a "source unreadable" prefix.
    #[error("Failed to decode image: {message}")]
    DecodeError { message: String },

    /// The encoder rejected its parameters or failed to produce output
    #[error("Failed to encode image: {message}")]
    EncodeError { message: String },

    /// The caller cancelled the request before work started
    #[error("Request cancelled")]
    Cancelled,
}

/// Errors in an incoming HTTP image request, detected before the pipeline runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The `path` query parameter is absent or empty
    #[error("path parameter is required")]
    MissingPath,

    /// The path is outside the static directory or not a clean relative path
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// `w` is not a positive integer
    #[error("invalid width parameter: {0}")]
    InvalidWidth(String),

    /// `h` is not a positive integer
    #[error("invalid height parameter: {0}")]
    InvalidHeight(String),

    /// `q` is not an integer in 1-100
    #[error("invalid quality parameter (1-100): {0}")]
    InvalidQuality(String),
}

impl From<SourceError> for TransformError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::NotFound(path) => TransformError::NotFound { path },
            SourceError::Unreadable { path, message } => TransformError::DecodeError {
                message: format!("source unreadable: {}: {}", path, message),
            },
        }
    }
}
