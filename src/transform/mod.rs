//! Image transform layer.
//!
//! This module turns a source image and a set of transform parameters into
//! encoded output bytes, consulting the cache around the expensive work.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             HTTP Handlers               │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             ImagePipeline               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  CacheStore  │  │   Transcoder    │  │
//! │  │  (encoded    │  │  (decode →      │  │
//! │  │   outputs)   │  │ resize → encode)│  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │       ImageSource (local files)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`ImagePipeline`]: entry point for transform requests
//! - [`Transcoder`]: content-sniffing decoder, resize policy, JPEG encoder
//! - [`ImageSource`]: trait for reading source bytes; [`LocalImageSource`]
//!   reads from a directory
//! - [`TransformRequest`] / [`TransformResponse`]: request and result values

mod encoder;
mod service;
mod source;

pub use encoder::{
    is_valid_dimension, is_valid_quality, target_dimensions, Transcoder, DEFAULT_QUALITY,
    MAX_DIMENSION, MAX_QUALITY, MIN_QUALITY, OUTPUT_CONTENT_TYPE,
};
pub use service::{ImagePipeline, TransformRequest, TransformResponse};
pub use source::{ImageSource, LocalImageSource};
