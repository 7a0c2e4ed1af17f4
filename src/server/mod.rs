//! HTTP adapter for the image pipeline.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          HTTP Layer                             │
//! │        GET /optimized-image?path=/static/...&w=&h=&q=           │
//! │                                                                 │
//! │  ┌──────────────────────────────┐  ┌─────────────────────────┐  │
//! │  │          handlers            │  │         routes          │  │
//! │  │ (validation, error mapping)  │  │  (router, CORS, trace)  │  │
//! │  └──────────────────────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, image_handler, is_safe_image_path, AppState, ErrorResponse, HandlerError,
    HealthResponse, ImageQueryParams, STATIC_PREFIX,
};
pub use routes::{create_router, RouterConfig};
