//! Cache layer for transformed images.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 CacheStore                   │
//! │  key (hex digest) ──► CacheEntry             │
//! │                       ├─ data (Bytes)        │
//! │                       ├─ created_at          │
//! │                       └─ access_count        │
//! │                                              │
//! │  get: shared lock, lazy expiry               │
//! │  set: exclusive lock, evicts oldest if full  │
//! └──────────────────────┬───────────────────────┘
//!                        │ purge_expired every period
//! ┌──────────────────────┴───────────────────────┐
//! │                 SweepHandle                  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! - [`CacheStore`]: concurrent key → blob store bounded by TTL and entry count
//! - [`SweepHandle`]: owner of the periodic expiry task
//! - [`build_key`]: derives the [`CacheKey`] for a transform request
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bytes::Bytes;
//! use image_delivery::cache::{build_key, CacheStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(CacheStore::new(Duration::from_secs(3600), 100));
//!     let sweeper = store.spawn_sweeper(Duration::from_secs(300));
//!
//!     let key = build_key("static/img/logo.png", Some(200), None, 80);
//!     if store.get(key.as_str()).await.is_none() {
//!         store.set(key, Bytes::from_static(b"...")).await;
//!     }
//!
//!     sweeper.stop().await;
//! }
//! ```

mod key;
mod store;
mod sweeper;

pub use key::{build_key, normalize_path, CacheKey, CACHE_KEY_LEN};
pub use store::{
    CacheEntry, CacheStats, CacheStore, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL,
};
pub use sweeper::{SweepHandle, DEFAULT_SWEEP_INTERVAL};
