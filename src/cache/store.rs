//! Time- and size-bounded store for encoded images.
//!
//! The store maps opaque string keys to immutable byte blobs. Every entry
//! carries its insertion time and an access counter. Entries older than the
//! store's TTL are never returned: readers treat them as absent and remove
//! them on the spot, and the background sweep (see [`super::sweeper`])
//! removes the ones nobody reads again.
//!
//! # Size Bound
//!
//! The store holds at most `max_entries` entries. Inserting a new key into a
//! full store evicts exactly one entry first: the one written longest ago.
//! Reads do not reorder entries, which keeps them on the shared lock.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use lru::LruCache;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Default time-to-live for cached images: 1 hour.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Default maximum number of cached images.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;

// =============================================================================
// Cache Entry
// =============================================================================

/// A single cached image.
#[derive(Debug)]
pub struct CacheEntry {
    data: Bytes,
    created_at: Instant,
    access_count: AtomicU64,
}

impl CacheEntry {
    fn new(data: Bytes) -> Self {
        Self {
            data,
            created_at: Instant::now(),
            access_count: AtomicU64::new(0),
        }
    }

    /// The encoded image bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// When the entry was inserted.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Number of read hits served from this entry.
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// An entry is expired once its age reaches the TTL.
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Point-in-time counters for a [`CacheStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries currently held (expired entries not yet purged included)
    pub entries: usize,
    /// Configured entry ceiling
    pub max_entries: usize,
    /// Configured time-to-live in seconds
    pub ttl_secs: u64,
    /// Reads that returned data
    pub hits: u64,
    /// Reads that found nothing, or only an expired entry
    pub misses: u64,
    /// Successful writes, including overwrites
    pub insertions: u64,
    /// Entries removed to respect the size ceiling
    pub evictions: u64,
    /// Entries removed because they outlived the TTL
    pub expirations: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

// =============================================================================
// Cache Store
// =============================================================================

/// Concurrent, TTL-bounded, size-bounded cache of encoded images.
///
/// # Thread Safety
///
/// All methods take `&self`. Reads share a read lock and may run in
/// parallel; writes hold the write lock only for the map mutation itself.
/// Share the store across tasks with `Arc`.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use bytes::Bytes;
/// use image_delivery::cache::CacheStore;
///
/// #[tokio::main]
/// async fn main() {
///     let store = CacheStore::new(Duration::from_secs(60), 10);
///
///     store.set("thumb", Bytes::from_static(&[0xFF, 0xD8])).await;
///     assert_eq!(store.get("thumb").await, Some(Bytes::from_static(&[0xFF, 0xD8])));
///     assert_eq!(store.get("other").await, None);
/// }
/// ```
pub struct CacheStore {
    entries: RwLock<LruCache<String, CacheEntry>>,
    ttl: Duration,
    max_entries: NonZeroUsize,
    counters: Counters,
}

impl CacheStore {
    /// Create a store with the given TTL and entry ceiling.
    ///
    /// A ceiling of zero is raised to one.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(max_entries)),
            ttl,
            max_entries,
            counters: Counters::default(),
        }
    }

    /// Look up a cached image.
    ///
    /// Returns `None` when the key is absent or its entry has reached the
    /// TTL. An expired entry is removed before returning. A hit bumps the
    /// entry's access counter.
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        {
            let entries = self.entries.read().await;
            match entries.peek(key) {
                None => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
                Some(entry) if !entry.is_expired(self.ttl, Instant::now()) => {
                    entry.access_count.fetch_add(1, Ordering::Relaxed);
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.data.clone());
                }
                Some(_) => {}
            }
        }

        // Expired. A writer may have replaced the entry since the read lock
        // was released, so check again before removing.
        let mut entries = self.entries.write().await;
        let still_expired = entries
            .peek(key)
            .is_some_and(|entry| entry.is_expired(self.ttl, Instant::now()));
        if still_expired {
            entries.pop(key);
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Expired cache entry removed on read");
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or replace a cached image.
    ///
    /// The entry's creation time is reset to now. If `key` is new and the
    /// store is full, the entry written longest ago is evicted first.
    pub async fn set(&self, key: impl Into<String>, data: Bytes) {
        let key = key.into();
        let entry = CacheEntry::new(data);

        let mut entries = self.entries.write().await;
        if let Some((displaced, _)) = entries.push(key.clone(), entry) {
            // `push` hands back the old value on overwrite; only a different
            // key means something was evicted.
            if displaced != key {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(evicted = %displaced, "Cache full, evicted oldest entry");
            }
        }
        self.counters.insertions.fetch_add(1, Ordering::Relaxed);
    }

    /// Check for a live entry without counting a hit or miss.
    pub async fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(self.ttl, Instant::now()))
    }

    /// Number of read hits served for `key`, if a live entry exists.
    pub async fn access_count(&self, key: &str) -> Option<u64> {
        let entries = self.entries.read().await;
        entries
            .peek(key)
            .filter(|entry| !entry.is_expired(self.ttl, Instant::now()))
            .map(CacheEntry::access_count)
    }

    /// Remove an entry, returning its data if it was present.
    pub async fn remove(&self, key: &str) -> Option<Bytes> {
        let mut entries = self.entries.write().await;
        entries.pop(key).map(|entry| entry.data)
    }

    /// Remove every entry whose age has reached the TTL.
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl, now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }

        self.counters
            .expirations
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        expired.len()
    }

    /// Remove all entries.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Number of entries held, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    /// Check whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        let entries = self.entries.read().await;
        entries.is_empty()
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Configured entry ceiling.
    pub fn max_entries(&self) -> usize {
        self.max_entries.get()
    }

    /// Snapshot of the store's counters.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            max_entries: self.max_entries(),
            ttl_secs: self.ttl.as_secs(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            insertions: self.counters.insertions.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL, DEFAULT_CACHE_MAX_ENTRIES)
    }
}

// =============================================================================
// Tests
// =============================================================================
