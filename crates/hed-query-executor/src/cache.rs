//! Compiled query caching.
//!
//! Provides an LRU cache with TTL expiration keyed by normalized query text.
//! Thread-safe using `Mutex` for LRU operations; the lock is only held while
//! looking up or storing an entry, never during a search.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::config::CacheConfig;
use crate::query::HedQuery;

#[derive(Debug, Clone)]
struct CacheEntry {
    query: Arc<HedQuery>,
    created_at: Instant,
}

impl CacheEntry {
    fn new(query: Arc<HedQuery>) -> Self {
        Self {
            query,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Thread-safe LRU cache with TTL expiration for compiled queries.
///
/// # Features
///
/// - **LRU Eviction**: When the cache is full, the least recently used entry is evicted.
/// - **TTL Expiration**: Entries expire after the configured time-to-live.
/// - **Shared Entries**: Hits hand out the same `Arc<HedQuery>`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use hed_query_executor::{HedQuery, QueryCache};
///
/// let cache = QueryCache::with_capacity(100, Duration::from_secs(60));
/// let query = Arc::new(HedQuery::new("a && b").unwrap());
/// cache.set("a && b".to_string(), Arc::clone(&query));
///
/// let cached = cache.get("a && b").unwrap();
/// assert!(Arc::ptr_eq(&cached, &query));
/// ```
pub struct QueryCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl QueryCache {
    /// Creates a new query cache with the given configuration.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_capacity(config.max_entries, config.ttl)
    }

    /// Creates a cache with custom capacity and TTL. A capacity of zero is
    /// treated as one.
    pub fn with_capacity(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Gets a compiled query by key.
    ///
    /// Returns `None` if the key is missing or its entry has expired. On a
    /// hit the entry is promoted to most-recently-used.
    pub fn get(&self, key: &str) -> Option<Arc<HedQuery>> {
        let mut cache = self.inner.lock().ok()?;

        if let Some(entry) = cache.get(key) {
            if entry.is_expired(self.ttl) {
                cache.pop(key);
                return None;
            }
            return Some(Arc::clone(&entry.query));
        }

        None
    }

    /// Stores a compiled query, evicting the least recently used entry if
    /// the cache is full.
    pub fn set(&self, key: String, query: Arc<HedQuery>) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.put(key, CacheEntry::new(query));
        }
    }

    /// Checks if a key exists in the cache (without affecting LRU order).
    ///
    /// Note: This doesn't check for expiration.
    pub fn contains(&self, key: &str) -> bool {
        match self.inner.lock() {
            Ok(cache) => cache.contains(key),
            _ => false,
        }
    }

    /// Returns the number of entries, expired ones included.
    pub fn len(&self) -> usize {
        match self.inner.lock() {
            Ok(cache) => cache.len(),
            _ => 0,
        }
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all entries from the cache.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.clear();
        }
    }

    /// Removes expired entries from the cache.
    pub fn cleanup_expired(&self) {
        if let Ok(mut cache) = self.inner.lock() {
            let ttl = self.ttl;
            let expired_keys: Vec<String> = cache
                .iter()
                .filter(|(_, entry)| entry.is_expired(ttl))
                .map(|(key, _)| key.clone())
                .collect();

            for key in expired_keys {
                cache.pop(&key);
            }
        }
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        match self.inner.lock() {
            Ok(cache) => {
                let total = cache.len();
                let expired = cache
                    .iter()
                    .filter(|(_, entry)| entry.is_expired(self.ttl))
                    .count();

                CacheStats {
                    total_entries: total,
                    expired_entries: expired,
                    valid_entries: total.saturating_sub(expired),
                }
            }
            _ => CacheStats::default(),
        }
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("QueryCache")
            .field("entries", &stats.total_entries)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Statistics about the cache state.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Total number of entries in the cache.
    pub total_entries: usize,
    /// Number of expired entries (not yet cleaned up).
    pub expired_entries: usize,
    /// Number of valid (non-expired) entries.
    pub valid_entries: usize,
}

/// Normalizes query text into a cache key.
///
/// Queries are case-insensitive, and whitespace only separates tokens, so
/// runs of whitespace collapse to one space and the text is lowercased.
///
/// # Example
///
/// ```rust
/// use hed_query_executor::normalize_cache_key;
///
/// assert_eq!(normalize_cache_key("  Event   &&  Action "), "event && action");
/// ```
pub fn normalize_cache_key(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
