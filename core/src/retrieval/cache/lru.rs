//! LRU cache with TTL and domain-scoped lazy invalidation for search results.

use crate::retrieval::cache::types::{
    CacheKey, CacheMetrics, CachedResult, DEFAULT_CACHE_TTL, DEFAULT_MAX_ENTRIES,
};
use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Generic query-result cache with LRU eviction and TTL.
///
/// Used by the Indexing Pipeline to cache hybrid-search results keyed by
/// query + filters, and reused by the Contemplation Engine for its
/// insight cache (spec §5's "most recent 1,000 insights, 1h TTL").
pub struct QueryCache<V> {
    cache: Arc<RwLock<LruCache<u64, CachedResult<V>>>>,
    domain_index: Arc<RwLock<HashMap<String, HashSet<u64>>>>,
    invalidated_hashes: Arc<RwLock<HashSet<u64>>>,
    metrics: Arc<RwLock<CacheMetrics>>,
    default_ttl: Duration,
    max_entries: usize,
}

impl<V> QueryCache<V> {
    /// Create a cache with default capacity (10,000) and TTL (60s).
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_MAX_ENTRIES, DEFAULT_CACHE_TTL)
    }

    /// Create a cache with custom capacity and TTL.
    #[must_use]
    pub fn with_capacity_and_ttl(capacity: usize, ttl: Duration) -> Self {
        let cache = LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN));
        let metrics = CacheMetrics {
            capacity,
            ..Default::default()
        };

        Self {
            cache: Arc::new(RwLock::new(cache)),
            domain_index: Arc::new(RwLock::new(HashMap::new())),
            invalidated_hashes: Arc::new(RwLock::new(HashSet::new())),
            metrics: Arc::new(RwLock::new(metrics)),
            default_ttl: ttl,
            max_entries: capacity,
        }
    }

    /// Look up a cached value, returning `None` on miss or expiration.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        let key_hash = key.compute_hash();

        {
            let invalidated = self
                .invalidated_hashes
                .read()
                .expect("QueryCache: invalidated_hashes lock poisoned");
            if invalidated.contains(&key_hash) {
                let mut metrics = self
                    .metrics
                    .write()
                    .expect("QueryCache: metrics lock poisoned");
                metrics.misses += 1;
                return None;
            }
        }

        let mut cache = self.cache.write().expect("QueryCache: cache lock poisoned");
        let mut metrics = self
            .metrics
            .write()
            .expect("QueryCache: metrics lock poisoned");

        if let Some(result) = cache.get(&key_hash) {
            if result.is_expired() {
                cache.pop(&key_hash);
                metrics.misses += 1;
                metrics.evictions += 1;
                metrics.size = cache.len();
                return None;
            }

            metrics.hits += 1;
            Some(result.value.clone())
        } else {
            metrics.misses += 1;
            metrics.size = cache.len();
            None
        }
    }

    /// Store a value under the given key, using the cache's default TTL.
    pub fn put(&self, key: CacheKey, value: V) {
        let key_hash = key.compute_hash();
        let cached_result = CachedResult {
            value: Arc::new(value),
            cached_at: std::time::Instant::now(),
            ttl: self.default_ttl,
        };

        let mut cache = self.cache.write().expect("QueryCache: cache lock poisoned");

        let was_present = cache.contains(&key_hash);
        cache.put(key_hash, cached_result);

        if let Some(ref domain) = key.domain {
            let mut domain_index = self
                .domain_index
                .write()
                .expect("QueryCache: domain_index lock poisoned");
            domain_index
                .entry(domain.to_string())
                .or_default()
                .insert(key_hash);
        }

        let mut metrics = self
            .metrics
            .write()
            .expect("QueryCache: metrics lock poisoned");
        metrics.size = cache.len();

        if was_present {
            return;
        }

        if cache.len() > self.max_entries {
            metrics.evictions += 1;
        }
    }

    /// Invalidate every cached entry (use for cross-domain changes).
    pub fn invalidate_all(&self) {
        let mut cache = self.cache.write().expect("QueryCache: cache lock poisoned");
        let count = cache.len();
        cache.clear();

        let mut domain_index = self
            .domain_index
            .write()
            .expect("QueryCache: domain_index lock poisoned");
        domain_index.clear();

        let mut invalidated = self
            .invalidated_hashes
            .write()
            .expect("QueryCache: invalidated_hashes lock poisoned");
        invalidated.clear();

        let mut metrics = self
            .metrics
            .write()
            .expect("QueryCache: metrics lock poisoned");
        metrics.size = 0;
        metrics.invalidations += count as u64;
    }

    /// Invalidate entries scoped to one domain (project root), more
    /// efficient than `invalidate_all` when only that domain changed.
    pub fn invalidate_domain(&self, domain: &str) {
        let domain_index = self
            .domain_index
            .read()
            .expect("QueryCache: domain_index lock poisoned");

        if let Some(hashes) = domain_index.get(domain) {
            let count = hashes.len();

            let mut invalidated = self
                .invalidated_hashes
                .write()
                .expect("QueryCache: invalidated_hashes lock poisoned");
            for &hash in hashes {
                invalidated.insert(hash);
            }
            drop(invalidated);

            let mut domain_index = self
                .domain_index
                .write()
                .expect("QueryCache: domain_index lock poisoned");
            domain_index.remove(domain);

            let mut metrics = self
                .metrics
                .write()
                .expect("QueryCache: metrics lock poisoned");
            metrics.invalidations += count as u64;
        }
    }

    /// Current metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> CacheMetrics {
        self.metrics
            .read()
            .expect("QueryCache: metrics lock poisoned")
            .clone()
    }

    /// Reset metrics counters (keeps cache contents).
    pub fn clear_metrics(&self) {
        let mut metrics = self
            .metrics
            .write()
            .expect("QueryCache: metrics lock poisoned");
        *metrics = CacheMetrics {
            capacity: self.max_entries,
            ..Default::default()
        };
    }

    /// Physical entry count, including lazily-invalidated entries.
    #[must_use]
    pub fn size(&self) -> usize {
        self.cache
            .read()
            .expect("QueryCache: cache lock poisoned")
            .len()
    }

    /// Logical entry count, excluding lazily-invalidated entries.
    #[must_use]
    pub fn effective_size(&self) -> usize {
        let cache_size = self
            .cache
            .read()
            .expect("QueryCache: cache lock poisoned")
            .len();
        let invalidated_size = self
            .invalidated_hashes
            .read()
            .expect("QueryCache: invalidated_hashes lock poisoned")
            .len();
        cache_size.saturating_sub(invalidated_size)
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache
            .read()
            .expect("QueryCache: cache lock poisoned")
            .is_empty()
    }
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
