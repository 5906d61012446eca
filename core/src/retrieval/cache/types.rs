//! Types for the search-result query cache: key shape, TTL wrapper, metrics.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default cache TTL (60 seconds).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default maximum cache entries (10,000 queries).
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Cache key combining a search query and its filters, per spec §4.2's
/// search contract (`query`, `kinds`, `project_root`, `time range`, `limit`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Raw query text.
    pub query: String,
    /// Project/domain scope filter (e.g. a `project_root`), if any.
    pub domain: Option<Arc<str>>,
    /// Content-kind filter (code, conversation, fact, pattern, insight), if any.
    pub kind: Option<String>,
    /// Time range start (unix timestamp, optional).
    pub time_start: Option<i64>,
    /// Time range end (unix timestamp, optional).
    pub time_end: Option<i64>,
    /// Maximum results to return.
    pub limit: usize,
}

impl CacheKey {
    /// Create a new cache key for the given query text.
    #[must_use]
    pub fn new(query: String) -> Self {
        Self {
            query,
            domain: None,
            kind: None,
            time_start: None,
            time_end: None,
            limit: 10,
        }
    }

    /// Set the domain/project scope filter.
    #[must_use]
    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain.map(|s| Arc::from(s.as_str()));
        self
    }

    /// Set the content-kind filter.
    #[must_use]
    pub fn with_kind(mut self, kind: Option<String>) -> Self {
        self.kind = kind;
        self
    }

    /// Set the time range filter.
    #[must_use]
    pub fn with_time_range(mut self, start: Option<i64>, end: Option<i64>) -> Self {
        self.time_start = start;
        self.time_end = end;
        self
    }

    /// Set the result limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Compute a stable hash for this key, used as the LRU storage key.
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        Hash::hash(self, &mut hasher);
        hasher.finish()
    }
}

/// A cached value with its expiration time.
#[derive(Debug, Clone)]
pub struct CachedResult<V> {
    /// The cached value (wrapped in `Arc` for cheap clones on hit).
    pub value: Arc<V>,
    /// Time when this entry was cached.
    pub cached_at: Instant,
    /// Time-to-live for this entry.
    pub ttl: Duration,
}

impl<V> CachedResult<V> {
    pub(crate) fn is_expired(&self) -> bool {
        self.cached_at.elapsed() >= self.ttl
    }
}

/// Cache metrics for monitoring hit rate and eviction pressure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheMetrics {
    /// Total cache hits.
    pub hits: u64,
    /// Total cache misses.
    pub misses: u64,
    /// Total cache evictions.
    pub evictions: u64,
    /// Total cache invalidations.
    pub invalidations: u64,
    /// Current cache size (number of entries).
    pub size: usize,
    /// Maximum cache capacity.
    pub capacity: usize,
}

impl CacheMetrics {
    /// Hit rate in `[0.0, 1.0]`.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Whether the cache is performing well (hit rate >= 40%).
    #[must_use]
    pub fn is_effective(&self) -> bool {
        self.hit_rate() >= 0.4
    }
}
