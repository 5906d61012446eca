//! # Search Result Cache
//!
//! LRU caching with TTL for search results, keyed by query + filters.
//! Used by the Indexing Pipeline's search contract (spec §4.2) and reused
//! as the Contemplation Engine's insight cache (spec §5).
//!
//! ## Design Decisions
//!
//! ### Domain-Based Invalidation
//!
//! The cache supports **selective invalidation by project scope**:
//! - `invalidate_domain(domain)`: clears only entries scoped to that domain.
//! - `invalidate_all()`: clears everything (use when the scope is unknown).
//!
//! Invalidation is lazy: entries are marked and filtered on access rather
//! than removed immediately, so `size()` (physical) and `effective_size()`
//! (logical) can diverge until the LRU naturally evicts them.
//!
//! ### Thread Safety
//!
//! Uses `Arc<RwLock<_>>` for concurrent reads; writers block readers
//! briefly but operations are cheap (hash lookup + clone of an `Arc`).
//!
//! ## Example
//!
//! ```
//! use noesis_core::retrieval::{QueryCache, CacheKey};
//!
//! let cache: QueryCache<Vec<String>> = QueryCache::new();
//! let key = CacheKey::new("implement authentication".to_string())
//!     .with_domain(Some("web-api".to_string()))
//!     .with_limit(5);
//!
//! assert!(cache.get(&key).is_none());
//! cache.put(key.clone(), vec!["result".to_string()]);
//! assert!(cache.get(&key).is_some());
//!
//! let metrics = cache.metrics();
//! assert!(metrics.hit_rate() > 0.0);
//! ```

pub mod lru;
pub mod tests;
pub mod types;

pub use lru::QueryCache;
pub use types::{CacheKey, CacheMetrics, DEFAULT_CACHE_TTL, DEFAULT_MAX_ENTRIES};
