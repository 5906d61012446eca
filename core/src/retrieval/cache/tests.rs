//! Tests for the search-result query cache.

#[cfg(test)]
mod cache_tests {
    use crate::retrieval::cache::lru::QueryCache;
    use crate::retrieval::cache::types::{CacheKey, DEFAULT_CACHE_TTL};
    use std::time::Duration;

    #[test]
    fn test_cache_hit() {
        let cache: QueryCache<Vec<String>> = QueryCache::new();
        let key = CacheKey::new("test query".to_string());
        let results = vec!["hit1".to_string()];

        assert!(cache.get(&key).is_none());

        cache.put(key.clone(), results);

        let result = cache.get(&key);
        assert!(result.is_some());
        assert_eq!(result.unwrap().len(), 1);

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hit_rate(), 0.5);
    }

    #[test]
    fn test_cache_expiration() {
        let cache: QueryCache<Vec<String>> =
            QueryCache::with_capacity_and_ttl(100, Duration::from_millis(10));
        let key = CacheKey::new("test query".to_string());

        cache.put(key.clone(), vec!["r".to_string()]);
        assert!(cache.get(&key).is_some());

        std::thread::sleep(Duration::from_millis(15));

        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn test_cache_invalidation() {
        let cache: QueryCache<Vec<String>> = QueryCache::new();
        let key1 = CacheKey::new("query1".to_string());
        let key2 = CacheKey::new("query2".to_string());

        cache.put(key1.clone(), vec!["r1".to_string()]);
        cache.put(key2.clone(), vec!["r2".to_string()]);

        assert_eq!(cache.size(), 2);

        cache.invalidate_all();

        assert_eq!(cache.size(), 0);
        assert!(cache.get(&key1).is_none());
        assert!(cache.get(&key2).is_none());

        let metrics = cache.metrics();
        assert_eq!(metrics.invalidations, 2);
    }

    #[test]
    fn test_lru_eviction() {
        let cache: QueryCache<Vec<String>> = QueryCache::with_capacity_and_ttl(2, DEFAULT_CACHE_TTL);

        let key1 = CacheKey::new("query1".to_string());
        let key2 = CacheKey::new("query2".to_string());
        let key3 = CacheKey::new("query3".to_string());

        cache.put(key1.clone(), vec!["r1".to_string()]);
        cache.put(key2.clone(), vec!["r2".to_string()]);

        assert_eq!(cache.size(), 2);

        cache.put(key3.clone(), vec!["r3".to_string()]);

        assert_eq!(cache.size(), 2);
        assert!(cache.get(&key1).is_none());
        assert!(cache.get(&key2).is_some());
        assert!(cache.get(&key3).is_some());

        let metrics = cache.metrics();
        assert_eq!(metrics.evictions, 1);
    }

    #[test]
    fn test_cache_key_with_filters() {
        let key1 = CacheKey::new("test".to_string())
            .with_domain(Some("web".to_string()))
            .with_kind(Some("code".to_string()))
            .with_limit(5);

        let key2 = CacheKey::new("test".to_string())
            .with_domain(Some("web".to_string()))
            .with_kind(Some("code".to_string()))
            .with_limit(5);

        let key3 = CacheKey::new("test".to_string())
            .with_domain(Some("data".to_string()))
            .with_kind(Some("code".to_string()))
            .with_limit(5);

        assert_eq!(key1.compute_hash(), key2.compute_hash());
        assert_ne!(key1.compute_hash(), key3.compute_hash());
    }

    #[test]
    fn test_metrics_effectiveness() {
        let cache: QueryCache<Vec<String>> = QueryCache::new();
        let key = CacheKey::new("test".to_string());

        cache.put(key.clone(), vec!["r".to_string()]);

        for _ in 0..10 {
            let _ = cache.get(&key);
        }

        let metrics = cache.metrics();
        assert!(metrics.is_effective());
        assert!(metrics.hit_rate() > 0.9);
    }

    #[test]
    fn test_domain_based_invalidation() {
        let cache: QueryCache<Vec<String>> = QueryCache::new();

        let key_web = CacheKey::new("query1".to_string()).with_domain(Some("web-api".to_string()));
        let key_data =
            CacheKey::new("query2".to_string()).with_domain(Some("data-processing".to_string()));
        let key_no_domain = CacheKey::new("query3".to_string());

        cache.put(key_web.clone(), vec!["r1".to_string()]);
        cache.put(key_data.clone(), vec!["r2".to_string()]);
        cache.put(key_no_domain.clone(), vec!["r3".to_string()]);

        assert_eq!(cache.size(), 3);

        cache.invalidate_domain("web-api");

        assert!(cache.get(&key_web).is_none());
        assert!(cache.get(&key_data).is_some());
        assert!(cache.get(&key_no_domain).is_some());

        assert_eq!(cache.size(), 3);
        assert_eq!(cache.effective_size(), 2);

        let metrics = cache.metrics();
        assert_eq!(metrics.invalidations, 1);
    }

    #[test]
    fn test_domain_invalidation_multiple_entries() {
        let cache: QueryCache<Vec<String>> = QueryCache::new();

        let key1 = CacheKey::new("query1".to_string()).with_domain(Some("web-api".to_string()));
        let key2 = CacheKey::new("query2".to_string()).with_domain(Some("web-api".to_string()));
        let key3 = CacheKey::new("query3".to_string()).with_domain(Some("data".to_string()));

        cache.put(key1.clone(), vec!["r1".to_string()]);
        cache.put(key2.clone(), vec!["r2".to_string()]);
        cache.put(key3.clone(), vec!["r3".to_string()]);

        assert_eq!(cache.size(), 3);

        cache.invalidate_domain("web-api");

        assert!(cache.get(&key1).is_none());
        assert!(cache.get(&key2).is_none());
        assert!(cache.get(&key3).is_some());

        assert_eq!(cache.size(), 3);
        assert_eq!(cache.effective_size(), 1);

        let metrics = cache.metrics();
        assert_eq!(metrics.invalidations, 2);
    }

    #[test]
    fn test_domain_invalidation_nonexistent() {
        let cache: QueryCache<Vec<String>> = QueryCache::new();

        let key = CacheKey::new("query".to_string()).with_domain(Some("web-api".to_string()));

        cache.put(key.clone(), vec!["r".to_string()]);

        cache.invalidate_domain("nonexistent-domain");

        assert!(cache.get(&key).is_some());
        assert_eq!(cache.size(), 1);

        let metrics = cache.metrics();
        assert_eq!(metrics.invalidations, 0);
    }

    #[test]
    fn test_domain_invalidation_empty_cache() {
        let cache: QueryCache<Vec<String>> = QueryCache::new();

        cache.invalidate_domain("any-domain");

        assert_eq!(cache.size(), 0);
        let metrics = cache.metrics();
        assert_eq!(metrics.invalidations, 0);
    }

    #[test]
    fn test_invalidate_all_clears_domain_index() {
        let cache: QueryCache<Vec<String>> = QueryCache::new();

        let key_web = CacheKey::new("query1".to_string()).with_domain(Some("web-api".to_string()));
        let key_data = CacheKey::new("query2".to_string()).with_domain(Some("data".to_string()));

        cache.put(key_web.clone(), vec!["r1".to_string()]);
        cache.put(key_data.clone(), vec!["r2".to_string()]);

        assert_eq!(cache.size(), 2);

        cache.invalidate_all();

        assert_eq!(cache.size(), 0);

        cache.put(key_web.clone(), vec!["r3".to_string()]);
        assert_eq!(cache.size(), 1);

        cache.invalidate_domain("web-api");

        assert_eq!(cache.size(), 1);
        assert_eq!(cache.effective_size(), 0);
        assert!(cache.get(&key_web).is_none());
    }
}
