//! Route match memoization
//!
//! Every click evaluates the URL against the registered patterns, and every
//! dispatch parses it again per binding. [`MatchCache`] memoizes the outcome
//! of matching one pattern against one cleaned path, with LRU eviction.
//!
//! Entries never go stale: a compiled pattern always gives the same answer for
//! the same path, so there is no invalidation besides eviction.

use crate::trace_log;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;

/// Cache key: pattern source and cleaned path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    pattern: String,
    path: String,
}

/// Cache performance statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Memoized pattern matches with LRU eviction
///
/// Default capacity: 512 entries.
#[derive(Debug)]
pub struct MatchCache {
    entries: LruCache<MatchKey, Option<HashMap<String, String>>>,
    stats: CacheStats,
}

impl MatchCache {
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(512) {
        Some(cap) => cap,
        None => unreachable!(),
    };

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            stats: CacheStats::default(),
        }
    }

    /// Look up a memoized match
    ///
    /// The outer `Option` is the cache hit; the inner one is the match result.
    pub fn get(&mut self, pattern: &str, path: &str) -> Option<Option<HashMap<String, String>>> {
        let key = MatchKey {
            pattern: pattern.to_string(),
            path: path.to_string(),
        };

        if let Some(result) = self.entries.get(&key) {
            self.stats.hits += 1;
            trace_log!("match cache hit: '{}' against '{}'", path, pattern);
            Some(result.clone())
        } else {
            self.stats.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, pattern: &str, path: &str, result: Option<HashMap<String, String>>) {
        self.entries.push(
            MatchKey {
                pattern: pattern.to_string(),
                path: path.to_string(),
            },
            result,
        );
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for MatchCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_miss_then_hit() {
        let mut cache = MatchCache::new();
        assert!(cache.get("/a", "/a").is_none());
        assert_eq!(cache.stats().misses, 1);

        cache.insert("/a", "/a", Some(HashMap::new()));
        assert_eq!(cache.get("/a", "/a"), Some(Some(HashMap::new())));
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_negative_results_are_cached() {
        let mut cache = MatchCache::new();
        cache.insert("/a", "/b", None);
        assert_eq!(cache.get("/a", "/b"), Some(None));
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = MatchCache::with_capacity(NonZeroUsize::new(2).unwrap());
        cache.insert("/a", "/1", None);
        cache.insert("/a", "/2", None);
        cache.insert("/a", "/3", None);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("/a", "/1").is_none());
    }

    #[test]
    fn test_hit_rate_calculation() {
        let mut cache = MatchCache::new();
        cache.get("/a", "/x");
        cache.insert("/a", "/x", None);
        cache.get("/a", "/x");
        cache.get("/a", "/x");
        cache.get("/a", "/y");

        assert!((cache.stats().hit_rate() - 0.5).abs() < 0.001);
    }
}
