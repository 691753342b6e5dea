//! Per-engine result cache keyed by normalized query and options.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use docsearch_core::error::{Error, Result};
use docsearch_core::types::{CacheStats, SearchFilters, SearchMetadata, SearchMode, SearchOptions, SearchResult, SortBy};

pub fn now_ms() -> i64 { chrono::Utc::now().timestamp_millis() }

#[derive(Serialize)]
struct KeyParts<'a> {
    query: &'a str,
    filters: &'a SearchFilters,
    mode: SearchMode,
    sort_by: SortBy,
    highlight: bool,
}

/// Deterministic key; filter sets serialize sorted.
pub fn cache_key(query: &str, options: &SearchOptions) -> Result<String> {
    let parts = KeyParts {
        query,
        filters: &options.filters,
        mode: options.mode,
        sort_by: options.sort_by,
        highlight: options.enable_highlight,
    };
    serde_json::to_string(&parts).map_err(|e| Error::Cache(e.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct CachedSearch {
    pub results: Vec<SearchResult>,
    pub metadata: SearchMetadata,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedSearch,
    /// Corpus the results were computed against.
    generation: u64,
    timestamp_ms: i64,
}

#[derive(Debug)]
pub struct SearchCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    expiry_ms: i64,
}

impl SearchCache {
    pub fn new(expiry_ms: i64) -> Self { Self { entries: Mutex::new(HashMap::new()), expiry_ms } }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, CacheEntry>>> {
        self.entries.lock().map_err(|_| Error::Cache("cache lock poisoned".into()))
    }

    fn is_fresh(&self, entry: &CacheEntry, now_ms: i64) -> bool { now_ms - entry.timestamp_ms < self.expiry_ms }

    /// Expired entries and entries from another corpus generation are
    /// misses; they stay until overwritten or purged.
    pub fn get(&self, key: &str, generation: u64, now_ms: i64) -> Result<Option<CachedSearch>> {
        let entries = self.lock()?;
        Ok(entries
            .get(key)
            .filter(|e| e.generation == generation && self.is_fresh(e, now_ms))
            .map(|e| e.value.clone()))
    }

    /// Last write wins, except that results from an older generation never
    /// replace newer ones.
    pub fn insert(&self, key: String, value: CachedSearch, generation: u64, now_ms: i64) -> Result<()> {
        let mut entries = self.lock()?;
        if entries.get(&key).is_some_and(|e| e.generation > generation) {
            return Ok(());
        }
        entries.insert(key, CacheEntry { value, generation, timestamp_ms: now_ms });
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize> { Ok(self.lock()?.len()) }

    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.lock()?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(CacheStats { size: keys.len(), entries: keys })
    }

    /// Returns how many entries were removed.
    pub fn purge_expired(&self, now_ms: i64) -> Result<usize> {
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, e| now_ms - e.timestamp_ms < self.expiry_ms);
        Ok(before - entries.len())
    }

    #[cfg(test)]
    pub(crate) fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.entries.lock();
            panic!("poisoning search cache");
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(query: &str) -> CachedSearch {
        CachedSearch {
            results: vec![],
            metadata: SearchMetadata {
                search_time_ms: 1.0,
                total_results: 0,
                semantic_result_count: 0,
                keyword_result_count: 0,
                query: query.into(),
                mode: SearchMode::Hybrid,
                filters: SearchFilters::default(),
            },
        }
    }

    #[test]
    fn ttl_boundary_is_exclusive() {
        let cache = SearchCache::new(100);
        cache.insert("k".into(), cached("q"), 1, 1_000).unwrap();
        assert!(cache.get("k", 1, 1_099).unwrap().is_some());
        assert!(cache.get("k", 1, 1_100).unwrap().is_none());
        assert_eq!(cache.len().unwrap(), 1, "expired entries are not removed by reads");
        cache.insert("k".into(), cached("q2"), 1, 1_100).unwrap();
        assert_eq!(cache.get("k", 1, 1_150).unwrap().unwrap().metadata.query, "q2");
    }

    #[test]
    fn purge_and_stats() {
        let cache = SearchCache::new(100);
        cache.insert("b".into(), cached("b"), 1, 0).unwrap();
        cache.insert("a".into(), cached("a"), 1, 50).unwrap();
        assert_eq!(cache.stats().unwrap().entries, vec!["a", "b"]);
        assert_eq!(cache.purge_expired(120).unwrap(), 1);
        assert_eq!(cache.stats().unwrap(), CacheStats { size: 1, entries: vec!["a".into()] });
        cache.clear().unwrap();
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn entries_are_bound_to_their_corpus_generation() {
        let cache = SearchCache::new(1_000);
        cache.insert("k".into(), cached("new"), 2, 0).unwrap();
        assert!(cache.get("k", 1, 10).unwrap().is_none());
        cache.insert("k".into(), cached("old"), 1, 10).unwrap();
        assert_eq!(cache.get("k", 2, 20).unwrap().unwrap().metadata.query, "new");
        assert!(cache.get("k", 3, 20).unwrap().is_none());
    }

    #[test]
    fn poisoned_lock_surfaces_as_cache_error() {
        let cache = SearchCache::new(1_000);
        cache.poison();
        assert!(matches!(cache.get("k", 1, 0), Err(Error::Cache(_))));
        assert!(matches!(cache.insert("k".into(), cached("q"), 1, 0), Err(Error::Cache(_))));
    }

    #[test]
    fn key_is_order_independent_and_option_sensitive() {
        let a = SearchOptions::default().with_filters(SearchFilters::default().with_tags(["x", "y"]));
        let b = SearchOptions::default().with_filters(SearchFilters::default().with_tags(["y", "x"]));
        assert_eq!(cache_key("q", &a).unwrap(), cache_key("q", &b).unwrap());
        let keyword = a.clone().with_mode(SearchMode::Keyword);
        assert_ne!(cache_key("q", &a).unwrap(), cache_key("q", &keyword).unwrap());
        assert_ne!(cache_key("q", &a).unwrap(), cache_key("q2", &a).unwrap());
    }
}
