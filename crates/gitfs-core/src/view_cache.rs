//! Bounded LRU cache mapping a route's matched prefix to the view instance
//! that should handle it, so `Router::get_view` doesn't re-run the full
//! regex scan on every FUSE call for a hot path.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::Mutex;

/// Default capacity, matching the original router's LRU size.
pub const DEFAULT_CAPACITY: usize = 40_000;

/// Thread-safe LRU cache from a matched route prefix to its view.
pub struct ViewCache<V> {
    inner: Mutex<LruCache<String, Arc<V>>>,
}

impl<V> ViewCache<V> {
    /// Build a cache with the given capacity (falls back to 1 if `capacity` is 0).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up `key`, promoting it to most-recently-used on a hit.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.inner.lock().get(key).cloned()
    }

    /// Insert or replace the view for `key`.
    pub fn put(&self, key: String, view: Arc<V>) {
        self.inner.lock().put(key, view);
    }

    /// Number of entries currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl<V> Default for ViewCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_roundtrips() {
        let cache: ViewCache<&'static str> = ViewCache::new(2);
        cache.put("/current".into(), Arc::new("current-view"));
        assert_eq!(cache.get("/current").map(|v| *v), Some("current-view"));
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache: ViewCache<u32> = ViewCache::new(1);
        cache.put("a".into(), Arc::new(1));
        cache.put("b".into(), Arc::new(2));
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b").map(|v| *v), Some(2));
    }
}
