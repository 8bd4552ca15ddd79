//! Bounded cache of parsed expressions.
//!
//! Entries expire after a fixed time-to-live; once the cache is full the
//! least recently used entry makes room for the new one.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::expression::ParsedExpression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            capacity: 500,
            ttl: Duration::from_secs(60),
        }
    }
}

struct CacheEntry {
    value: Arc<ParsedExpression>,
    inserted: Instant,
}

/// Entries plus their recency order, least recently used first.
#[derive(Default)]
struct LruState {
    map: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl LruState {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|existing| existing == key) {
            self.order.remove(pos);
        }
        self.order.push_back(key.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.map.remove(key);
        if let Some(pos) = self.order.iter().position(|existing| existing == key) {
            self.order.remove(pos);
        }
    }

    fn purge_expired(&mut self, ttl: Duration) -> usize {
        let expired: Vec<String> = self
            .map
            .iter()
            .filter(|(_, entry)| entry.inserted.elapsed() >= ttl)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    fn evict_if_needed(&mut self, limit: usize) {
        while self.map.len() > limit {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            debug!(key = %oldest, "evicting least recently used expression");
            self.map.remove(&oldest);
        }
    }
}

pub struct ExpressionCache {
    config: CacheConfig,
    state: Mutex<LruState>,
}

impl ExpressionCache {
    pub fn new(config: CacheConfig) -> Self {
        ExpressionCache {
            config,
            state: Mutex::new(LruState::default()),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    // a panic while holding the lock cannot leave the map half-updated
    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the entry for `key` unless it is missing or expired.
    pub fn get(&self, key: &str) -> Option<Arc<ParsedExpression>> {
        let mut state = self.lock();
        let entry = state.map.get(key)?;
        if entry.inserted.elapsed() >= self.config.ttl {
            debug!(key, "expression cache entry expired");
            state.remove(key);
            return None;
        }
        let value = Arc::clone(&entry.value);
        state.touch(key);
        Some(value)
    }

    pub fn insert(&self, key: impl Into<String>, value: Arc<ParsedExpression>) {
        if self.config.capacity == 0 {
            return;
        }
        let key = key.into();
        let mut state = self.lock();

        let is_new = !state.map.contains_key(&key);
        if is_new && state.map.len() >= self.config.capacity {
            let purged = state.purge_expired(self.config.ttl);
            if purged > 0 {
                debug!(purged, "purged expired expressions");
            }
        }

        state.map.insert(
            key.clone(),
            CacheEntry {
                value,
                inserted: Instant::now(),
            },
        );
        state.touch(&key);
        state.evict_if_needed(self.config.capacity);
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.map.clear();
        state.order.clear();
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        ExpressionCache::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    fn parsed(source: &str) -> Arc<ParsedExpression> {
        Arc::new(ParsedExpression::new(source, Node::constant(source)))
    }

    #[test]
    fn test_get_returns_same_instance() {
        let cache = ExpressionCache::default();
        let entry = parsed("a");
        cache.insert("a", Arc::clone(&entry));
        let hit = cache.get("a").unwrap();
        assert!(Arc::ptr_eq(&entry, &hit));
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ExpressionCache::new(CacheConfig {
            capacity: 2,
            ttl: Duration::from_secs(60),
        });
        cache.insert("a", parsed("a"));
        cache.insert("b", parsed("b"));
        // touch "a" so "b" becomes the oldest
        cache.get("a");
        cache.insert("c", parsed("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = ExpressionCache::new(CacheConfig {
            capacity: 10,
            ttl: Duration::from_millis(1),
        });
        cache.insert("a", parsed("a"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = ExpressionCache::new(CacheConfig {
            capacity: 0,
            ttl: Duration::from_secs(60),
        });
        cache.insert("a", parsed("a"));
        assert!(cache.is_empty());
    }
}
