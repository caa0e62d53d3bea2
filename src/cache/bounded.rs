//! Bounded Cache Module
//!
//! Cache engine combining HashMap storage with LRU tracking and TTL expiration.
//! Capacity and TTL are fixed at construction and apply to every entry.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};
use crate::error::{MemoError, Result};

// == Bounded Cache ==
/// Fixed-capacity cache with LRU eviction and a uniform TTL.
///
/// `entries` and the recency order always hold exactly the same key set.
/// The type is not synchronized; callers sharing it across threads wrap it in
/// a mutex (see [`crate::memo::MemoizationManager`]).
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    /// Label used in errors and logs, usually the operation identifier
    name: String,
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Lifetime given to every inserted entry
    ttl: Duration,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of entries, must be positive
    /// * `ttl` - Lifetime of every entry, must be positive
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        Self::named("cache", capacity, ttl)
    }

    /// Creates an empty cache labelled `name` in errors and logs.
    ///
    /// # Arguments
    /// * `name` - Label for errors and log events
    /// * `capacity` - Maximum number of entries, must be positive
    /// * `ttl` - Lifetime of every entry, must be positive
    pub fn named(name: impl Into<String>, capacity: usize, ttl: Duration) -> Result<Self> {
        let name = name.into();

        // Validate configuration
        if capacity == 0 {
            return Err(MemoError::configuration(name, "max_size must be positive"));
        }
        if ttl.is_zero() {
            return Err(MemoError::configuration(name, "ttl must be positive"));
        }

        Ok(Self {
            name,
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            capacity,
            ttl,
        })
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed on access and reported as absent. A hit
    /// marks the key most recently used.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    ///
    /// # Returns
    /// The stored value, or None if missing or expired
    pub fn get(&mut self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&mut self, key: &K, now: Instant) -> Option<V> {
        // Check if key exists and is expired
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        // Remove expired entry
        if expired {
            self.entries.remove(key);
            self.lru.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            debug!(cache = %self.name, "dropped expired entry on access");
            return None;
        }

        // Update LRU tracker and record hit
        self.lru.touch(key);
        self.stats.record_hit();
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Set ==
    /// Stores a value, returning it unchanged.
    ///
    /// An existing entry for the key is replaced and its TTL restarts. If the
    /// cache is full the least recently used entry is evicted first. If that
    /// eviction fails the cache is left untouched.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    pub fn set(&mut self, key: K, value: V) -> Result<V> {
        self.set_at(key, value, Instant::now())
    }

    pub(crate) fn set_at(&mut self, key: K, value: V, now: Instant) -> Result<V> {
        // Refreshing an existing key never needs room
        let is_refresh = self.entries.contains_key(&key);

        // Evict LRU entry if at capacity
        if !is_refresh && self.entries.len() >= self.capacity {
            self.evict_oldest()?;
        }

        // Insert or replace the entry, restarting its TTL
        self.entries
            .insert(key.clone(), CacheEntry::new(value.clone(), self.ttl, now));

        // Update LRU tracker
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());

        Ok(value)
    }

    // == Evict Oldest ==
    fn evict_oldest(&mut self) -> Result<()> {
        let Some(oldest) = self.lru.evict_oldest() else {
            return Err(MemoError::cache_operation(
                &self.name,
                format!(
                    "recency order is empty while {} entries are stored",
                    self.entries.len()
                ),
            ));
        };

        if self.entries.remove(&oldest).is_none() {
            return Err(MemoError::cache_operation(
                &self.name,
                "recency order named a key with no stored entry",
            ));
        }

        self.stats.record_eviction();
        debug!(cache = %self.name, capacity = self.capacity, "evicted least recently used entry");
        Ok(())
    }

    // == Delete ==
    /// Removes an entry by key.
    ///
    /// # Arguments
    /// * `key` - The key to remove
    ///
    /// # Returns
    /// Whether an entry was present
    pub fn delete(&mut self, key: &K) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
            true
        } else {
            false
        }
    }

    // == Cleanup ==
    /// Removes every expired entry regardless of recency.
    ///
    /// Returns the number of entries removed. Fails without removing anything
    /// if storage and recency order have diverged.
    pub fn cleanup(&mut self) -> Result<usize> {
        self.cleanup_at(Instant::now())
    }

    pub(crate) fn cleanup_at(&mut self, now: Instant) -> Result<usize> {
        self.check_invariants()?;

        // Collect expired keys
        let expired_keys: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        // Remove expired entries
        for key in expired_keys {
            self.entries.remove(&key);
            self.lru.remove(&key);
        }

        self.stats.record_expirations(count);
        self.stats.set_total_entries(self.entries.len());
        Ok(count)
    }

    // == Invariants ==
    /// Verifies that storage and recency order hold the same key set.
    pub fn check_invariants(&self) -> Result<()> {
        if self.lru.len() != self.entries.len() {
            return Err(MemoError::cache_operation(
                &self.name,
                format!(
                    "recency order tracks {} keys but {} entries are stored",
                    self.lru.len(),
                    self.entries.len()
                ),
            ));
        }
        if self.lru.iter().any(|key| !self.entries.contains_key(key)) {
            return Err(MemoError::cache_operation(
                &self.name,
                "recency order names a key with no stored entry",
            ));
        }
        Ok(())
    }

    // == Contains Key ==
    /// Membership test ignoring TTL.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys ordered from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.lru.iter().cloned().collect()
    }

    /// Drops every entry, keeping counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn lru_mut(&mut self) -> &mut LruTracker<K> {
        &mut self.lru
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn cache(capacity: usize) -> BoundedCache<&'static str, i32> {
        BoundedCache::new(capacity, secs(300)).unwrap()
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        let result = BoundedCache::<String, i32>::named("fetch", 0, secs(10));
        assert!(matches!(
            result,
            Err(MemoError::Configuration { ref operation, .. }) if operation == "fetch"
        ));
    }

    #[test]
    fn test_new_rejects_zero_ttl() {
        let result = BoundedCache::<String, i32>::new(10, Duration::ZERO);
        assert!(matches!(result, Err(MemoError::Configuration { .. })));
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = cache(100);

        assert_eq!(cache.set("key1", 1).unwrap(), 1);
        assert_eq!(cache.get(&"key1"), Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let mut cache = cache(100);
        assert_eq!(cache.get(&"missing"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_overwrite_refreshes_instead_of_duplicating() {
        let mut cache = cache(100);

        cache.set("key1", 1).unwrap();
        cache.set("key1", 2).unwrap();

        assert_eq!(cache.get(&"key1"), Some(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.keys_by_recency(), vec!["key1"]);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let mut cache = cache(2);

        cache.set("a", 1).unwrap();
        cache.set("b", 2).unwrap();
        cache.set("a", 3).unwrap();

        assert!(cache.contains_key(&"a"));
        assert!(cache.contains_key(&"b"));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = cache(3);

        cache.set("k1", 1).unwrap();
        cache.set("k2", 2).unwrap();
        cache.set("k3", 3).unwrap();
        cache.set("k4", 4).unwrap();

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&"k1"), None);
        assert_eq!(cache.get(&"k2"), Some(2));
        assert_eq!(cache.get(&"k3"), Some(3));
        assert_eq!(cache.get(&"k4"), Some(4));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_lru_touch_on_get_changes_victim() {
        let mut cache = cache(3);

        cache.set("k1", 1).unwrap();
        cache.set("k2", 2).unwrap();
        cache.set("k3", 3).unwrap();
        cache.get(&"k1");
        cache.set("k4", 4).unwrap();

        assert!(!cache.contains_key(&"k2"));
        assert!(cache.contains_key(&"k1"));
        assert!(cache.contains_key(&"k3"));
        assert!(cache.contains_key(&"k4"));
    }

    #[test]
    fn test_capacity_one_keeps_latest() {
        let mut cache = cache(1);

        cache.set("a", 1).unwrap();
        cache.set("b", 2).unwrap();

        assert_eq!(cache.keys_by_recency(), vec!["b"]);
        assert_eq!(cache.get(&"a"), None);
    }

    #[test]
    fn test_stored_null_is_distinct_from_absent() {
        let mut cache: BoundedCache<&str, Value> = BoundedCache::new(10, secs(60)).unwrap();

        assert_eq!(cache.set("nil", Value::Null).unwrap(), Value::Null);

        assert_eq!(cache.get(&"nil"), Some(Value::Null));
        assert_eq!(cache.get(&"never"), None);
        assert!(cache.contains_key(&"nil"));
    }

    #[test]
    fn test_stored_none_is_distinct_from_absent() {
        let mut cache: BoundedCache<u8, Option<u8>> = BoundedCache::new(10, secs(60)).unwrap();

        cache.set(1, None).unwrap();

        assert_eq!(cache.get(&1), Some(None));
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn test_lazy_expiry() {
        let mut cache: BoundedCache<&str, Value> = BoundedCache::new(10, secs(10)).unwrap();
        let start = Instant::now();

        cache.set_at("k", json!("v"), start).unwrap();

        assert_eq!(cache.get_at(&"k", start + secs(5)), Some(json!("v")));
        assert_eq!(cache.get_at(&"k", start + secs(11)), None);
        assert!(!cache.contains_key(&"k"));
        assert!(cache.keys_by_recency().is_empty());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_set_restarts_ttl() {
        let mut cache: BoundedCache<&str, i32> = BoundedCache::new(10, secs(10)).unwrap();
        let start = Instant::now();

        cache.set_at("k", 1, start).unwrap();
        cache.set_at("k", 2, start + secs(8)).unwrap();

        assert_eq!(cache.get_at(&"k", start + secs(15)), Some(2));
    }

    #[test]
    fn test_cleanup_removes_all_expired() {
        let mut cache: BoundedCache<&str, i32> = BoundedCache::new(10, secs(10)).unwrap();
        let start = Instant::now();

        cache.set_at("a", 1, start).unwrap();
        cache.set_at("b", 2, start).unwrap();
        cache.set_at("c", 3, start).unwrap();

        assert_eq!(cache.cleanup_at(start + secs(11)).unwrap(), 3);
        assert!(cache.is_empty());
        assert!(cache.keys_by_recency().is_empty());
    }

    #[test]
    fn test_cleanup_ignores_recency_and_keeps_live_entries() {
        let mut cache: BoundedCache<&str, i32> = BoundedCache::new(10, secs(10)).unwrap();
        let start = Instant::now();

        cache.set_at("old", 1, start).unwrap();
        cache.set_at("young", 2, start + secs(5)).unwrap();
        // Most recently used, but expired
        cache.get_at(&"old", start + secs(6));

        assert_eq!(cache.cleanup_at(start + secs(12)).unwrap(), 1);
        assert_eq!(cache.keys_by_recency(), vec!["young"]);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut cache = cache(10);
        cache.set("a", 1).unwrap();

        assert_eq!(cache.cleanup().unwrap(), 0);
        assert_eq!(cache.cleanup().unwrap(), 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cleanup_reports_divergence() {
        let mut cache = cache(10);
        cache.set("a", 1).unwrap();
        cache.lru_mut().remove(&"a");

        let result = cache.cleanup();
        assert!(matches!(result, Err(MemoError::CacheOperation { .. })));
    }

    #[test]
    fn test_set_reports_empty_recency_order_at_capacity() {
        let mut cache = cache(1);
        cache.set("a", 1).unwrap();
        cache.lru_mut().clear();

        let result = cache.set("b", 2);
        assert!(matches!(result, Err(MemoError::CacheOperation { .. })));

        // The failed insert leaves existing entries alone
        assert!(cache.contains_key(&"a"));
        assert!(!cache.contains_key(&"b"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_refresh_at_capacity_skips_eviction() {
        let mut cache = cache(1);
        cache.set("a", 1).unwrap();
        cache.lru_mut().clear();

        assert_eq!(cache.set("a", 2).unwrap(), 2);
        assert_eq!(cache.get(&"a"), Some(2));
        assert_eq!(cache.stats().evictions, 0);
        assert!(cache.check_invariants().is_ok());
    }

    #[test]
    fn test_delete() {
        let mut cache = cache(10);

        cache.set("key1", 1).unwrap();
        assert!(cache.delete(&"key1"));
        assert!(!cache.delete(&"key1"));

        assert!(cache.is_empty());
        assert!(cache.check_invariants().is_ok());
    }

    #[test]
    fn test_recency_order_most_recent_first() {
        let mut cache = cache(10);

        cache.set("a", 1).unwrap();
        cache.set("b", 2).unwrap();
        cache.set("c", 3).unwrap();
        cache.get(&"a");

        assert_eq!(cache.keys_by_recency(), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_stats() {
        let mut cache = cache(10);

        cache.set("key1", 1).unwrap();
        cache.get(&"key1");
        cache.get(&"missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_clear() {
        let mut cache = cache(10);
        cache.set("a", 1).unwrap();
        cache.set("b", 2).unwrap();

        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.check_invariants().is_ok());
    }
}
