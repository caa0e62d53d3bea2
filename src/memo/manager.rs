//! Memoization Manager Module
//!
//! Per-owner side table mapping operation identifiers to bounded caches.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{BoundedCache, CacheStats};
use crate::error::{MemoError, Result};
use crate::memo::key::{self, Callback, CacheKey, OwnerId};

/// A cache shared between the manager and in-flight calls.
pub type SharedCache<V> = Arc<Mutex<BoundedCache<CacheKey, V>>>;

// == Cleanup Outcome ==
/// Result of sweeping one operation cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CleanupOutcome {
    Cleaned { removed: usize },
    Failed { reason: String },
}

impl CleanupOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CleanupOutcome::Cleaned { .. })
    }
}

/// One operation cache plus the configuration it was created with.
struct CacheSlot<V> {
    cache: SharedCache<V>,
    ttl: Duration,
    max_size: usize,
}

struct ManagerState<V> {
    caches: HashMap<String, CacheSlot<V>>,
    /// Operation ids with a live cache; same key set as `caches`
    registry: BTreeSet<String>,
}

impl<V> Default for ManagerState<V> {
    fn default() -> Self {
        Self {
            caches: HashMap::new(),
            registry: BTreeSet::new(),
        }
    }
}

// == Memoization Manager ==
/// Owns one [`BoundedCache`] per memoized operation for a single owner.
///
/// Embed one manager in each owning object. Caches are never shared between
/// managers, so identical calls on two owners are cached independently.
///
/// # Locking
/// The registry has its own mutex and is never held while a value is being
/// computed. Each cache has its own mutex which *is* held across the compute
/// triggered by a miss, so concurrent callers of the same operation compute at
/// most once per miss and otherwise wait. A compute that calls back into the
/// same operation on the same owner deadlocks.
pub struct MemoizationManager<V> {
    owner: OwnerId,
    state: Mutex<ManagerState<V>>,
}

impl<V> Default for MemoizationManager<V>
where
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for MemoizationManager<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoizationManager")
            .field("owner", &self.owner)
            .field("operations", &state.registry)
            .finish()
    }
}

impl<V> MemoizationManager<V>
where
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty manager with a fresh owner identity.
    pub fn new() -> Self {
        Self {
            owner: OwnerId::next(),
            state: Mutex::new(ManagerState::default()),
        }
    }

    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    // == Resolve Cache ==
    /// Returns the cache for `operation`, creating it on first use.
    ///
    /// The `ttl` and `max_size` given on first resolution stay in force for the
    /// cache's lifetime; later differing values are ignored.
    ///
    /// # Arguments
    /// * `operation` - Operation identifier the cache belongs to
    /// * `ttl` - Entry lifetime used when the cache is created
    /// * `max_size` - Capacity used when the cache is created
    pub fn resolve_cache(
        &self,
        operation: &str,
        ttl: Duration,
        max_size: usize,
    ) -> Result<SharedCache<V>> {
        let mut state = self.state.lock();

        // Reuse the existing cache, keeping its first configuration
        if let Some(slot) = state.caches.get(operation) {
            if slot.ttl != ttl || slot.max_size != max_size {
                warn!(
                    owner = %self.owner,
                    operation,
                    ?ttl,
                    max_size,
                    "ignoring configuration differing from the existing cache"
                );
            }
            return Ok(Arc::clone(&slot.cache));
        }

        // Create and register a new cache
        let cache = Arc::new(Mutex::new(BoundedCache::named(operation, max_size, ttl)?));
        state.caches.insert(
            operation.to_string(),
            CacheSlot {
                cache: Arc::clone(&cache),
                ttl,
                max_size,
            },
        );
        state.registry.insert(operation.to_string());

        debug!(owner = %self.owner, operation, ?ttl, max_size, "created operation cache");
        Ok(cache)
    }

    // == Derive Key ==
    /// Builds the key of a call on this owner.
    ///
    /// # Arguments
    /// * `operation` - Operation identifier
    /// * `args` - Call arguments, any serializable value
    /// * `callback` - Trailing callable, part of the key by identity
    pub fn derive_key<A>(
        &self,
        operation: &str,
        args: &A,
        callback: Option<&Callback>,
    ) -> Result<CacheKey>
    where
        A: Serialize + ?Sized,
    {
        key::derive_key(self.owner, operation, args, callback)
    }

    // == Fetch Or Compute ==
    /// Returns the cached result of a call, computing and storing it on a miss.
    ///
    /// A cached result is returned even when it is a null/none value. Errors
    /// from `compute` are returned unchanged and nothing is stored, so the next
    /// call computes again.
    ///
    /// # Arguments
    /// * `operation` - Operation identifier
    /// * `ttl` - Entry lifetime if the cache does not exist yet
    /// * `max_size` - Capacity if the cache does not exist yet
    /// * `args` - Call arguments
    /// * `callback` - Trailing callable passed through to `compute`
    /// * `compute` - Produces the result on a miss
    pub fn fetch_or_compute<A, F, E>(
        &self,
        operation: &str,
        ttl: Duration,
        max_size: usize,
        args: &A,
        callback: Option<&Callback>,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        A: Serialize + ?Sized,
        F: FnOnce(&A, Option<&Callback>) -> std::result::Result<V, E>,
        E: From<MemoError>,
    {
        // Resolve the cache, then the key
        let cache = self.resolve_cache(operation, ttl, max_size)?;
        let key = self.derive_key(operation, args, callback)?;

        // Hold the cache lock across compute so a miss is computed once
        let mut cache = cache.lock();
        if let Some(value) = cache.get(&key) {
            debug!(owner = %self.owner, operation, "memo hit");
            return Ok(value);
        }

        debug!(owner = %self.owner, operation, "memo miss, computing");
        let value = compute(args, callback)?;

        // Store the fresh result
        Ok(cache.set(key, value)?)
    }

    // == Clear ==
    /// Drops the cache for `operation`.
    ///
    /// # Arguments
    /// * `operation` - Operation identifier
    ///
    /// # Returns
    /// Whether a cache existed
    pub fn clear(&self, operation: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.caches.remove(operation).is_some();
        state.registry.remove(operation);

        if removed {
            info!(owner = %self.owner, operation, "cleared memoized operation");
        }
        removed
    }

    /// Drops every cache of this owner. Returns how many were dropped.
    pub fn clear_all(&self) -> usize {
        let mut state = self.state.lock();
        let count = state.registry.len();
        state.caches.clear();
        state.registry.clear();

        info!(owner = %self.owner, count, "cleared all memoized operations");
        count
    }

    // == Cleanup All ==
    /// Sweeps expired entries from every cache of this owner.
    ///
    /// A failing cache is recorded in the outcome map; the remaining caches are
    /// still swept.
    pub fn cleanup_all(&self) -> BTreeMap<String, CleanupOutcome> {
        // Snapshot the caches so the state lock is not held while sweeping
        let caches: Vec<(String, SharedCache<V>)> = {
            let state = self.state.lock();
            state
                .registry
                .iter()
                .filter_map(|op| {
                    state
                        .caches
                        .get(op)
                        .map(|slot| (op.clone(), Arc::clone(&slot.cache)))
                })
                .collect()
        };

        let mut outcomes = BTreeMap::new();
        let mut total_removed = 0;

        // Sweep each cache, recording failures without stopping
        for (operation, cache) in caches {
            let outcome = match cache.lock().cleanup() {
                Ok(removed) => {
                    total_removed += removed;
                    CleanupOutcome::Cleaned { removed }
                }
                Err(e) => {
                    warn!(owner = %self.owner, operation = %operation, error = %e, "cleanup failed");
                    CleanupOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            outcomes.insert(operation, outcome);
        }

        if total_removed > 0 {
            info!(owner = %self.owner, removed = total_removed, "swept expired memoized results");
        }
        outcomes
    }

    // == Queries ==
    /// Whether a cache has been created for `operation` on this owner.
    pub fn exists(&self, operation: &str) -> bool {
        self.state.lock().registry.contains(operation)
    }

    /// Operation ids with a live cache, sorted.
    pub fn operations(&self) -> Vec<String> {
        self.state.lock().registry.iter().cloned().collect()
    }

    /// Statistics of the cache for `operation`, if it exists.
    pub fn stats(&self, operation: &str) -> Option<CacheStats> {
        let cache = {
            let state = self.state.lock();
            Arc::clone(&state.caches.get(operation)?.cache)
        };
        let stats = cache.lock().stats();
        Some(stats)
    }
}
