//! Cache Store Module
//!
//! Main cache engine pairing a key/value map with an index of keys ordered by
//! expiry, so expired entries can be evicted without a full scan.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::cache::encoding::{is_expired, ExpiryKey};
use crate::cache::entry::CacheEntry;
use crate::cache::index::{BTreeIndex, OrderedIndex};
use crate::cache::stats::{CacheStats, SweepCounters};
use crate::cache::sweep::{SweepContext, SweepGate};
use crate::config::CacheConfig;

/// Keys sharing one expiry instant.
pub type KeySet<K> = HashSet<K>;

// == Cache State ==
/// Everything guarded by the cache lock. Both halves change together.
struct CacheState<K, V, I> {
    primary: HashMap<K, CacheEntry<V>>,
    by_expiry: I,
}

impl<K, V, I> CacheState<K, V, I>
where
    K: Eq + Hash,
    I: OrderedIndex<KeySet<K>>,
{
    /// Adds `key` to the bucket at `expiry`, creating the bucket if needed.
    fn link(&mut self, key: K, expiry: ExpiryKey) {
        let mut keys = self.by_expiry.delete(&expiry).unwrap_or_default();
        keys.insert(key);
        self.by_expiry.insert(expiry, keys);
    }

    /// Removes `key` from the bucket at `expiry`, dropping the bucket once empty.
    fn unlink<Q>(&mut self, key: &Q, expiry: ExpiryKey)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(mut keys) = self.by_expiry.delete(&expiry) else {
            debug_assert!(false, "no expiry bucket at {expiry} for a live key");
            return;
        };
        let removed = keys.remove(key);
        debug_assert!(removed, "key missing from its expiry bucket at {expiry}");
        if !keys.is_empty() {
            self.by_expiry.insert(expiry, keys);
        }
    }
}

// == Expiring Cache ==
/// Thread-safe key/value cache where every entry has an absolute expiry.
///
/// Reads take a shared lock; `put`, `delete` and the collection phase of
/// [`ExpiringCache::evict_expired_keys`] take the exclusive lock, so the
/// primary map and the expiry index are never observed out of step.
///
/// Expired entries stay in memory until deleted or swept, but `get` never
/// returns them.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use expiry_cache::{ExpiringCache, SweepContext};
///
/// let cache = ExpiringCache::new();
/// cache.put("session", 42, Utc::now() + Duration::minutes(5));
/// cache.put("stale", 7, Utc::now() - Duration::minutes(5));
///
/// assert_eq!(cache.get("session"), Some(42));
/// assert_eq!(cache.get("stale"), None);
/// assert_eq!(cache.evict_expired_keys(&SweepContext::background()), 1);
/// ```
pub struct ExpiringCache<K, V, I = BTreeIndex<KeySet<K>>> {
    state: RwLock<CacheState<K, V, I>>,
    sweep_gate: SweepGate,
    counters: SweepCounters,
    config: CacheConfig,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty cache with no limits.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates an empty cache with the given configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_index(BTreeIndex::new(), config)
    }
}

impl<K, V> Default for ExpiringCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, I> ExpiringCache<K, V, I>
where
    K: Eq + Hash + Clone,
    I: OrderedIndex<KeySet<K>>,
{
    /// Creates an empty cache on top of a caller-supplied index.
    ///
    /// # Panics
    /// Panics if `by_expiry` already holds buckets: they would reference keys
    /// the cache does not store.
    pub fn with_index(by_expiry: I, config: CacheConfig) -> Self {
        assert!(
            by_expiry.is_empty(),
            "expiry index must start empty, found {} buckets",
            by_expiry.len()
        );
        Self {
            state: RwLock::new(CacheState {
                primary: HashMap::new(),
                by_expiry,
            }),
            sweep_gate: SweepGate::new(),
            counters: SweepCounters::default(),
            config,
        }
    }

    // == Get ==
    /// Returns the value for `key` if present and not yet expired.
    ///
    /// Expired entries are reported as absent but left in place.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let state = self.read();
        state
            .primary
            .get(key)
            .filter(|entry| !entry.is_expired_at(Utc::now()))
            .map(|entry| entry.value.clone())
    }

    // == Put ==
    /// Stores `value` under `key` until `expires_at`, replacing any previous
    /// entry and moving the key out of its old expiry bucket.
    pub fn put(&self, key: K, value: V, expires_at: DateTime<Utc>) {
        let expiry = ExpiryKey::encode(expires_at);

        let (is_new, len) = {
            let mut state = self.write();
            let previous = state
                .primary
                .insert(key.clone(), CacheEntry::new(value, expires_at));

            match previous.as_ref().map(CacheEntry::expiry_key) {
                Some(old) if old == expiry => {}
                Some(old) => {
                    state.unlink(&key, old);
                    state.link(key, expiry);
                }
                None => state.link(key, expiry),
            }
            (previous.is_none(), state.primary.len())
        };

        if let Some(max_items) = self.config.max_items {
            if is_new && len > max_items {
                warn!(
                    entries = len,
                    max_items, "Cache holds more entries than its configured soft capacity"
                );
            }
        }
    }

    // == Delete ==
    /// Removes `key`. Returns false if it was not present.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut state = self.write();
        let Some(entry) = state.primary.remove(key) else {
            return false;
        };
        state.unlink(key, entry.expiry_key());
        true
    }

    // == Evict Expired Keys ==
    /// Removes every entry whose expiry is at or before the moment the sweep
    /// starts walking the index.
    ///
    /// The walk runs in expiry order under the exclusive lock and stops at the
    /// first live bucket, when `ctx` fires, or when the configured per-sweep
    /// cap is reached. Collected keys are then deleted one by one outside the
    /// walk, even if `ctx` fired.
    ///
    /// Only one sweep runs at a time. A call that arrives during another
    /// sweep waits for it and returns 0: the evictions are credited to the
    /// call that did the walk.
    pub fn evict_expired_keys(&self, ctx: &SweepContext) -> u64 {
        let Some(_permit) = self.sweep_gate.enter() else {
            self.counters.record_coalesced();
            debug!("Eviction sweep coalesced into a concurrent sweep");
            return 0;
        };
        debug!(deadline = ?ctx.deadline(), "Eviction sweep started");

        let (candidates, truncated) = self.collect_expired(ctx);
        let collected = candidates.len();

        let evicted = candidates.iter().filter(|key| self.delete(*key)).count() as u64;

        self.counters.record_sweep(evicted, truncated);
        debug!(collected, evicted, truncated, "Eviction sweep finished");
        evicted
    }

    /// Walks the index collecting keys of expired buckets.
    ///
    /// Returns the keys and whether the walk stopped before reaching a live
    /// bucket or the end of the index.
    fn collect_expired(&self, ctx: &SweepContext) -> (Vec<K>, bool) {
        let cap = self.config.max_evictions_per_sweep;
        let mut candidates = Vec::new();
        let mut truncated = false;

        let state = self.write();
        let now = Utc::now();
        state.by_expiry.walk(|expiry, keys| {
            if ctx.is_done() {
                truncated = true;
                return true;
            }
            // Later buckets expire later still
            if !is_expired(now, expiry.decode()) {
                return true;
            }
            if let Some(cap) = cap {
                if !candidates.is_empty() && candidates.len() + keys.len() > cap {
                    truncated = true;
                    return true;
                }
            }
            trace!(bucket = %expiry, keys = keys.len(), "Collecting expired bucket");
            candidates.extend(keys.iter().cloned());
            false
        });

        (candidates, truncated)
    }

    // == Introspection ==
    /// Raw expiry instant stored for `key`, even if already expired.
    pub fn expires_at<Q>(&self, key: &Q) -> Option<DateTime<Utc>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().primary.get(key).map(|entry| entry.expires_at)
    }

    /// Number of entries physically present, expired or not.
    pub fn len(&self) -> usize {
        self.read().primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().primary.is_empty()
    }

    /// Number of distinct expiry instants in the index.
    pub fn bucket_count(&self) -> usize {
        self.read().by_expiry.len()
    }

    /// Number of keys stored with exactly `expires_at`, expired or not.
    pub fn bucket_len(&self, expires_at: DateTime<Utc>) -> usize {
        self.read()
            .by_expiry
            .get(&ExpiryKey::encode(expires_at))
            .map_or(0, HashSet::len)
    }

    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let (total_entries, buckets) = {
            let state = self.read();
            (state.primary.len(), state.by_expiry.len())
        };
        self.counters.snapshot(total_entries, buckets)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState<K, V, I>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState<K, V, I>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Panics unless the primary map and the expiry index agree exactly.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self)
    where
        K: std::fmt::Debug,
    {
        let state = self.read();
        let mut indexed = 0;

        state.by_expiry.walk(|expiry, keys| {
            assert!(!keys.is_empty(), "empty bucket left at {expiry}");
            for key in keys {
                let entry = state
                    .primary
                    .get(key)
                    .unwrap_or_else(|| panic!("{key:?} indexed at {expiry} but not stored"));
                assert_eq!(entry.expiry_key(), *expiry, "{key:?} indexed in wrong bucket");
            }
            indexed += keys.len();
            false
        });

        assert_eq!(indexed, state.primary.len(), "index and map sizes differ");
    }

    #[cfg(test)]
    pub(crate) fn sweep_gate(&self) -> &SweepGate {
        &self.sweep_gate
    }
}
