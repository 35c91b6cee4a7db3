//! # Frequency Engine (LFU with aging)
//!
//! Evicts the entry with the lowest access frequency, oldest arrival first
//! among ties, and periodically deflates every frequency so long-lived hot
//! keys cannot pin themselves forever.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                           LfuCore<K, V>                              │
//!   │                                                                      │
//!   │   values:  FxHashMap<K, V>                                           │
//!   │   buckets: FrequencyBuckets<K>                                       │
//!   │                                                                      │
//!   │     min_freq                                                         │
//!   │        ▼                                                             │
//!   │     [1: d, e] ──► [2: b] ──► [7: a, c]                               │
//!   │      ▲ evict d first (oldest arrival at freq 1)                      │
//!   │                                                                      │
//!   │   total_accesses / len = average frequency                           │
//!   │   average > max_average_frequency  ⇒  aging pass                     │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Access Accounting
//!
//! Every insert and every access (a `get` hit or a `put` on an existing key)
//! adds one to `total_accesses`. An eviction subtracts the evicted entry's
//! frequency. After an access, if `total_accesses / len` exceeds
//! `max_average_frequency`, an aging pass runs:
//!
//! ```text
//!   for every entry:  freq = max(1, freq - max_average_frequency / 2)
//!   min_freq        = smallest remaining frequency
//!   total_accesses  = sum of the new frequencies
//! ```
//!
//! The pass is O(n) and only triggers when the ceiling is crossed. One pass
//! always brings the average back under the ceiling.
//!
//! ## Example
//!
//! ```
//! use evictkit::policy::lfu::LfuCache;
//! use evictkit::traits::CachePolicy;
//!
//! let cache = LfuCache::new(2);
//! cache.put("hot", 1);
//! cache.put("cold", 2);
//! cache.get(&"hot");
//! cache.get(&"hot");
//!
//! cache.put("new", 3); // evicts "cold", the least frequently used
//! assert!(cache.contains(&"hot"));
//! assert!(!cache.contains(&"cold"));
//! ```

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::ds::FrequencyBuckets;
use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::LfuMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{CoreMetricsRecorder, LfuMetricsRecorder, MetricsSnapshotProvider};
use crate::traits::{CachePolicy, CoreCache};

/// Aging ceiling used by [`LfuCache::new`].
pub const DEFAULT_MAX_AVERAGE_FREQUENCY: u64 = 1_000_000;

/// Single-threaded LFU core with aging.
pub struct LfuCore<K, V> {
    values: FxHashMap<K, V>,
    buckets: FrequencyBuckets<K>,
    capacity: usize,
    max_average_frequency: u64,
    total_accesses: u64,
    #[cfg(feature = "metrics")]
    metrics: LfuMetrics,
}

impl<K, V> LfuCore<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self::with_max_average(capacity, DEFAULT_MAX_AVERAGE_FREQUENCY)
    }

    /// `max_average_frequency` below 1 is raised to 1.
    pub fn with_max_average(capacity: usize, max_average_frequency: u64) -> Self {
        Self {
            values: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            buckets: FrequencyBuckets::with_capacity(capacity),
            capacity,
            max_average_frequency: max_average_frequency.max(1),
            total_accesses: 0,
            #[cfg(feature = "metrics")]
            metrics: LfuMetrics::default(),
        }
    }

    pub fn max_average_frequency(&self) -> u64 {
        self.max_average_frequency
    }

    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.buckets.frequency(key)
    }

    pub fn min_frequency(&self) -> Option<u64> {
        self.buckets.min_freq()
    }

    pub fn total_accesses(&self) -> u64 {
        self.total_accesses
    }

    /// `total_accesses / len`, 0 when empty.
    pub fn average_frequency(&self) -> u64 {
        match self.values.len() as u64 {
            0 => 0,
            len => self.total_accesses / len,
        }
    }

    /// Reads `key` without counting an access.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.values.get(key)
    }

    /// Next entry [`insert`](CoreCache::insert) would evict.
    pub fn peek_lfu(&self) -> Option<(&K, u64)> {
        self.buckets.peek_min()
    }

    fn access(&mut self, key: &K) {
        if self.buckets.touch(key).is_some() {
            self.total_accesses = self.total_accesses.saturating_add(1);
            if self.average_frequency() > self.max_average_frequency {
                self.age();
            }
        }
    }

    fn age(&mut self) {
        let delta = (self.max_average_frequency / 2).max(1);
        let before = self.total_accesses;
        self.total_accesses = self.buckets.age_by(delta);
        #[cfg(feature = "metrics")]
        self.metrics.record_aging_pass();
        debug!(
            entries = self.values.len(),
            delta,
            total_before = before,
            total_after = self.total_accesses,
            "lfu aging pass"
        );
    }

    fn evict(&mut self) {
        let Some((key, freq)) = self.buckets.pop_min() else {
            return;
        };
        self.values.remove(&key);
        self.total_accesses = self.total_accesses.saturating_sub(freq);
        #[cfg(feature = "metrics")]
        self.metrics.record_evicted_entry();
        trace!(freq, "lfu evicted least frequent entry");
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.buckets.check_invariants()?;
        if self.values.len() != self.buckets.len() {
            return Err(InvariantError::new(format!(
                "lfu stores {} values but tracks {} frequencies",
                self.values.len(),
                self.buckets.len()
            )));
        }
        if self.values.len() > self.capacity {
            return Err(InvariantError::new("lfu over capacity"));
        }
        if self.values.keys().any(|key| !self.buckets.contains(key)) {
            return Err(InvariantError::new("lfu value without a frequency"));
        }
        let sum = self.buckets.total_frequency();
        if sum != self.total_accesses {
            return Err(InvariantError::new(format!(
                "running total {} disagrees with frequency sum {sum}",
                self.total_accesses
            )));
        }
        Ok(())
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot(self.values.len(), self.capacity)
    }
}

impl<K, V> CoreCache<K, V> for LfuCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(slot) = self.values.get_mut(&key) {
            let previous = std::mem::replace(slot, value);
            self.access(&key);
            #[cfg(feature = "metrics")]
            self.metrics.record_insert_update();
            return Some(previous);
        }

        if self.values.len() >= self.capacity {
            self.evict();
        }

        self.buckets.insert(key.clone());
        self.values.insert(key, value);
        self.total_accesses = self.total_accesses.saturating_add(1);
        #[cfg(feature = "metrics")]
        self.metrics.record_insert_new();
        None
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        if !self.values.contains_key(key) {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_miss();
            return None;
        }
        self.access(key);
        #[cfg(feature = "metrics")]
        self.metrics.record_get_hit();
        self.values.get(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry and resets the running total.
    fn clear(&mut self) {
        self.values.clear();
        self.buckets.clear();
        self.total_accesses = 0;
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }
}

impl<K, V> fmt::Debug for LfuCore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuCore")
            .field("len", &self.values.len())
            .field("capacity", &self.capacity)
            .field("max_average_frequency", &self.max_average_frequency)
            .field("total_accesses", &self.total_accesses)
            .finish_non_exhaustive()
    }
}

/// Thread-safe LFU cache with aging.
pub struct LfuCache<K, V> {
    inner: Mutex<LfuCore<K, V>>,
}

impl<K, V> LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Uses [`DEFAULT_MAX_AVERAGE_FREQUENCY`].
    pub fn new(capacity: usize) -> Self {
        Self::with_max_average(capacity, DEFAULT_MAX_AVERAGE_FREQUENCY)
    }

    /// `max_average_frequency` below 1 is raised to 1.
    pub fn with_max_average(capacity: usize, max_average_frequency: u64) -> Self {
        Self {
            inner: Mutex::new(LfuCore::with_max_average(capacity, max_average_frequency)),
        }
    }

    pub fn try_with_max_average(
        capacity: usize,
        max_average_frequency: u64,
    ) -> Result<Self, ConfigError> {
        if max_average_frequency == 0 {
            return Err(ConfigError::zero("max_average_frequency"));
        }
        Ok(Self::with_max_average(capacity, max_average_frequency))
    }

    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.inner.lock().frequency(key)
    }

    pub fn average_frequency(&self) -> u64 {
        self.inner.lock().average_frequency()
    }

    /// Drops every entry; same as [`CachePolicy::clear`].
    pub fn purge(&self) {
        self.inner.lock().clear();
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

impl<K, V> CachePolicy<K, V> for LfuCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn put(&self, key: K, value: V) {
        self.inner.lock().insert(key, value);
    }

    fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get(key).cloned()
    }

    fn contains(&self, key: &K) -> bool {
        self.inner.lock().contains(key)
    }

    fn len(&self) -> usize {
        self.inner.lock().len()
    }

    fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    fn clear(&self) {
        self.inner.lock().clear();
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for LfuCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.inner.lock().metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for LfuCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuCache")
            .field("inner", &*self.inner.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod basic_behavior {
        use super::*;

        #[test]
        fn frequent_key_outlives_single_access_keys() {
            let mut lfu = LfuCore::new(3);
            lfu.insert("a", 1);
            for _ in 0..5 {
                lfu.get(&"a");
            }
            lfu.insert("b", 2);
            lfu.insert("c", 3);

            for k in ["x", "y", "z"] {
                lfu.insert(k, 0);
                assert!(lfu.contains(&"a"));
            }
            assert!(!lfu.contains(&"b"));
            assert!(!lfu.contains(&"c"));
            assert!(lfu.contains(&"z"));
        }

        #[test]
        fn ties_evict_oldest_arrival() {
            let mut lfu = LfuCore::new(2);
            lfu.insert(1, ());
            lfu.insert(2, ());
            lfu.insert(3, ());
            assert!(!lfu.contains(&1));
            assert!(lfu.contains(&2));
            assert!(lfu.contains(&3));
        }

        #[test]
        fn put_on_existing_key_counts_as_access() {
            let mut lfu = LfuCore::new(2);
            lfu.insert("a", 1);
            assert_eq!(lfu.insert("a", 2), Some(1));
            assert_eq!(lfu.frequency(&"a"), Some(2));
            assert_eq!(lfu.peek(&"a"), Some(&2));
        }

        #[test]
        fn new_entry_resets_min_frequency() {
            let mut lfu = LfuCore::new(2);
            lfu.insert("a", ());
            lfu.get(&"a");
            lfu.get(&"a");
            assert_eq!(lfu.min_frequency(), Some(3));
            lfu.insert("b", ());
            assert_eq!(lfu.min_frequency(), Some(1));
            assert_eq!(lfu.peek_lfu(), Some((&"b", 1)));
        }

        #[test]
        fn eviction_subtracts_from_total() {
            let mut lfu = LfuCore::new(1);
            lfu.insert("a", ());
            lfu.get(&"a");
            lfu.get(&"a");
            assert_eq!(lfu.total_accesses(), 3);
            lfu.insert("b", ());
            assert_eq!(lfu.total_accesses(), 1);
            lfu.check_invariants().unwrap();
        }
    }

    mod aging {
        use super::*;

        #[test]
        fn aging_triggers_when_average_exceeds_ceiling() {
            let mut lfu = LfuCore::with_max_average(4, 4);
            lfu.insert("hot", ());
            lfu.insert("cold", ());
            // total 2 after inserts; 8 more hits on "hot" push total to 10, avg 5 > 4
            for _ in 0..8 {
                lfu.get(&"hot");
            }
            assert_eq!(lfu.frequency(&"hot"), Some(7));
            assert_eq!(lfu.frequency(&"cold"), Some(1));
            assert_eq!(lfu.total_accesses(), 8);
            assert!(lfu.average_frequency() <= lfu.max_average_frequency());
            lfu.check_invariants().unwrap();
        }

        #[test]
        fn hot_key_frequency_stays_bounded() {
            let mut lfu = LfuCore::with_max_average(4, 10);
            lfu.insert("hot", ());
            for _ in 0..10_000 {
                lfu.get(&"hot");
                assert!(lfu.average_frequency() <= 10);
            }
            assert!(lfu.frequency(&"hot").is_some_and(|f| f <= 11));
        }

        #[test]
        fn formerly_hot_key_becomes_evictable() {
            let mut lfu = LfuCore::with_max_average(2, 6);
            lfu.insert("old", ());
            for _ in 0..6 {
                lfu.get(&"old");
            }
            lfu.insert("new", ());
            for _ in 0..12 {
                lfu.get(&"new");
            }
            // aging has pulled "old" back to the floor while "new" kept climbing
            assert_eq!(lfu.frequency(&"old"), Some(1));
            lfu.insert("third", ());
            assert!(!lfu.contains(&"old"));
            assert!(lfu.contains(&"new"));
        }

        #[test]
        fn ceiling_of_one_still_ages() {
            let mut lfu = LfuCore::with_max_average(2, 1);
            lfu.insert(1, ());
            lfu.get(&1);
            assert_eq!(lfu.frequency(&1), Some(1));
            assert_eq!(lfu.average_frequency(), 1);
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn zero_capacity_drops_everything() {
            let cache = LfuCache::new(0);
            cache.put(1, 1);
            assert_eq!(cache.get(&1), None);
            assert_eq!(cache.len(), 0);
        }

        #[test]
        fn miss_does_not_change_accounting() {
            let mut lfu: LfuCore<u8, u8> = LfuCore::new(2);
            lfu.insert(1, 1);
            assert_eq!(lfu.get(&9), None);
            assert_eq!(lfu.total_accesses(), 1);
        }

        #[test]
        fn purge_resets_average() {
            let cache = LfuCache::new(4);
            cache.put(1, 1);
            cache.get(&1);
            cache.purge();
            assert!(cache.is_empty());
            assert_eq!(cache.average_frequency(), 0);
            cache.check_invariants().unwrap();
        }

        #[test]
        fn try_with_max_average_rejects_zero() {
            let err = LfuCache::<u8, u8>::try_with_max_average(4, 0).unwrap_err();
            assert_eq!(err.field(), "max_average_frequency");
            assert!(LfuCache::<u8, u8>::try_with_max_average(4, 3).is_ok());
        }
    }

    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn records_aging_passes() {
            let cache = LfuCache::with_max_average(2, 2);
            cache.put(1, ());
            for _ in 0..6 {
                cache.get(&1);
            }
            let snap = cache.snapshot();
            assert!(snap.aging_passes >= 1);
            assert_eq!(snap.get_hits, 6);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_bounded_and_consistent(
                capacity in 0usize..10,
                max_average in 1u64..12,
                ops in prop::collection::vec((any::<bool>(), 0u8..20), 0..400)
            ) {
                let mut lfu = LfuCore::with_max_average(capacity, max_average);
                for (is_put, key) in ops {
                    if is_put {
                        lfu.insert(key, key);
                    } else if let Some(value) = lfu.get(&key) {
                        prop_assert_eq!(*value, key);
                    }
                    prop_assert!(lfu.len() <= capacity);
                    prop_assert!(lfu.average_frequency() <= max_average);
                    prop_assert!(lfu.check_invariants().is_ok());
                }
            }
        }
    }
}
