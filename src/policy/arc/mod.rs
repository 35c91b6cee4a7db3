//! # Adaptive Hybrid Engine (ARC-style)
//!
//! Splits one eviction budget between a recency view and a frequency view
//! and moves capacity between them, one unit at a time, whenever a request
//! hits a key that one of the views recently evicted.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ ArcCache<K, V>              one parking_lot::Mutex around ArcCore    │
//!   │                                                                      │
//!   │   ┌───────────────────────────────┐   ┌───────────────────────────┐  │
//!   │   │ RecencyPart  (capacity Cr)    │   │ FrequencyPart (capacity Cf)│ │
//!   │   │   LRU list, hits per entry    │   │   frequency buckets       │  │
//!   │   │   ghost: evicted keys         │   │   ghost: evicted keys     │  │
//!   │   └──────────────┬────────────────┘   └─────────────▲─────────────┘  │
//!   │                  │ hits >= transform_threshold      │                │
//!   │                  └────────────── promote ───────────┘                │
//!   │                                                                      │
//!   │   Cr + Cf == total capacity, always                                  │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Operations
//!
//! Both `put` and `get` start with a ghost check:
//!
//! ```text
//!   key in recency ghost?    → drop ghost, Cf -= 1 (if Cf > 0), Cr += 1
//!   key in frequency ghost?  → drop ghost, Cr -= 1 (if Cr > 0), Cf += 1
//! ```
//!
//! Shrinking a full part evicts its oldest victim into that part's ghost list
//! first. The ghost check never produces a value.
//!
//! `get` then asks the recency part. A hit counts toward the transform
//! threshold; at or past it the value is also written into the frequency
//! part. A recency miss falls through to the frequency part.
//!
//! `put` always writes to the recency part, and also to the frequency part
//! when that part already holds the key. New keys start recency-only.
//!
//! ## Ghost Bookkeeping
//!
//! A key can be live in both parts at once after promotion. An evicted key
//! only becomes a ghost when it is no longer live anywhere, and it is removed
//! from the other part's ghost list at the same time, so a key is never a
//! ghost in two places or a ghost and live simultaneously. Each ghost list is
//! bounded by its part's initial capacity and drops its oldest key when full.
//!
//! ## Example
//!
//! ```
//! use evictkit::policy::arc::ArcCache;
//! use evictkit::traits::CachePolicy;
//!
//! let cache = ArcCache::new(2);
//! cache.put(1, "a");
//! cache.put(2, "b");
//! cache.put(3, "c"); // evicts 1 from the recency part
//!
//! assert_eq!(cache.get(&1), None); // ghost hit: recency part grows
//! assert_eq!(cache.recency_capacity(), 3);
//! assert_eq!(cache.frequency_capacity(), 1);
//! ```

mod frequency_part;
mod recency_part;

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::ArcMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{ArcMetricsRecorder, CoreMetricsRecorder, MetricsSnapshotProvider};
use crate::traits::CachePolicy;

use frequency_part::FrequencyPart;
use recency_part::RecencyPart;

/// Recency hits needed before a key is copied into the frequency part.
pub const DEFAULT_TRANSFORM_THRESHOLD: usize = 2;

/// Outcome of taking one unit of capacity from a part.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Shrink<K> {
    /// Capacity was already 0; nothing changed.
    AtFloor,
    /// Capacity dropped by one, evicting `evicted` if the part was full.
    Shrunk { evicted: Option<K> },
}

/// Capacity and ghost operations the hybrid needs from each part.
pub(crate) trait ArcPart<K> {
    fn contains(&self, key: &K) -> bool;
    fn capacity(&self) -> usize;
    fn increase_capacity(&mut self);
    fn decrease_capacity(&mut self) -> Shrink<K>;
    /// Removes `key` from this part's ghost list; `true` if it was there.
    fn take_ghost(&mut self, key: &K) -> bool;
    fn remember(&mut self, key: K);
}

/// Files a key evicted from `owner` as a ghost, unless `other` still holds it live.
fn retire<K>(owner: &mut impl ArcPart<K>, other: &mut impl ArcPart<K>, key: K) {
    if other.contains(&key) {
        return;
    }
    other.take_ghost(&key);
    owner.remember(key);
}

/// Single-threaded adaptive hybrid core.
pub struct ArcCore<K, V> {
    recency: RecencyPart<K, V>,
    frequency: FrequencyPart<K, V>,
    transform_threshold: usize,
    total_capacity: usize,
    #[cfg(feature = "metrics")]
    metrics: ArcMetrics,
}

impl<K, V> ArcCore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Uses [`DEFAULT_TRANSFORM_THRESHOLD`].
    pub fn new(capacity: usize) -> Self {
        Self::with_threshold(capacity, DEFAULT_TRANSFORM_THRESHOLD)
    }

    /// Both parts start at `capacity`. A threshold below 1 is raised to 1.
    pub fn with_threshold(capacity: usize, transform_threshold: usize) -> Self {
        let transform_threshold = transform_threshold.max(1);
        Self {
            recency: RecencyPart::new(capacity, transform_threshold),
            frequency: FrequencyPart::new(capacity),
            transform_threshold,
            total_capacity: capacity.saturating_mul(2),
            #[cfg(feature = "metrics")]
            metrics: ArcMetrics::default(),
        }
    }

    pub fn transform_threshold(&self) -> usize {
        self.transform_threshold
    }

    pub fn recency_capacity(&self) -> usize {
        self.recency.capacity()
    }

    pub fn frequency_capacity(&self) -> usize {
        self.frequency.capacity()
    }

    pub fn recency_len(&self) -> usize {
        self.recency.len()
    }

    pub fn frequency_len(&self) -> usize {
        self.frequency.len()
    }

    pub fn in_recency(&self, key: &K) -> bool {
        self.recency.contains(key)
    }

    pub fn in_frequency(&self, key: &K) -> bool {
        self.frequency.contains(key)
    }

    pub fn is_recency_ghost(&self, key: &K) -> bool {
        self.recency.is_ghost(key)
    }

    pub fn is_frequency_ghost(&self, key: &K) -> bool {
        self.frequency.is_ghost(key)
    }

    pub fn ghost_len(&self) -> usize {
        self.recency.ghost_len() + self.frequency.ghost_len()
    }

    /// Hits recorded by the recency part for `key`.
    pub fn recency_hits(&self, key: &K) -> Option<usize> {
        self.recency.hits(key)
    }

    /// Frequency tracked by the frequency part for `key`.
    pub fn frequency_of(&self, key: &K) -> Option<u64> {
        self.frequency.frequency(key)
    }

    pub fn put(&mut self, key: K, value: V) {
        self.check_ghosts(&key);

        let tracked = self.frequency.contains(&key);
        #[cfg(feature = "metrics")]
        if tracked || self.recency.contains(&key) {
            self.metrics.record_insert_update();
        } else {
            self.metrics.record_insert_new();
        }

        if tracked {
            if let Some(victim) = self.recency.insert(key.clone(), value.clone()) {
                self.retire_from_recency(victim);
            }
            if let Some(victim) = self.frequency.insert(key, value) {
                self.retire_from_frequency(victim);
            }
        } else if let Some(victim) = self.recency.insert(key, value) {
            self.retire_from_recency(victim);
        }
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.check_ghosts(key);

        if let Some(promote) = self.recency.touch(key) {
            if promote {
                self.promote(key);
            }
            #[cfg(feature = "metrics")]
            self.metrics.record_get_hit();
            return self.recency.peek(key);
        }

        if self.frequency.contains(key) {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_hit();
            return self.frequency.get(key);
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_get_miss();
        None
    }

    /// Live in either part.
    pub fn contains(&self, key: &K) -> bool {
        self.recency.contains(key) || self.frequency.contains(key)
    }

    /// Live entries across both parts; a promoted key counts once per part.
    pub fn len(&self) -> usize {
        self.recency.len() + self.frequency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Cr + Cf`, constant for the life of the cache.
    pub fn capacity(&self) -> usize {
        self.recency.capacity() + self.frequency.capacity()
    }

    /// Drops live entries and ghosts. Part capacities keep their current split.
    pub fn clear(&mut self) {
        self.recency.clear();
        self.frequency.clear();
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }

    fn check_ghosts(&mut self, key: &K) {
        if self.recency.take_ghost(key) {
            #[cfg(feature = "metrics")]
            self.metrics.record_recency_ghost_hit();
            if let Shrink::Shrunk { evicted } = self.frequency.decrease_capacity() {
                if let Some(victim) = evicted {
                    self.retire_from_frequency(victim);
                }
                self.recency.increase_capacity();
                self.record_shift("recency");
            }
        } else if self.frequency.take_ghost(key) {
            #[cfg(feature = "metrics")]
            self.metrics.record_frequency_ghost_hit();
            if let Shrink::Shrunk { evicted } = self.recency.decrease_capacity() {
                if let Some(victim) = evicted {
                    self.retire_from_recency(victim);
                }
                self.frequency.increase_capacity();
                self.record_shift("frequency");
            }
        }
    }

    fn record_shift(&mut self, toward: &'static str) {
        #[cfg(feature = "metrics")]
        self.metrics.record_capacity_shift();
        debug!(
            toward,
            recency_capacity = self.recency.capacity(),
            frequency_capacity = self.frequency.capacity(),
            "arc capacity shift"
        );
    }

    fn promote(&mut self, key: &K) {
        let Some(value) = self.recency.peek(key).cloned() else {
            return;
        };
        let fresh = !self.frequency.contains(key);
        if let Some(victim) = self.frequency.insert(key.clone(), value) {
            self.retire_from_frequency(victim);
        }
        if fresh && self.frequency.contains(key) {
            #[cfg(feature = "metrics")]
            self.metrics.record_promotion();
            trace!("arc promoted key to frequency part");
        }
    }

    fn retire_from_recency(&mut self, key: K) {
        #[cfg(feature = "metrics")]
        self.metrics.record_evicted_entry();
        retire(&mut self.recency, &mut self.frequency, key);
    }

    fn retire_from_frequency(&mut self, key: K) {
        #[cfg(feature = "metrics")]
        self.metrics.record_evicted_entry();
        retire(&mut self.frequency, &mut self.recency, key);
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.recency.check_invariants()?;
        self.frequency.check_invariants()?;
        if self.capacity() != self.total_capacity {
            return Err(InvariantError::new(format!(
                "part capacities {} + {} drifted from {}",
                self.recency.capacity(),
                self.frequency.capacity(),
                self.total_capacity
            )));
        }
        for key in self.recency.ghost_keys() {
            if self.frequency.is_ghost(key) {
                return Err(InvariantError::new("key is a ghost in both parts"));
            }
            if self.contains(key) {
                return Err(InvariantError::new("recency ghost is still live"));
            }
        }
        if self.frequency.ghost_keys().any(|key| self.contains(key)) {
            return Err(InvariantError::new("frequency ghost is still live"));
        }
        Ok(())
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot(self.len(), self.capacity())
    }
}

impl<K, V> fmt::Debug for ArcCore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcCore")
            .field("transform_threshold", &self.transform_threshold)
            .field("total_capacity", &self.total_capacity)
            .finish_non_exhaustive()
    }
}

/// Thread-safe adaptive hybrid cache.
///
/// Ghost check, recency update and frequency update run under one lock, so a
/// `put` or `get` is atomic with respect to other callers.
pub struct ArcCache<K, V> {
    inner: Mutex<ArcCore<K, V>>,
}

impl<K, V> ArcCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Uses [`DEFAULT_TRANSFORM_THRESHOLD`].
    pub fn new(capacity: usize) -> Self {
        Self::with_threshold(capacity, DEFAULT_TRANSFORM_THRESHOLD)
    }

    /// A threshold below 1 is raised to 1.
    pub fn with_threshold(capacity: usize, transform_threshold: usize) -> Self {
        Self {
            inner: Mutex::new(ArcCore::with_threshold(capacity, transform_threshold)),
        }
    }

    pub fn try_with_threshold(
        capacity: usize,
        transform_threshold: usize,
    ) -> Result<Self, ConfigError> {
        if transform_threshold == 0 {
            return Err(ConfigError::zero("transform_threshold"));
        }
        Ok(Self::with_threshold(capacity, transform_threshold))
    }

    pub fn recency_capacity(&self) -> usize {
        self.inner.lock().recency_capacity()
    }

    pub fn frequency_capacity(&self) -> usize {
        self.inner.lock().frequency_capacity()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

impl<K, V> CachePolicy<K, V> for ArcCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn put(&self, key: K, value: V) {
        self.inner.lock().put(key, value);
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
impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for ArcCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.inner.lock().metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for ArcCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArcCache")
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
        fn put_then_get_round_trips() {
            let mut arc = ArcCore::new(4);
            arc.put("a", 1);
            assert_eq!(arc.get(&"a"), Some(&1));
            arc.put("a", 2);
            assert_eq!(arc.get(&"a"), Some(&2));
        }

        #[test]
        fn new_keys_start_recency_only() {
            let mut arc = ArcCore::new(4);
            arc.put("a", 1);
            assert!(arc.in_recency(&"a"));
            assert!(!arc.in_frequency(&"a"));
            assert_eq!(arc.recency_hits(&"a"), Some(1));
        }

        #[test]
        fn reaching_threshold_copies_into_frequency_part() {
            let mut arc = ArcCore::with_threshold(4, 2);
            arc.put("a", 1);
            arc.get(&"a");
            assert!(arc.in_recency(&"a"));
            assert!(arc.in_frequency(&"a"));
            assert_eq!(arc.len(), 2);
        }

        #[test]
        fn put_writes_through_to_tracked_frequency_copy() {
            let mut arc = ArcCore::with_threshold(4, 2);
            arc.put("a", 1);
            arc.get(&"a");
            arc.put("a", 9);
            assert_eq!(arc.frequency_of(&"a"), Some(2));
            assert_eq!(arc.get(&"a"), Some(&9));
        }

        #[test]
        fn recency_miss_falls_through_to_frequency_part() {
            let mut arc = ArcCore::with_threshold(1, 2);
            arc.put(1, 10);
            arc.get(&1);
            assert!(arc.in_frequency(&1));

            // Pushes 1 out of the one-slot recency part; the frequency copy survives.
            arc.put(2, 20);
            assert!(!arc.in_recency(&1));
            assert!(!arc.is_recency_ghost(&1));
            assert_eq!(arc.get(&1), Some(&10));
        }

        #[test]
        fn capacity_is_sum_of_parts() {
            let arc: ArcCore<u32, u32> = ArcCore::new(3);
            assert_eq!(arc.capacity(), 6);
            assert_eq!(arc.recency_capacity(), 3);
            assert_eq!(arc.frequency_capacity(), 3);
        }
    }

    mod ghost_shifts {
        use super::*;

        #[test]
        fn recency_ghost_hit_moves_one_unit_toward_recency() {
            let mut arc = ArcCore::new(2);
            arc.put(1, 1);
            arc.put(2, 2);
            arc.put(3, 3);
            assert!(arc.is_recency_ghost(&1));

            assert_eq!(arc.get(&1), None);
            assert_eq!(arc.recency_capacity(), 3);
            assert_eq!(arc.frequency_capacity(), 1);
            assert!(!arc.is_recency_ghost(&1));
            arc.check_invariants().unwrap();
        }

        #[test]
        fn frequency_ghost_hit_moves_one_unit_toward_frequency() {
            // Threshold 1: the first get promotes.
            let mut arc = ArcCore::with_threshold(1, 1);
            arc.put(1, 1);
            arc.get(&1);
            arc.put(2, 2);
            arc.get(&2);

            // Promoting 2 pushed 1 out of the one-slot frequency part.
            assert!(arc.in_frequency(&2));
            assert!(!arc.in_frequency(&1));
            assert!(arc.is_frequency_ghost(&1));

            arc.put(1, 1);
            assert_eq!(arc.frequency_capacity(), 2);
            assert_eq!(arc.recency_capacity(), 0);
            assert!(!arc.in_recency(&1));
            arc.check_invariants().unwrap();
        }

        #[test]
        fn shrinking_a_part_at_zero_does_not_grow_the_other() {
            let mut arc = ArcCore::new(1);
            arc.put(1, 1);
            arc.put(2, 2);
            assert!(arc.is_recency_ghost(&1));
            arc.get(&1);
            assert_eq!(arc.recency_capacity(), 2);
            assert_eq!(arc.frequency_capacity(), 0);

            arc.put(3, 3);
            arc.put(4, 4);
            assert!(arc.is_recency_ghost(&2));
            arc.get(&2);
            assert_eq!(arc.recency_capacity(), 2);
            assert_eq!(arc.frequency_capacity(), 0);
            arc.check_invariants().unwrap();
        }

        #[test]
        fn shrinking_full_part_evicts_into_its_ghost_list() {
            let mut arc = ArcCore::with_threshold(2, 1);
            arc.put(10, 10);
            arc.get(&10);
            arc.put(20, 20);
            arc.get(&20);
            assert_eq!(arc.frequency_len(), 2);

            // Cycle the recency part until a recency-only key is evicted.
            arc.put(1, 1);
            arc.put(2, 2);
            arc.put(3, 3);
            assert!(arc.is_recency_ghost(&1));

            arc.get(&1);
            assert_eq!(arc.recency_capacity(), 3);
            assert_eq!(arc.frequency_capacity(), 1);
            assert_eq!(arc.frequency_len(), 1);
            assert!(arc.is_frequency_ghost(&10));
            arc.check_invariants().unwrap();
        }

        #[test]
        fn promoted_key_is_not_ghosted_while_live_elsewhere() {
            let mut arc = ArcCore::with_threshold(1, 1);
            arc.put(1, 1);
            arc.get(&1);
            arc.put(2, 2);
            assert!(arc.in_frequency(&1));
            assert!(!arc.is_recency_ghost(&1));
            arc.check_invariants().unwrap();
        }
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn zero_capacity_drops_everything() {
            let mut arc = ArcCore::new(0);
            arc.put(1, 1);
            assert_eq!(arc.get(&1), None);
            assert!(arc.is_empty());
            assert_eq!(arc.capacity(), 0);
            arc.check_invariants().unwrap();
        }

        #[test]
        fn clear_keeps_capacity_split() {
            let mut arc = ArcCore::new(2);
            arc.put(1, 1);
            arc.put(2, 2);
            arc.put(3, 3);
            arc.get(&1);
            arc.clear();
            assert!(arc.is_empty());
            assert_eq!(arc.ghost_len(), 0);
            assert_eq!(arc.recency_capacity(), 3);
            assert_eq!(arc.capacity(), 4);
        }

        #[test]
        fn zero_threshold_is_rejected_by_fallible_constructor() {
            let err = ArcCache::<u32, u32>::try_with_threshold(4, 0).unwrap_err();
            assert_eq!(err.field(), "transform_threshold");
            let arc: ArcCore<u32, u32> = ArcCore::with_threshold(4, 0);
            assert_eq!(arc.transform_threshold(), 1);
        }
    }

    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn counts_ghost_hits_shifts_and_promotions() {
            let cache = ArcCache::with_threshold(2, 2);
            cache.put(1, 1);
            cache.get(&1);
            cache.put(2, 2);
            cache.put(3, 3);
            cache.put(4, 4);
            assert_eq!(cache.get(&2), None);

            let snap = cache.snapshot();
            assert_eq!(snap.promotions, 1);
            assert_eq!(snap.recency_ghost_hits, 1);
            assert_eq!(snap.capacity_shifts, 1);
            assert_eq!(snap.get_hits, 1);
            assert_eq!(snap.get_misses, 1);
            assert_eq!(snap.insert_new, 4);
            assert_eq!(snap.evicted_entries, 2);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn capacity_and_ghost_rules_hold(
                capacity in 0usize..6,
                threshold in 1usize..4,
                ops in prop::collection::vec((any::<bool>(), 0u32..12), 0..200)
            ) {
                let mut arc = ArcCore::with_threshold(capacity, threshold);
                for (is_put, key) in ops {
                    if is_put {
                        arc.put(key, key);
                    } else if let Some(value) = arc.get(&key) {
                        prop_assert_eq!(*value, key);
                    }
                    prop_assert!(arc.recency_len() <= arc.recency_capacity());
                    prop_assert!(arc.frequency_len() <= arc.frequency_capacity());
                    prop_assert_eq!(arc.capacity(), capacity * 2);
                    prop_assert!(arc.check_invariants().is_ok());
                }
            }
        }
    }
}
