//! # Sharded Wrapper
//!
//! Fans keys out over `N` independently locked engines so concurrent callers
//! working on different keys rarely contend for the same lock.
//!
//! ```text
//!                        put / get(key)
//!                              │
//!                 ShardSelector: hash(seed, key) % N
//!                              │
//!         ┌──────────────┬─────┴────────┬──────────────┐
//!         ▼              ▼              ▼              ▼
//!     ┌────────┐     ┌────────┐     ┌────────┐     ┌────────┐
//!     │ shard 0│     │ shard 1│     │  ...   │     │shard N-1│
//!     │ C      │     │ C      │     │        │     │ C      │
//!     └────────┘     └────────┘     └────────┘     └────────┘
//!      each sized ceil(capacity / N), each with its own lock
//! ```
//!
//! The wrapper adds no eviction logic. A key always routes to the same shard
//! for the lifetime of the wrapper, and nothing is coordinated across shards:
//! one hot shard can evict while others still have room. Because each shard
//! is rounded up, [`capacity`](CachePolicy::capacity) can exceed the
//! requested total by up to `N - 1`.
//!
//! A shard count of 0 resolves to
//! [`std::thread::available_parallelism`], falling back to 1.
//!
//! ```
//! use evictkit::policy::sharded::ShardedCache;
//! use evictkit::traits::CachePolicy;
//!
//! let cache = ShardedCache::lru(1024, 8);
//! cache.put("session:42", vec![1u8, 2, 3]);
//! assert_eq!(cache.get(&"session:42"), Some(vec![1, 2, 3]));
//! assert_eq!(cache.shard_count(), 8);
//! ```

use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::ds::{ShardSelector, resolve_shard_count};
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::policy::arc::ArcCache;
use crate::policy::lfu::LfuCache;
use crate::policy::lru::LruCache;
use crate::policy::lru_k::LrukCache;
use crate::traits::CachePolicy;

/// Seed mixed into every key hash before routing.
pub const DEFAULT_SHARD_SEED: u64 = 0;

/// `N` engines behind one [`CachePolicy`] surface.
pub struct ShardedCache<C> {
    shards: Box<[C]>,
    selector: ShardSelector,
}

pub type ShardedLruCache<K, V> = ShardedCache<LruCache<K, V>>;
pub type ShardedLrukCache<K, V> = ShardedCache<LrukCache<K, V>>;
pub type ShardedLfuCache<K, V> = ShardedCache<LfuCache<K, V>>;
pub type ShardedArcCache<K, V> = ShardedCache<ArcCache<K, V>>;

/// `ceil(total / shards)`, the capacity each shard receives.
pub fn per_shard_capacity(total: usize, shards: usize) -> usize {
    total.div_ceil(shards.max(1))
}

impl<C> ShardedCache<C> {
    /// Builds `shard_count` engines, calling `factory` with each shard's capacity.
    pub fn with_factory(
        capacity: usize,
        shard_count: usize,
        factory: impl FnMut(usize) -> C,
    ) -> Self {
        Self::with_factory_and_seed(capacity, shard_count, DEFAULT_SHARD_SEED, factory)
    }

    pub fn with_factory_and_seed(
        capacity: usize,
        shard_count: usize,
        seed: u64,
        mut factory: impl FnMut(usize) -> C,
    ) -> Self {
        let shard_count = resolve_shard_count(shard_count);
        let per_shard = per_shard_capacity(capacity, shard_count);
        let shards: Vec<C> = (0..shard_count).map(|_| factory(per_shard)).collect();
        debug!(
            shards = shard_count,
            per_shard_capacity = per_shard,
            requested_capacity = capacity,
            "sharded cache built"
        );
        Self {
            shards: shards.into_boxed_slice(),
            selector: ShardSelector::new(shard_count, seed),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard `key` routes to.
    pub fn shard_index<K: Hash + ?Sized>(&self, key: &K) -> usize {
        self.selector.shard_for_key(key)
    }

    pub fn shard(&self, index: usize) -> Option<&C> {
        self.shards.get(index)
    }

    pub fn shards(&self) -> &[C] {
        &self.shards
    }

    fn shard_for<K: Hash + ?Sized>(&self, key: &K) -> &C {
        // `shard_for_key` is always below the shard count the selector was built with.
        &self.shards[self.selector.shard_for_key(key)]
    }
}

impl<K, V> ShardedCache<LruCache<K, V>>
where
    K: Eq + Hash + Clone,
{
    pub fn lru(capacity: usize, shard_count: usize) -> Self {
        Self::with_factory(capacity, shard_count, LruCache::new)
    }

    /// Deletes `key` from the shard that owns it.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.shard_for(key).remove(key)
    }
}

impl<K, V> ShardedCache<LrukCache<K, V>>
where
    K: Eq + Hash + Clone,
{
    /// Both `capacity` and `history_capacity` are split across shards.
    pub fn lru_k(capacity: usize, history_capacity: usize, k: usize, shard_count: usize) -> Self {
        let shards = resolve_shard_count(shard_count);
        let history = per_shard_capacity(history_capacity, shards);
        Self::with_factory(capacity, shards, |cap| LrukCache::new(cap, history, k))
    }
}

impl<K, V> ShardedCache<LfuCache<K, V>>
where
    K: Eq + Hash + Clone,
{
    pub fn lfu(capacity: usize, shard_count: usize, max_average_frequency: u64) -> Self {
        Self::with_factory(capacity, shard_count, |cap| {
            LfuCache::with_max_average(cap, max_average_frequency)
        })
    }
}

impl<K, V> ShardedCache<ArcCache<K, V>>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn arc(capacity: usize, shard_count: usize, transform_threshold: usize) -> Self {
        Self::with_factory(capacity, shard_count, |cap| {
            ArcCache::with_threshold(cap, transform_threshold)
        })
    }
}

impl<K, V, C> CachePolicy<K, V> for ShardedCache<C>
where
    K: Hash,
    C: CachePolicy<K, V>,
{
    fn put(&self, key: K, value: V) {
        self.shard_for(&key).put(key, value);
    }

    fn get(&self, key: &K) -> Option<V> {
        self.shard_for(key).get(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.shard_for(key).contains(key)
    }

    /// Sum over shards; each shard is locked in turn, not all at once.
    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    fn capacity(&self) -> usize {
        self.shards.iter().map(|shard| shard.capacity()).sum()
    }

    fn clear(&self) {
        for shard in self.shards.iter() {
            shard.clear();
        }
    }
}

#[cfg(feature = "metrics")]
impl<C> MetricsSnapshotProvider<CacheMetricsSnapshot> for ShardedCache<C>
where
    C: MetricsSnapshotProvider<CacheMetricsSnapshot>,
{
    /// Counters and gauges summed over every shard.
    fn snapshot(&self) -> CacheMetricsSnapshot {
        let mut total = CacheMetricsSnapshot::default();
        for shard in self.shards.iter() {
            total.merge(&shard.snapshot());
        }
        total
    }
}

impl<C> fmt::Debug for ShardedCache<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedCache")
            .field("shards", &self.shards.len())
            .field("seed", &self.selector.seed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod routing {
        use super::*;

        #[test]
        fn key_always_routes_to_the_same_shard() {
            let cache: ShardedLruCache<u64, u64> = ShardedCache::lru(64, 4);
            for key in 0..200u64 {
                let first = cache.shard_index(&key);
                for _ in 0..3 {
                    assert_eq!(cache.shard_index(&key), first);
                }
            }
        }

        #[test]
        fn value_lives_in_its_routed_shard() {
            let cache = ShardedCache::lru(64, 4);
            for key in 0..32u64 {
                cache.put(key, key * 10);
            }
            for key in 0..32u64 {
                let idx = cache.shard_index(&key);
                for (i, shard) in cache.shards().iter().enumerate() {
                    assert_eq!(shard.contains(&key), i == idx);
                }
                assert_eq!(cache.get(&key), Some(key * 10));
            }
        }

        #[test]
        fn seed_changes_routing_but_not_results() {
            let a: ShardedLruCache<u32, u32> =
                ShardedCache::with_factory_and_seed(64, 8, 1, LruCache::new);
            let b: ShardedLruCache<u32, u32> =
                ShardedCache::with_factory_and_seed(64, 8, 2, LruCache::new);
            let moved = (0..100u32)
                .filter(|k| a.shard_index(k) != b.shard_index(k))
                .count();
            assert!(moved > 0);
        }
    }

    mod sizing {
        use super::*;

        #[test]
        fn per_shard_capacity_rounds_up() {
            assert_eq!(per_shard_capacity(10, 4), 3);
            assert_eq!(per_shard_capacity(8, 4), 2);
            assert_eq!(per_shard_capacity(0, 4), 0);
            assert_eq!(per_shard_capacity(5, 0), 5);

            let cache: ShardedLfuCache<u32, u32> = ShardedCache::lfu(10, 4, 100);
            assert_eq!(cache.capacity(), 12);
            assert!(cache.shards().iter().all(|s| s.capacity() == 3));
        }

        #[test]
        fn zero_shard_count_uses_parallelism_hint() {
            let cache: ShardedArcCache<u32, u32> = ShardedCache::arc(16, 0, 2);
            assert!(cache.shard_count() >= 1);
        }

        #[test]
        fn lru_k_splits_history_ledger() {
            let cache: ShardedLrukCache<u32, u32> = ShardedCache::lru_k(8, 8, 2, 2);
            assert_eq!(cache.shard_count(), 2);
            assert_eq!(cache.capacity(), 8);
            cache.put(1, 1);
            assert!(!cache.contains(&1));
            assert_eq!(cache.get(&1), Some(1));
        }
    }

    mod forwarding {
        use super::*;

        #[test]
        fn len_and_clear_cover_every_shard() {
            let cache = ShardedCache::lru(400, 4);
            for key in 0..40u32 {
                cache.put(key, ());
            }
            assert_eq!(cache.len(), 40);
            cache.clear();
            assert!(cache.is_empty());
        }

        #[test]
        fn remove_reaches_owning_shard() {
            let cache = ShardedCache::lru(16, 4);
            cache.put("k", 1);
            assert_eq!(cache.remove(&"k"), Some(1));
            assert!(!cache.contains(&"k"));
        }

        #[test]
        fn zero_capacity_drops_writes() {
            let cache = ShardedCache::lru(0, 4);
            cache.put(1u8, 1u8);
            assert_eq!(cache.get(&1), None);
            assert_eq!(cache.capacity(), 0);
        }
    }

    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn snapshot_merges_shards() {
            let cache = ShardedCache::lru(64, 4);
            for key in 0..10u32 {
                cache.put(key, key);
            }
            for key in 0..20u32 {
                cache.get(&key);
            }
            let snap = cache.snapshot();
            assert_eq!(snap.insert_new, 10);
            assert_eq!(snap.get_hits, 10);
            assert_eq!(snap.get_misses, 10);
            assert_eq!(snap.cache_len, 10);
            assert_eq!(snap.capacity, 64);
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn shards_never_exceed_their_capacity(
                capacity in 0usize..40,
                shards in 1usize..6,
                keys in prop::collection::vec(0u16..200, 0..300)
            ) {
                let cache = ShardedCache::lru(capacity, shards);
                for key in keys {
                    cache.put(key, key);
                    prop_assert_eq!(cache.shard_index(&key), cache.shard_index(&key));
                }
                for shard in cache.shards() {
                    prop_assert!(shard.len() <= shard.capacity());
                }
                prop_assert!(cache.len() <= cache.capacity());
            }
        }
    }
}
