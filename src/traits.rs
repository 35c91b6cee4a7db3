//! Cache traits shared by every engine.
//!
//! Two layers, split by who owns the synchronization:
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │ CachePolicy<K, V>: Send + Sync          (&self, internally locked)│
//!   │   put / get / get_or_default / contains / len / capacity / clear │
//!   │                                                                  │
//!   │   LruCache   LrukCache   LfuCache   ArcCache   ShardedCache<C>   │
//!   └──────────────────────────────┬───────────────────────────────────┘
//!                                  │ each wraps one lock around
//!                                  ▼
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │ CoreCache<K, V> / MutableCache<K, V>     (&mut self, unlocked)   │
//!   │                                                                  │
//!   │   LruCore                LfuCore                                 │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cores are plain single-threaded structures; engines compose them (the
//! history-gated engine holds two [`LruCore`](crate::policy::lru::LruCore)s)
//! without taking nested locks. [`CachePolicy`] is the uniform surface that
//! callers and [`ShardedCache`](crate::policy::sharded::ShardedCache) program
//! against.
//!
//! ```
//! use evictkit::policy::lru::LruCache;
//! use evictkit::traits::CachePolicy;
//!
//! fn warm<C: CachePolicy<u64, String>>(cache: &C, rows: &[(u64, &str)]) {
//!     for (id, row) in rows {
//!         cache.put(*id, row.to_string());
//!     }
//! }
//!
//! let cache = LruCache::new(8);
//! warm(&cache, &[(1, "a"), (2, "b")]);
//! assert_eq!(cache.get(&1), Some("a".to_string()));
//! assert_eq!(cache.get_or_default(&9), String::new());
//! ```

/// Single-threaded cache operations.
pub trait CoreCache<K, V> {
    /// Inserts or updates `key`, returning the previous value on update.
    ///
    /// With capacity 0 this is a no-op that returns `None`.
    fn insert(&mut self, key: K, value: V) -> Option<V>;

    /// Looks up `key`, recording the access with the policy.
    fn get(&mut self, key: &K) -> Option<&V>;

    /// Index lookup only; does not count as an access.
    fn contains(&self, key: &K) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    fn clear(&mut self);
}

/// Cores that support explicit deletion.
pub trait MutableCache<K, V>: CoreCache<K, V> {
    fn remove(&mut self, key: &K) -> Option<V>;

    fn remove_batch(&mut self, keys: &[K]) -> Vec<Option<V>> {
        keys.iter().map(|key| self.remove(key)).collect()
    }
}

/// Thread-safe cache surface implemented by every engine.
///
/// All methods take `&self`; each implementation serializes access with its
/// own lock. `get` clones the value out so no guard outlives the call.
pub trait CachePolicy<K, V>: Send + Sync {
    /// Inserts or updates `key`. Never fails; capacity 0 drops the write.
    fn put(&self, key: K, value: V);

    /// Returns a clone of the cached value, or `None` on a miss.
    fn get(&self, key: &K) -> Option<V>;

    /// Like [`get`](Self::get) but yields `V::default()` on a miss.
    fn get_or_default(&self, key: &K) -> V
    where
        V: Default,
    {
        self.get(key).unwrap_or_default()
    }

    fn contains(&self, key: &K) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Drops every live entry and any eviction history.
    fn clear(&self);
}
