//! # Recency Engine (LRU)
//!
//! Evicts the entry that has gone longest without a `get` or `put`.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                           LruCache<K, V>                             │
//!   │                                                                      │
//!   │   parking_lot::Mutex<LruCore<K, V>>                                  │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │  index: FxHashMap<K, SlotId>                                 │   │
//!   │   │  list:  IntrusiveList<Entry { key, value }>                  │   │
//!   │   │                                                              │   │
//!   │   │   front (LRU)                                  back (MRU)    │   │
//!   │   │     ▼                                              ▼         │   │
//!   │   │   [k2] ◄──► [k7] ◄──► [k1] ◄──► [k4] ◄──► [k9]               │   │
//!   │   │   evict                                        new / hit     │   │
//!   │   └──────────────────────────────────────────────────────────────┘   │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The index is the single source of truth for membership; the list only
//! orders what the index holds.
//!
//! ## Operations
//!
//! | Operation  | Effect                                                 |
//! |------------|--------------------------------------------------------|
//! | `insert`   | new key: evict front if full, link at back             |
//! |            | existing key: replace value, relink at back            |
//! | `get`      | hit: relink at back; miss: no structural change        |
//! | `remove`   | unlink and drop                                        |
//! | `pop_lru`  | unlink and return the front entry                      |
//!
//! All operations are O(1) average.
//!
//! ## Example
//!
//! ```
//! use evictkit::policy::lru::LruCache;
//! use evictkit::traits::CachePolicy;
//!
//! let cache = LruCache::new(2);
//! cache.put(1, "a");
//! cache.put(2, "b");
//! assert_eq!(cache.get(&1), Some("a"));
//!
//! cache.put(3, "c"); // evicts 2, the least recently used
//! assert_eq!(cache.get(&2), None);
//! assert_eq!(cache.get(&1), Some("a"));
//! assert_eq!(cache.get(&3), Some("c"));
//! ```
//!
//! ## Thread Safety
//!
//! - [`LruCore`]: not synchronized, for single-threaded use and for
//!   composition inside other engines.
//! - [`LruCache`]: one `parking_lot::Mutex` around the whole core.

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::ds::{IntrusiveList, SlotId};
use crate::error::InvariantError;
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::CoreMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{CoreMetricsRecorder, MetricsSnapshotProvider};
use crate::traits::{CachePolicy, CoreCache, MutableCache};

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

/// Single-threaded LRU core.
pub struct LruCore<K, V> {
    list: IntrusiveList<Entry<K, V>>,
    index: FxHashMap<K, SlotId>,
    capacity: usize,
    #[cfg(feature = "metrics")]
    metrics: CoreMetrics,
}

impl<K, V> LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty core. Capacity 0 makes every insert a no-op.
    pub fn new(capacity: usize) -> Self {
        Self {
            list: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            capacity,
            #[cfg(feature = "metrics")]
            metrics: CoreMetrics::default(),
        }
    }

    /// Inserts or updates `key` and returns the entry evicted to make room.
    pub fn push(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.upsert(key, value).1
    }

    /// Reads `key` without touching its recency.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.list.get(id).map(|entry| &entry.value)
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let entry = self.list.pop_front()?;
        self.index.remove(&entry.key);
        Some((entry.key, entry.value))
    }

    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        self.list.front().map(|entry| (&entry.key, &entry.value))
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.list.iter().map(|entry| &entry.key)
    }

    fn upsert(&mut self, key: K, value: V) -> (Option<V>, Option<(K, V)>) {
        if self.capacity == 0 {
            return (None, None);
        }

        if let Some(&id) = self.index.get(&key) {
            let previous = self
                .list
                .get_mut(id)
                .map(|entry| std::mem::replace(&mut entry.value, value));
            self.list.move_to_back(id);
            #[cfg(feature = "metrics")]
            self.metrics.record_insert_update();
            return (previous, None);
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        let id = self.list.push_back(Entry {
            key: key.clone(),
            value,
        });
        self.index.insert(key, id);
        #[cfg(feature = "metrics")]
        self.metrics.record_insert_new();

        #[cfg(debug_assertions)]
        self.debug_validate();

        (None, evicted)
    }

    fn evict(&mut self) -> Option<(K, V)> {
        let evicted = self.pop_lru()?;
        #[cfg(feature = "metrics")]
        self.metrics.record_evicted_entry();
        trace!(capacity = self.capacity, "lru evicted least recent entry");
        Some(evicted)
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.list.check_invariants()?;
        if self.list.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "lru list holds {} entries but index holds {}",
                self.list.len(),
                self.index.len()
            )));
        }
        if self.index.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "lru holds {} entries over capacity {}",
                self.index.len(),
                self.capacity
            )));
        }
        for (key, &id) in &self.index {
            match self.list.get(id) {
                Some(entry) if entry.key == *key => {},
                _ => return Err(InvariantError::new("lru index points at a foreign slot")),
            }
        }
        Ok(())
    }

    #[cfg(debug_assertions)]
    fn debug_validate(&self) {
        debug_assert_eq!(self.list.len(), self.index.len());
        debug_assert!(self.index.len() <= self.capacity);
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot(self.index.len(), self.capacity)
    }
}

impl<K, V> CoreCache<K, V> for LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.upsert(key, value).0
    }

    fn get(&mut self, key: &K) -> Option<&V> {
        let Some(&id) = self.index.get(key) else {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_miss();
            return None;
        };
        self.list.move_to_back(id);
        #[cfg(feature = "metrics")]
        self.metrics.record_get_hit();
        self.list.get(id).map(|entry| &entry.value)
    }

    fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }
}

impl<K, V> MutableCache<K, V> for LruCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn remove(&mut self, key: &K) -> Option<V> {
        let id = self.index.remove(key)?;
        self.list.remove(id).map(|entry| entry.value)
    }
}

impl<K, V> fmt::Debug for LruCore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCore")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Thread-safe LRU cache: one mutex around an [`LruCore`].
pub struct LruCache<K, V> {
    inner: Mutex<LruCore<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCore::new(capacity)),
        }
    }

    /// Deletes `key` unconditionally, returning its value if it was cached.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove(key)
    }

    /// Reads `key` without touching its recency.
    pub fn peek(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.lock().peek(key).cloned()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

impl<K, V> CachePolicy<K, V> for LruCache<K, V>
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
impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.inner.lock().metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("inner", &*self.inner.lock())
            .finish()
    }
}
