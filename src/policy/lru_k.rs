//! # History-Gated Recency Engine (LRU-K admission)
//!
//! A key only enters the main cache after it has been observed `k` times.
//! Until then its accesses are counted in a bounded history ledger and the
//! most recent value written for it waits in a pending map.
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ LrukCache<K, V>          one parking_lot::Mutex over all three parts │
//!   │                                                                      │
//!   │   main:    LruCore<K, V>       admitted entries, capacity C          │
//!   │   history: LruCore<K, usize>   access counts, capacity H             │
//!   │   pending: FxHashMap<K, V>     last value written before admission   │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   put(k, v), k not in main            get(k)
//!   ─────────────────────────           ─────────────────────────────────
//!   count = history[k] + 1              hit   = main.get(k)
//!   count >= K ?                        count = history[k] + 1
//!     yes → main.insert(k, v)           hit ? → return it
//!           drop history/pending        count >= K and pending[k] ?
//!     no  → pending[k] = v                → admit pending value, return it
//!                                       else miss
//! ```
//!
//! The history ledger is itself a recency engine; when it forgets a key the
//! pending value for that key is dropped too, so pending values never
//! outnumber history entries.
//!
//! A `get` for a key that was never `put` only ever counts history. It keeps
//! missing no matter how often it is repeated, because there is no value to
//! admit.
//!
//! ```
//! use evictkit::policy::lru_k::LrukCache;
//! use evictkit::traits::CachePolicy;
//!
//! let cache = LrukCache::new(8, 32, 2);
//! cache.put("page", 1);
//! assert!(!cache.contains(&"page"));   // seen once, still pending
//! assert_eq!(cache.get(&"page"), Some(1)); // second access admits it
//! assert!(cache.contains(&"page"));
//! ```

use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::LrukMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{CoreMetricsRecorder, LrukMetricsRecorder, MetricsSnapshotProvider};
use crate::policy::lru::LruCore;
use crate::traits::{CachePolicy, CoreCache, MutableCache};

/// Admission threshold used when none is given.
pub const DEFAULT_K: usize = 2;

/// Single-threaded state of the history-gated engine.
pub struct LrukCore<K, V> {
    main: LruCore<K, V>,
    history: LruCore<K, usize>,
    pending: FxHashMap<K, V>,
    k: usize,
    #[cfg(feature = "metrics")]
    metrics: LrukMetrics,
}

impl<K, V> LrukCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// `k` below 1 is raised to 1.
    pub fn new(capacity: usize, history_capacity: usize, k: usize) -> Self {
        Self {
            main: LruCore::new(capacity),
            history: LruCore::new(history_capacity),
            pending: FxHashMap::default(),
            k: k.max(1),
            #[cfg(feature = "metrics")]
            metrics: LrukMetrics::default(),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn history_capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Accesses recorded for `key` since it last left the history ledger.
    pub fn history_count(&self, key: &K) -> Option<usize> {
        self.history.peek(key).copied()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Writes `key`; admits it to the main cache once it has `k` accesses.
    pub fn put(&mut self, key: K, value: V) {
        if self.main.capacity() == 0 {
            return;
        }

        if self.main.contains(&key) {
            self.main.insert(key, value);
            #[cfg(feature = "metrics")]
            self.metrics.record_insert_update();
            return;
        }

        let count = self.record_access(&key);
        if count >= self.k {
            self.history.remove(&key);
            self.pending.remove(&key);
            self.admit(key, value);
        } else if self.history.contains(&key) {
            self.pending.insert(key, value);
        }
    }

    /// Reads `key`, counting the access and admitting a pending value that
    /// has reached `k` accesses.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if self.main.capacity() == 0 {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_miss();
            return None;
        }

        let hit = self.main.get(key).is_some();
        let count = self.record_access(key);

        if hit {
            #[cfg(feature = "metrics")]
            self.metrics.record_get_hit();
            return self.main.peek(key);
        }

        if count >= self.k
            && let Some(value) = self.pending.remove(key)
        {
            self.history.remove(key);
            self.admit(key.clone(), value);
            #[cfg(feature = "metrics")]
            self.metrics.record_get_hit();
            return self.main.peek(key);
        }

        #[cfg(feature = "metrics")]
        self.metrics.record_get_miss();
        None
    }

    pub fn contains(&self, key: &K) -> bool {
        self.main.contains(key)
    }

    pub fn len(&self) -> usize {
        self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.main.capacity()
    }

    pub fn clear(&mut self) {
        self.main.clear();
        self.history.clear();
        self.pending.clear();
        #[cfg(feature = "metrics")]
        self.metrics.record_clear();
    }

    fn record_access(&mut self, key: &K) -> usize {
        let count = self
            .history
            .peek(key)
            .copied()
            .unwrap_or(0)
            .saturating_add(1);
        if let Some((forgotten, _)) = self.history.push(key.clone(), count) {
            self.pending.remove(&forgotten);
            #[cfg(feature = "metrics")]
            self.metrics.record_history_eviction();
        }
        count
    }

    fn admit(&mut self, key: K, value: V) {
        let evicted = self.main.push(key, value);
        #[cfg(feature = "metrics")]
        {
            self.metrics.record_admission();
            self.metrics.record_insert_new();
            if evicted.is_some() {
                self.metrics.record_evicted_entry();
            }
        }
        trace!(
            k = self.k,
            evicted = evicted.is_some(),
            "lru-k admitted key to main cache"
        );
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.main.check_invariants()?;
        self.history.check_invariants()?;
        for key in self.pending.keys() {
            if !self.history.contains(key) {
                return Err(InvariantError::new("pending value without a history record"));
            }
            if self.main.contains(key) {
                return Err(InvariantError::new("key is both admitted and pending"));
            }
        }
        Ok(())
    }

    #[cfg(feature = "metrics")]
    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        self.metrics.snapshot(self.main.len(), self.main.capacity())
    }
}

impl<K, V> fmt::Debug for LrukCore<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LrukCore")
            .field("main", &self.main)
            .field("history", &self.history)
            .field("pending", &self.pending.len())
            .field("k", &self.k)
            .finish()
    }
}

/// Thread-safe history-gated cache.
pub struct LrukCache<K, V> {
    inner: Mutex<LrukCore<K, V>>,
}

impl<K, V> LrukCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates the cache; `k` below 1 is raised to 1.
    pub fn new(capacity: usize, history_capacity: usize, k: usize) -> Self {
        Self {
            inner: Mutex::new(LrukCore::new(capacity, history_capacity, k)),
        }
    }

    /// Rejects `k == 0`, and an empty history ledger when `k > 1` since no
    /// key could ever be admitted.
    pub fn try_new(capacity: usize, history_capacity: usize, k: usize) -> Result<Self, ConfigError> {
        if k == 0 {
            return Err(ConfigError::zero("k"));
        }
        if k > 1 && history_capacity == 0 {
            return Err(ConfigError::new(
                "history_capacity",
                "must be at least 1 when k > 1",
            ));
        }
        Ok(Self::new(capacity, history_capacity, k))
    }

    pub fn k(&self) -> usize {
        self.inner.lock().k()
    }

    pub fn history_count(&self, key: &K) -> Option<usize> {
        self.inner.lock().history_count(key)
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending_len()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.lock().check_invariants()
    }
}

impl<K, V> CachePolicy<K, V> for LrukCache<K, V>
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
impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for LrukCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        self.inner.lock().metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for LrukCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LrukCache")
            .field("inner", &*self.inner.lock())
            .finish()
    }
}
