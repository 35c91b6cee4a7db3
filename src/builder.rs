//! Unified cache builder for every eviction policy.
//!
//! Picks an engine at runtime and hides it behind one [`Cache`] type, with
//! optional sharding on top.
//!
//! ## Example
//!
//! ```rust
//! use evictkit::builder::{CacheBuilder, PolicyKind};
//! use evictkit::traits::CachePolicy;
//!
//! let cache = CacheBuilder::new(100).build::<u64, String>(PolicyKind::Lru);
//! cache.put(1, "hello".to_string());
//! assert_eq!(cache.get(&1), Some("hello".to_string()));
//!
//! let sharded = CacheBuilder::new(1024)
//!     .shards(8)
//!     .build::<u64, String>(PolicyKind::Arc { transform_threshold: 2 });
//! assert_eq!(sharded.shard_count(), 8);
//! ```

use std::fmt;
use std::hash::Hash;

use tracing::debug;

use crate::ds::resolve_shard_count;
use crate::error::ConfigError;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CacheMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::MetricsSnapshotProvider;
use crate::policy::arc::{ArcCache, DEFAULT_TRANSFORM_THRESHOLD};
use crate::policy::lfu::{DEFAULT_MAX_AVERAGE_FREQUENCY, LfuCache};
use crate::policy::lru::LruCache;
use crate::policy::lru_k::{DEFAULT_K, LrukCache};
use crate::policy::sharded::{ShardedCache, per_shard_capacity};
use crate::traits::CachePolicy;

/// Available eviction policies and their tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Least recently used.
    Lru,
    /// LRU with admission after `k` observed accesses.
    LruK { history_capacity: usize, k: usize },
    /// Least frequently used, aged once the average frequency passes the ceiling.
    Lfu { max_average_frequency: u64 },
    /// Adaptive recency/frequency hybrid.
    Arc { transform_threshold: usize },
}

impl PolicyKind {
    /// LRU-K with `k = 2` and a history ledger of `history_capacity` keys.
    pub fn lru_k(history_capacity: usize) -> Self {
        Self::LruK {
            history_capacity,
            k: DEFAULT_K,
        }
    }

    pub fn lfu() -> Self {
        Self::Lfu {
            max_average_frequency: DEFAULT_MAX_AVERAGE_FREQUENCY,
        }
    }

    pub fn arc() -> Self {
        Self::Arc {
            transform_threshold: DEFAULT_TRANSFORM_THRESHOLD,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Lru => "lru",
            Self::LruK { .. } => "lru_k",
            Self::Lfu { .. } => "lfu",
            Self::Arc { .. } => "arc",
        }
    }

    /// Rejects parameters the lenient constructors would silently clamp.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Lru => Ok(()),
            Self::LruK {
                history_capacity,
                k,
            } => {
                if k == 0 {
                    return Err(ConfigError::zero("k"));
                }
                if k > 1 && history_capacity == 0 {
                    return Err(ConfigError::new(
                        "history_capacity",
                        "must be at least 1 when k > 1",
                    ));
                }
                Ok(())
            },
            Self::Lfu {
                max_average_frequency,
            } => {
                if max_average_frequency == 0 {
                    return Err(ConfigError::zero("max_average_frequency"));
                }
                Ok(())
            },
            Self::Arc {
                transform_threshold,
            } => {
                if transform_threshold == 0 {
                    return Err(ConfigError::zero("transform_threshold"));
                }
                Ok(())
            },
        }
    }
}

/// One unsharded engine of any policy.
pub enum Engine<K, V> {
    Lru(LruCache<K, V>),
    LruK(LrukCache<K, V>),
    Lfu(LfuCache<K, V>),
    Arc(ArcCache<K, V>),
}

impl<K, V> Engine<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// `history_capacity` for LRU-K is taken as given.
    pub fn new(capacity: usize, policy: PolicyKind) -> Self {
        match policy {
            PolicyKind::Lru => Self::Lru(LruCache::new(capacity)),
            PolicyKind::LruK {
                history_capacity,
                k,
            } => Self::LruK(LrukCache::new(capacity, history_capacity, k)),
            PolicyKind::Lfu {
                max_average_frequency,
            } => Self::Lfu(LfuCache::with_max_average(capacity, max_average_frequency)),
            PolicyKind::Arc {
                transform_threshold,
            } => Self::Arc(ArcCache::with_threshold(capacity, transform_threshold)),
        }
    }

    /// Only the recency engine supports deletion; others return `None`.
    pub fn remove(&self, key: &K) -> Option<V> {
        match self {
            Self::Lru(lru) => lru.remove(key),
            _ => None,
        }
    }
}

impl<K, V> CachePolicy<K, V> for Engine<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn put(&self, key: K, value: V) {
        match self {
            Self::Lru(lru) => lru.put(key, value),
            Self::LruK(lruk) => lruk.put(key, value),
            Self::Lfu(lfu) => lfu.put(key, value),
            Self::Arc(arc) => arc.put(key, value),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        match self {
            Self::Lru(lru) => lru.get(key),
            Self::LruK(lruk) => lruk.get(key),
            Self::Lfu(lfu) => lfu.get(key),
            Self::Arc(arc) => arc.get(key),
        }
    }

    fn contains(&self, key: &K) -> bool {
        match self {
            Self::Lru(lru) => lru.contains(key),
            Self::LruK(lruk) => lruk.contains(key),
            Self::Lfu(lfu) => lfu.contains(key),
            Self::Arc(arc) => arc.contains(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Lru(lru) => lru.len(),
            Self::LruK(lruk) => lruk.len(),
            Self::Lfu(lfu) => lfu.len(),
            Self::Arc(arc) => arc.len(),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            Self::Lru(lru) => lru.capacity(),
            Self::LruK(lruk) => lruk.capacity(),
            Self::Lfu(lfu) => lfu.capacity(),
            Self::Arc(arc) => arc.capacity(),
        }
    }

    fn clear(&self) {
        match self {
            Self::Lru(lru) => lru.clear(),
            Self::LruK(lruk) => lruk.clear(),
            Self::Lfu(lfu) => lfu.clear(),
            Self::Arc(arc) => arc.clear(),
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for Engine<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        match self {
            Self::Lru(lru) => lru.snapshot(),
            Self::LruK(lruk) => lruk.snapshot(),
            Self::Lfu(lfu) => lfu.snapshot(),
            Self::Arc(arc) => arc.snapshot(),
        }
    }
}

impl<K, V> fmt::Debug for Engine<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lru(lru) => fmt::Debug::fmt(lru, f),
            Self::LruK(lruk) => fmt::Debug::fmt(lruk, f),
            Self::Lfu(lfu) => fmt::Debug::fmt(lfu, f),
            Self::Arc(arc) => fmt::Debug::fmt(arc, f),
        }
    }
}

/// Cache wrapper that presents the same surface regardless of policy or sharding.
pub struct Cache<K, V> {
    inner: CacheInner<K, V>,
    policy: PolicyKind,
}

enum CacheInner<K, V> {
    Single(Engine<K, V>),
    Sharded(ShardedCache<Engine<K, V>>),
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn policy(&self) -> PolicyKind {
        self.policy
    }

    /// 1 when unsharded.
    pub fn shard_count(&self) -> usize {
        match &self.inner {
            CacheInner::Single(_) => 1,
            CacheInner::Sharded(sharded) => sharded.shard_count(),
        }
    }

    /// Deletes `key`; only LRU caches support this, others return `None`.
    pub fn remove(&self, key: &K) -> Option<V> {
        match &self.inner {
            CacheInner::Single(engine) => engine.remove(key),
            CacheInner::Sharded(sharded) => {
                let shard = sharded.shard(sharded.shard_index(key))?;
                shard.remove(key)
            },
        }
    }
}

impl<K, V> CachePolicy<K, V> for Cache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn put(&self, key: K, value: V) {
        match &self.inner {
            CacheInner::Single(engine) => engine.put(key, value),
            CacheInner::Sharded(sharded) => sharded.put(key, value),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        match &self.inner {
            CacheInner::Single(engine) => engine.get(key),
            CacheInner::Sharded(sharded) => sharded.get(key),
        }
    }

    fn contains(&self, key: &K) -> bool {
        match &self.inner {
            CacheInner::Single(engine) => engine.contains(key),
            CacheInner::Sharded(sharded) => sharded.contains(key),
        }
    }

    fn len(&self) -> usize {
        match &self.inner {
            CacheInner::Single(engine) => engine.len(),
            CacheInner::Sharded(sharded) => sharded.len(),
        }
    }

    fn capacity(&self) -> usize {
        match &self.inner {
            CacheInner::Single(engine) => engine.capacity(),
            CacheInner::Sharded(sharded) => sharded.capacity(),
        }
    }

    fn clear(&self) {
        match &self.inner {
            CacheInner::Single(engine) => engine.clear(),
            CacheInner::Sharded(sharded) => sharded.clear(),
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<CacheMetricsSnapshot> for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn snapshot(&self) -> CacheMetricsSnapshot {
        match &self.inner {
            CacheInner::Single(engine) => engine.snapshot(),
            CacheInner::Sharded(sharded) => sharded.snapshot(),
        }
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Cache");
        s.field("policy", &self.policy);
        match &self.inner {
            CacheInner::Single(engine) => s.field("engine", engine),
            CacheInner::Sharded(sharded) => s.field("sharded", sharded),
        };
        s.finish()
    }
}

/// Builder for [`Cache`] instances.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    capacity: usize,
    shards: Option<usize>,
}

impl CacheBuilder {
    /// Capacity 0 builds a cache that drops every write.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            shards: None,
        }
    }

    /// Splits the cache over `shards` engines; 0 uses the hardware parallelism hint.
    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = Some(shards);
        self
    }

    /// Builds the cache, clamping out-of-range tuning parameters.
    ///
    /// # Example
    ///
    /// ```rust
    /// use evictkit::builder::{CacheBuilder, PolicyKind};
    /// use evictkit::traits::CachePolicy;
    ///
    /// let lru = CacheBuilder::new(100).build::<u64, String>(PolicyKind::Lru);
    /// let lru_k = CacheBuilder::new(100).build::<u64, String>(PolicyKind::lru_k(400));
    /// let lfu = CacheBuilder::new(100).build::<u64, String>(PolicyKind::lfu());
    /// assert_eq!(lfu.capacity(), 100);
    /// ```
    pub fn build<K, V>(self, policy: PolicyKind) -> Cache<K, V>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        let inner = match self.shards {
            None => CacheInner::Single(Engine::new(self.capacity, policy)),
            Some(requested) => {
                let shard_count = resolve_shard_count(requested);
                let per_shard_policy = match policy {
                    PolicyKind::LruK {
                        history_capacity,
                        k,
                    } => PolicyKind::LruK {
                        history_capacity: per_shard_capacity(history_capacity, shard_count),
                        k,
                    },
                    other => other,
                };
                CacheInner::Sharded(ShardedCache::with_factory(
                    self.capacity,
                    shard_count,
                    |capacity| Engine::new(capacity, per_shard_policy),
                ))
            },
        };
        debug!(
            policy = policy.name(),
            capacity = self.capacity,
            shards = ?self.shards,
            "cache built"
        );
        Cache { inner, policy }
    }

    /// Like [`build`](Self::build), but rejects out-of-range tuning parameters.
    pub fn try_build<K, V>(self, policy: PolicyKind) -> Result<Cache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone,
        V: Clone,
    {
        policy.validate()?;
        Ok(self.build(policy))
    }
}
