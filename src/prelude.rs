pub use crate::builder::{Cache, CacheBuilder, PolicyKind};
pub use crate::ds::{FrequencyBuckets, GhostList, IntrusiveList, ShardSelector, SlotArena, SlotId};
pub use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::{CacheMetricsSnapshot, MetricsSnapshotProvider};
pub use crate::policy::arc::{ArcCache, ArcCore};
pub use crate::policy::lfu::{LfuCache, LfuCore};
pub use crate::policy::lru::{LruCache, LruCore};
pub use crate::policy::lru_k::{LrukCache, LrukCore};
pub use crate::policy::sharded::{
    ShardedArcCache, ShardedCache, ShardedLfuCache, ShardedLruCache, ShardedLrukCache,
};
pub use crate::traits::{CachePolicy, CoreCache, MutableCache};
