//! evictkit: in-process key/value caches with interchangeable eviction policies.
//!
//! Every engine implements [`traits::CachePolicy`], so callers can swap
//! recency, history-gated, frequency and adaptive eviction without touching
//! call sites. [`policy::sharded::ShardedCache`] spreads any engine over
//! independently locked shards, and [`builder::CacheBuilder`] picks an
//! engine at runtime.

pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod traits;
