//! Eviction engines.
//!
//! | Module       | Engine          | Evicts                                   |
//! |--------------|-----------------|------------------------------------------|
//! | [`lru`]      | `LruCache`      | least recently used                      |
//! | [`lru_k`]    | `LrukCache`     | least recently used, admits after K hits |
//! | [`lfu`]      | `LfuCache`      | least frequently used, with aging        |
//! | [`arc`]      | `ArcCache`      | adaptive recency/frequency split         |
//! | [`sharded`]  | `ShardedCache`  | whatever its shards evict                |

pub mod arc;
pub mod lfu;
pub mod lru;
pub mod lru_k;
pub mod sharded;
