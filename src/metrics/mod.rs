//! Hit/miss and policy-specific counters, compiled in with the `metrics` feature.

pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use snapshot::CacheMetricsSnapshot;
pub use traits::MetricsSnapshotProvider;
