//! Recorder and snapshot traits.
//!
//! Recording and reading are kept apart: engines hold a metrics struct and
//! call `record_*` on their hot paths; callers only ever see a
//! [`CacheMetricsSnapshot`](crate::metrics::snapshot::CacheMetricsSnapshot)
//! taken through [`MetricsSnapshotProvider`].
//!
//! ```text
//!                    ┌─────────────────────┐
//!                    │ CoreMetricsRecorder │
//!                    │ hit/miss/insert/    │
//!                    │ evict/clear         │
//!                    └──────────┬──────────┘
//!          ┌────────────────────┼────────────────────┐
//!          ▼                    ▼                    ▼
//!   ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//!   │ Lfu         │     │ LruK         │     │ Arc          │
//!   │ aging pass  │     │ admission    │     │ ghost hits   │
//!   │             │     │ history evict│     │ shifts       │
//!   └─────────────┘     └──────────────┘     └──────────────┘
//! ```

/// Counters every engine records.
pub trait CoreMetricsRecorder {
    fn record_get_hit(&mut self);
    fn record_get_miss(&mut self);
    fn record_insert_new(&mut self);
    fn record_insert_update(&mut self);
    fn record_evicted_entry(&mut self);
    fn record_clear(&mut self);
}

/// Frequency engine signals.
pub trait LfuMetricsRecorder: CoreMetricsRecorder {
    fn record_aging_pass(&mut self);
}

/// History-gated engine signals.
pub trait LrukMetricsRecorder: CoreMetricsRecorder {
    fn record_admission(&mut self);
    fn record_history_eviction(&mut self);
}

/// Adaptive hybrid engine signals.
pub trait ArcMetricsRecorder: CoreMetricsRecorder {
    fn record_recency_ghost_hit(&mut self);
    fn record_frequency_ghost_hit(&mut self);
    fn record_capacity_shift(&mut self);
    fn record_promotion(&mut self);
}

/// Point-in-time copy of an engine's counters.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}
