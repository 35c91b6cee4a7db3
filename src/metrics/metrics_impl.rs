use crate::metrics::snapshot::CacheMetricsSnapshot;
use crate::metrics::traits::{
    ArcMetricsRecorder, CoreMetricsRecorder, LfuMetricsRecorder, LrukMetricsRecorder,
};

#[derive(Debug, Default, Clone)]
pub struct CoreMetrics {
    pub get_hits: u64,
    pub get_misses: u64,
    pub insert_new: u64,
    pub insert_updates: u64,
    pub evicted_entries: u64,
    pub clears: u64,
}

impl CoreMetrics {
    pub fn snapshot(&self, cache_len: usize, capacity: usize) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            get_calls: self.get_hits + self.get_misses,
            get_hits: self.get_hits,
            get_misses: self.get_misses,
            insert_new: self.insert_new,
            insert_updates: self.insert_updates,
            evicted_entries: self.evicted_entries,
            clears: self.clears,
            cache_len,
            capacity,
            ..CacheMetricsSnapshot::default()
        }
    }
}

impl CoreMetricsRecorder for CoreMetrics {
    fn record_get_hit(&mut self) {
        self.get_hits += 1;
    }

    fn record_get_miss(&mut self) {
        self.get_misses += 1;
    }

    fn record_insert_new(&mut self) {
        self.insert_new += 1;
    }

    fn record_insert_update(&mut self) {
        self.insert_updates += 1;
    }

    fn record_evicted_entry(&mut self) {
        self.evicted_entries += 1;
    }

    fn record_clear(&mut self) {
        self.clears += 1;
    }
}

/// Forwards the core counters of a policy metrics struct to its `core` field.
macro_rules! delegate_core_recorder {
    ($ty:ty) => {
        impl CoreMetricsRecorder for $ty {
            fn record_get_hit(&mut self) {
                self.core.record_get_hit();
            }

            fn record_get_miss(&mut self) {
                self.core.record_get_miss();
            }

            fn record_insert_new(&mut self) {
                self.core.record_insert_new();
            }

            fn record_insert_update(&mut self) {
                self.core.record_insert_update();
            }

            fn record_evicted_entry(&mut self) {
                self.core.record_evicted_entry();
            }

            fn record_clear(&mut self) {
                self.core.record_clear();
            }
        }
    };
}

#[derive(Debug, Default, Clone)]
pub struct LfuMetrics {
    pub core: CoreMetrics,
    pub aging_passes: u64,
}

delegate_core_recorder!(LfuMetrics);

impl LfuMetricsRecorder for LfuMetrics {
    fn record_aging_pass(&mut self) {
        self.aging_passes += 1;
    }
}

impl LfuMetrics {
    pub fn snapshot(&self, cache_len: usize, capacity: usize) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            aging_passes: self.aging_passes,
            ..self.core.snapshot(cache_len, capacity)
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct LrukMetrics {
    pub core: CoreMetrics,
    pub admissions: u64,
    pub history_evictions: u64,
}

delegate_core_recorder!(LrukMetrics);

impl LrukMetricsRecorder for LrukMetrics {
    fn record_admission(&mut self) {
        self.admissions += 1;
    }

    fn record_history_eviction(&mut self) {
        self.history_evictions += 1;
    }
}

impl LrukMetrics {
    pub fn snapshot(&self, cache_len: usize, capacity: usize) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            admissions: self.admissions,
            history_evictions: self.history_evictions,
            ..self.core.snapshot(cache_len, capacity)
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ArcMetrics {
    pub core: CoreMetrics,
    pub recency_ghost_hits: u64,
    pub frequency_ghost_hits: u64,
    pub capacity_shifts: u64,
    pub promotions: u64,
}

delegate_core_recorder!(ArcMetrics);

impl ArcMetricsRecorder for ArcMetrics {
    fn record_recency_ghost_hit(&mut self) {
        self.recency_ghost_hits += 1;
    }

    fn record_frequency_ghost_hit(&mut self) {
        self.frequency_ghost_hits += 1;
    }

    fn record_capacity_shift(&mut self) {
        self.capacity_shifts += 1;
    }

    fn record_promotion(&mut self) {
        self.promotions += 1;
    }
}

impl ArcMetrics {
    pub fn snapshot(&self, cache_len: usize, capacity: usize) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            recency_ghost_hits: self.recency_ghost_hits,
            frequency_ghost_hits: self.frequency_ghost_hits,
            capacity_shifts: self.capacity_shifts,
            promotions: self.promotions,
            ..self.core.snapshot(cache_len, capacity)
        }
    }
}
