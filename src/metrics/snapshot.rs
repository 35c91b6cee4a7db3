/// Counters copied out of an engine at one instant.
///
/// Policy-specific counters stay at zero for engines that never record them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub get_calls: u64,
    pub get_hits: u64,
    pub get_misses: u64,

    pub insert_new: u64,
    pub insert_updates: u64,
    pub evicted_entries: u64,
    pub clears: u64,

    // frequency engine
    pub aging_passes: u64,

    // history-gated engine
    pub admissions: u64,
    pub history_evictions: u64,

    // adaptive hybrid engine
    pub recency_ghost_hits: u64,
    pub frequency_ghost_hits: u64,
    pub capacity_shifts: u64,
    pub promotions: u64,

    // gauges captured at snapshot time
    pub cache_len: usize,
    pub capacity: usize,
}

impl CacheMetricsSnapshot {
    /// Fraction of `get` calls that hit; 0.0 before the first call.
    pub fn hit_rate(&self) -> f64 {
        if self.get_calls == 0 {
            0.0
        } else {
            self.get_hits as f64 / self.get_calls as f64
        }
    }

    /// Adds `other` into `self`, counters and gauges alike.
    pub fn merge(&mut self, other: &Self) {
        self.get_calls += other.get_calls;
        self.get_hits += other.get_hits;
        self.get_misses += other.get_misses;
        self.insert_new += other.insert_new;
        self.insert_updates += other.insert_updates;
        self.evicted_entries += other.evicted_entries;
        self.clears += other.clears;
        self.aging_passes += other.aging_passes;
        self.admissions += other.admissions;
        self.history_evictions += other.history_evictions;
        self.recency_ghost_hits += other.recency_ghost_hits;
        self.frequency_ghost_hits += other.frequency_ghost_hits;
        self.capacity_shifts += other.capacity_shifts;
        self.promotions += other.promotions;
        self.cache_len += other.cache_len;
        self.capacity += other.capacity;
    }
}
