//! Frequency-bucketed key tracker with O(1) touch and O(1) min eviction.
//!
//! Keys are grouped by access frequency. Each frequency owns a FIFO bucket,
//! and non-empty buckets are chained in ascending frequency order so the
//! minimum never has to be searched for.
//!
//! ## Architecture
//!
//! ```text
//!   buckets: FxHashMap<u64, Bucket>          entries: SlotArena<Entry<K>>
//!
//!   min_freq = 1
//!       │
//!       ▼
//!   ┌────────┐  next   ┌────────┐  next   ┌────────┐
//!   │ freq 1 │ ──────► │ freq 3 │ ──────► │ freq 8 │
//!   │ [a, d] │ ◄────── │  [b]   │ ◄────── │ [c, e] │
//!   └────────┘  prev   └────────┘  prev   └────────┘
//!     head=a             head=b             head=c
//!     (oldest)                              (oldest)
//! ```
//!
//! - `insert(k)`: appends `k` to bucket 1, `min_freq = 1`
//! - `touch(k)`: moves `k` from bucket `f` to the tail of bucket `f + 1`
//! - `pop_min()`: removes the head (oldest arrival) of the `min_freq` bucket
//! - `age_by(delta)`: O(n) pass lowering every frequency by `delta`, floored at 1
//!
//! Within one bucket the eviction order is arrival order at that frequency,
//! not recency.
//!
//! ## Invariants
//! - Every entry sits in the bucket whose key equals its frequency.
//! - No bucket in the map is empty.
//! - `min_freq` is the smallest bucket key, or 0 when empty.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

#[derive(Debug)]
struct Entry<K> {
    prev: Option<SlotId>,
    next: Option<SlotId>,
    freq: u64,
    key: K,
}

#[derive(Debug, Default)]
struct Bucket {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    prev: Option<u64>,
    next: Option<u64>,
}

/// Frequency tracker with FIFO tie-breaking inside each frequency.
///
/// ```
/// use evictkit::ds::FrequencyBuckets;
///
/// let mut freq = FrequencyBuckets::new();
/// freq.insert("a");
/// freq.insert("b");
/// freq.touch(&"a");
///
/// assert_eq!(freq.frequency(&"a"), Some(2));
/// assert_eq!(freq.min_freq(), Some(1));
/// assert_eq!(freq.pop_min(), Some(("b", 1)));
/// ```
#[derive(Debug)]
pub struct FrequencyBuckets<K> {
    entries: SlotArena<Entry<K>>,
    index: FxHashMap<K, SlotId>,
    buckets: FxHashMap<u64, Bucket>,
    min_freq: u64,
}

impl<K> FrequencyBuckets<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            entries: SlotArena::new(),
            index: FxHashMap::default(),
            buckets: FxHashMap::default(),
            min_freq: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: SlotArena::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            buckets: FxHashMap::default(),
            min_freq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn frequency(&self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        self.entries.get(id).map(|entry| entry.freq)
    }

    /// Lowest occupied frequency, `None` when empty.
    pub fn min_freq(&self) -> Option<u64> {
        (self.min_freq != 0).then_some(self.min_freq)
    }

    /// Next eviction candidate without removing it.
    pub fn peek_min(&self) -> Option<(&K, u64)> {
        let id = self.buckets.get(&self.min_freq)?.head?;
        self.entries.get(id).map(|entry| (&entry.key, entry.freq))
    }

    /// Sum of all tracked frequencies. O(n).
    pub fn total_frequency(&self) -> u64 {
        self.entries.iter().map(|(_, entry)| entry.freq).sum()
    }

    /// Starts tracking `key` at frequency 1; returns `false` if already tracked.
    pub fn insert(&mut self, key: K) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }

        let id = self.entries.insert(Entry {
            prev: None,
            next: None,
            freq: 1,
            key: key.clone(),
        });
        self.index.insert(key, id);

        if !self.buckets.contains_key(&1) {
            let next = (self.min_freq != 0).then_some(self.min_freq);
            self.insert_bucket(1, None, next);
        }
        self.list_push_back(1, id);
        self.min_freq = 1;
        true
    }

    /// Bumps `key` by one and returns its new frequency.
    pub fn touch(&mut self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        let current = self.entries.get(id)?.freq;
        let Some(next_freq) = current.checked_add(1) else {
            return Some(current);
        };

        let (prev_existing, next_existing) = {
            let bucket = self.buckets.get(&current)?;
            (bucket.prev, bucket.next)
        };

        self.list_remove(current, id)?;
        let emptied = self.bucket_is_empty(current);
        if emptied {
            self.remove_bucket(current, prev_existing, next_existing);
        }

        if !self.buckets.contains_key(&next_freq) {
            let prev = if emptied { prev_existing } else { Some(current) };
            self.insert_bucket(next_freq, prev, next_existing);
        }

        if let Some(entry) = self.entries.get_mut(id) {
            entry.freq = next_freq;
        }
        self.list_push_back(next_freq, id);

        if emptied && self.min_freq == current {
            self.min_freq = next_freq;
        }
        Some(next_freq)
    }

    /// Stops tracking `key` and returns its last frequency.
    pub fn remove(&mut self, key: &K) -> Option<u64> {
        let id = *self.index.get(key)?;
        let freq = self.entries.get(id)?.freq;
        self.unlink(freq, id)?;
        self.index.remove(key);
        self.entries.remove(id).map(|entry| entry.freq)
    }

    /// Removes the oldest entry of the lowest frequency.
    pub fn pop_min(&mut self) -> Option<(K, u64)> {
        let freq = self.min_freq;
        let id = self.buckets.get(&freq)?.head?;
        self.unlink(freq, id)?;
        let entry = self.entries.remove(id)?;
        self.index.remove(&entry.key);
        Some((entry.key, entry.freq))
    }

    /// Lowers every frequency by `delta` (floor 1) and returns the new total.
    ///
    /// Entries are re-bucketed in ascending old-frequency order, arrival order
    /// within a bucket preserved, so entries that merge into one bucket keep
    /// the colder ones closer to eviction.
    pub fn age_by(&mut self, delta: u64) -> u64 {
        let mut ordered = Vec::with_capacity(self.len());
        let mut freq = self.min_freq();
        while let Some(f) = freq {
            let Some(bucket) = self.buckets.get(&f) else {
                debug_assert!(false, "bucket chain points at missing frequency {f}");
                break;
            };
            let mut cursor = bucket.head;
            while let Some(id) = cursor {
                match self.entries.get(id) {
                    Some(entry) => {
                        ordered.push((entry.key.clone(), entry.freq.saturating_sub(delta).max(1)));
                        cursor = entry.next;
                    },
                    None => {
                        debug_assert!(false, "bucket {f} links to vacated slot");
                        cursor = None;
                    },
                }
            }
            freq = bucket.next;
        }

        self.entries.clear();
        self.index.clear();
        self.buckets.clear();
        self.min_freq = 0;

        let mut last: Option<u64> = None;
        let mut total = 0u64;
        for (key, freq) in ordered {
            let id = self.entries.insert(Entry {
                prev: None,
                next: None,
                freq,
                key: key.clone(),
            });
            self.index.insert(key, id);
            if last != Some(freq) {
                self.insert_bucket(freq, last, None);
                last = Some(freq);
            }
            self.list_push_back(freq, id);
            if self.min_freq == 0 {
                self.min_freq = freq;
            }
            total = total.saturating_add(freq);
        }
        total
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.buckets.clear();
        self.min_freq = 0;
    }

    /// Keys in eviction order: ascending frequency, oldest first within a bucket.
    pub fn keys_in_eviction_order(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut freq = self.min_freq();
        while let Some(f) = freq {
            let Some(bucket) = self.buckets.get(&f) else {
                break;
            };
            let mut cursor = bucket.head;
            while let Some(entry) = cursor.and_then(|id| self.entries.get(id)) {
                keys.push(&entry.key);
                cursor = entry.next;
            }
            freq = bucket.next;
        }
        keys
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.entries.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "{} entries but {} index slots",
                self.entries.len(),
                self.index.len()
            )));
        }

        let smallest = self.buckets.keys().copied().min().unwrap_or(0);
        if smallest != self.min_freq {
            return Err(InvariantError::new(format!(
                "min_freq is {} but smallest bucket is {smallest}",
                self.min_freq
            )));
        }

        let mut seen = 0usize;
        let mut prev_freq = None;
        let mut freq = self.min_freq();
        while let Some(f) = freq {
            let bucket = self
                .buckets
                .get(&f)
                .ok_or_else(|| InvariantError::new(format!("chain names missing bucket {f}")))?;
            if bucket.prev != prev_freq {
                return Err(InvariantError::new(format!("bucket {f} has a stale prev link")));
            }
            if bucket.head.is_none() {
                return Err(InvariantError::new(format!("bucket {f} is empty")));
            }
            let mut cursor = bucket.head;
            let mut last = None;
            while let Some(id) = cursor {
                let entry = self
                    .entries
                    .get(id)
                    .ok_or_else(|| InvariantError::new(format!("bucket {f} links a vacated slot")))?;
                if entry.freq != f {
                    return Err(InvariantError::new(format!(
                        "entry with frequency {} filed under bucket {f}",
                        entry.freq
                    )));
                }
                if self.index.get(&entry.key) != Some(&id) {
                    return Err(InvariantError::new("index disagrees with bucket entry"));
                }
                seen += 1;
                if seen > self.entries.len() {
                    return Err(InvariantError::new("cycle in bucket links"));
                }
                last = Some(id);
                cursor = entry.next;
            }
            if bucket.tail != last {
                return Err(InvariantError::new(format!("bucket {f} tail is stale")));
            }
            if let Some(next) = bucket.next
                && next <= f
            {
                return Err(InvariantError::new("bucket chain is not ascending"));
            }
            prev_freq = Some(f);
            freq = bucket.next;
        }

        if seen != self.entries.len() {
            return Err(InvariantError::new(format!(
                "{seen} entries reachable from buckets, {} stored",
                self.entries.len()
            )));
        }
        Ok(())
    }

    fn unlink(&mut self, freq: u64, id: SlotId) -> Option<()> {
        let (prev, next) = {
            let bucket = self.buckets.get(&freq)?;
            (bucket.prev, bucket.next)
        };
        self.list_remove(freq, id)?;
        if self.bucket_is_empty(freq) {
            self.remove_bucket(freq, prev, next);
            if self.min_freq == freq {
                self.min_freq = next.unwrap_or(0);
            }
        }
        Some(())
    }

    fn bucket_is_empty(&self, freq: u64) -> bool {
        self.buckets
            .get(&freq)
            .is_none_or(|bucket| bucket.head.is_none())
    }

    fn insert_bucket(&mut self, freq: u64, prev: Option<u64>, next: Option<u64>) {
        self.buckets.insert(
            freq,
            Bucket {
                head: None,
                tail: None,
                prev,
                next,
            },
        );
        if let Some(prev) = prev
            && let Some(prev_bucket) = self.buckets.get_mut(&prev)
        {
            prev_bucket.next = Some(freq);
        }
        if let Some(next) = next
            && let Some(next_bucket) = self.buckets.get_mut(&next)
        {
            next_bucket.prev = Some(freq);
        }
    }

    fn remove_bucket(&mut self, freq: u64, prev: Option<u64>, next: Option<u64>) {
        if let Some(prev) = prev
            && let Some(prev_bucket) = self.buckets.get_mut(&prev)
        {
            prev_bucket.next = next;
        }
        if let Some(next) = next
            && let Some(next_bucket) = self.buckets.get_mut(&next)
        {
            next_bucket.prev = prev;
        }
        self.buckets.remove(&freq);
    }

    fn list_push_back(&mut self, freq: u64, id: SlotId) {
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            debug_assert!(false, "push into missing bucket {freq}");
            return;
        };
        let old_tail = bucket.tail;
        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = old_tail;
            entry.next = None;
        }
        match old_tail.and_then(|tail| self.entries.get_mut(tail)) {
            Some(tail_entry) => tail_entry.next = Some(id),
            None => bucket.head = Some(id),
        }
        bucket.tail = Some(id);
    }

    fn list_remove(&mut self, freq: u64, id: SlotId) -> Option<()> {
        let (prev, next) = {
            let entry = self.entries.get(id)?;
            (entry.prev, entry.next)
        };

        let bucket = self.buckets.get_mut(&freq)?;
        match prev.and_then(|prev| self.entries.get_mut(prev)) {
            Some(prev_entry) => prev_entry.next = next,
            None => bucket.head = next,
        }
        match next.and_then(|next| self.entries.get_mut(next)) {
            Some(next_entry) => next_entry.prev = prev,
            None => bucket.tail = prev,
        }

        if let Some(entry) = self.entries.get_mut(id) {
            entry.prev = None;
            entry.next = None;
        }
        Some(())
    }
}

impl<K> Default for FrequencyBuckets<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
