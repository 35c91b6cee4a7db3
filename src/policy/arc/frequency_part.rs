//! Frequency side of the hybrid: LFU buckets without aging.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::{FrequencyBuckets, GhostList};
use crate::error::InvariantError;
use crate::policy::arc::{ArcPart, Shrink};

#[derive(Debug)]
pub(crate) struct FrequencyPart<K, V> {
    values: FxHashMap<K, V>,
    buckets: FrequencyBuckets<K>,
    ghost: GhostList<K>,
    capacity: usize,
}

impl<K, V> FrequencyPart<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            values: FxHashMap::default(),
            buckets: FrequencyBuckets::with_capacity(capacity),
            ghost: GhostList::new(capacity),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    pub(crate) fn is_ghost(&self, key: &K) -> bool {
        self.ghost.contains(key)
    }

    pub(crate) fn ghost_len(&self) -> usize {
        self.ghost.len()
    }

    pub(crate) fn ghost_keys(&self) -> impl Iterator<Item = &K> {
        self.ghost.keys()
    }

    pub(crate) fn frequency(&self, key: &K) -> Option<u64> {
        self.buckets.frequency(key)
    }

    pub(crate) fn get(&mut self, key: &K) -> Option<&V> {
        self.buckets.touch(key)?;
        self.values.get(key)
    }

    /// Inserts or updates `key`; returns the key evicted to make room.
    ///
    /// Updating an existing key counts as an access.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<K> {
        if let Some(slot) = self.values.get_mut(&key) {
            *slot = value;
            self.buckets.touch(&key);
            return None;
        }
        if self.capacity == 0 {
            return None;
        }

        let victim = if self.values.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        self.ghost.remove(&key);
        self.buckets.insert(key.clone());
        self.values.insert(key, value);
        victim
    }

    fn evict(&mut self) -> Option<K> {
        let (key, _) = self.buckets.pop_min()?;
        self.values.remove(&key);
        Some(key)
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.buckets.clear();
        self.ghost.clear();
    }

    pub(crate) fn check_invariants(&self) -> Result<(), InvariantError> {
        self.buckets.check_invariants()?;
        self.ghost.check_invariants()?;
        if self.values.len() != self.buckets.len() {
            return Err(InvariantError::new("frequency values and buckets disagree"));
        }
        if self.values.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "frequency part holds {} over capacity {}",
                self.values.len(),
                self.capacity
            )));
        }
        if self.values.keys().any(|key| self.ghost.contains(key)) {
            return Err(InvariantError::new("frequency key is both live and ghost"));
        }
        Ok(())
    }
}

impl<K, V> ArcPart<K> for FrequencyPart<K, V>
where
    K: Eq + Hash + Clone,
{
    fn contains(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn increase_capacity(&mut self) {
        self.capacity += 1;
    }

    fn decrease_capacity(&mut self) -> Shrink<K> {
        if self.capacity == 0 {
            return Shrink::AtFloor;
        }
        let evicted = if self.values.len() >= self.capacity {
            self.evict()
        } else {
            None
        };
        self.capacity -= 1;
        Shrink::Shrunk { evicted }
    }

    fn take_ghost(&mut self, key: &K) -> bool {
        self.ghost.remove(key)
    }

    fn remember(&mut self, key: K) {
        self.ghost.record(key);
    }
}
