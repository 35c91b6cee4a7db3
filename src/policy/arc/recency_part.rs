//! Recency side of the hybrid: an LRU list whose entries count their hits.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::{GhostList, IntrusiveList, SlotId};
use crate::error::InvariantError;
use crate::policy::arc::{ArcPart, Shrink};

#[derive(Debug)]
struct RecencyEntry<K, V> {
    key: K,
    value: V,
    hits: usize,
}

#[derive(Debug)]
pub(crate) struct RecencyPart<K, V> {
    list: IntrusiveList<RecencyEntry<K, V>>,
    index: FxHashMap<K, SlotId>,
    ghost: GhostList<K>,
    capacity: usize,
    transform_threshold: usize,
}

impl<K, V> RecencyPart<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new(capacity: usize, transform_threshold: usize) -> Self {
        Self {
            list: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::default(),
            ghost: GhostList::new(capacity),
            capacity,
            transform_threshold,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.index.len()
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

    pub(crate) fn hits(&self, key: &K) -> Option<usize> {
        let id = *self.index.get(key)?;
        self.list.get(id).map(|entry| entry.hits)
    }

    pub(crate) fn peek(&self, key: &K) -> Option<&V> {
        let id = *self.index.get(key)?;
        self.list.get(id).map(|entry| &entry.value)
    }

    /// Records a hit; `Some(true)` once the key has reached the promotion threshold.
    pub(crate) fn touch(&mut self, key: &K) -> Option<bool> {
        let id = *self.index.get(key)?;
        self.list.move_to_back(id);
        let entry = self.list.get_mut(id)?;
        entry.hits = entry.hits.saturating_add(1);
        Some(entry.hits >= self.transform_threshold)
    }

    /// Inserts or updates `key`; returns the key evicted to make room.
    ///
    /// An update replaces the value and refreshes recency without counting a hit.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<K> {
        if let Some(&id) = self.index.get(&key) {
            if let Some(entry) = self.list.get_mut(id) {
                entry.value = value;
            }
            self.list.move_to_back(id);
            return None;
        }
        if self.capacity == 0 {
            return None;
        }

        let victim = if self.index.len() >= self.capacity {
            self.evict()
        } else {
            None
        };

        self.ghost.remove(&key);
        let id = self.list.push_back(RecencyEntry {
            key: key.clone(),
            value,
            hits: 1,
        });
        self.index.insert(key, id);
        victim
    }

    fn evict(&mut self) -> Option<K> {
        let entry = self.list.pop_front()?;
        self.index.remove(&entry.key);
        Some(entry.key)
    }

    pub(crate) fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
        self.ghost.clear();
    }

    pub(crate) fn check_invariants(&self) -> Result<(), InvariantError> {
        self.list.check_invariants()?;
        self.ghost.check_invariants()?;
        if self.list.len() != self.index.len() {
            return Err(InvariantError::new("recency list and index disagree"));
        }
        if self.index.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "recency part holds {} over capacity {}",
                self.index.len(),
                self.capacity
            )));
        }
        if self.index.keys().any(|key| self.ghost.contains(key)) {
            return Err(InvariantError::new("recency key is both live and ghost"));
        }
        Ok(())
    }
}

impl<K, V> ArcPart<K> for RecencyPart<K, V>
where
    K: Eq + Hash + Clone,
{
    fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
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
        let evicted = if self.index.len() >= self.capacity {
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
