//! Bounded FIFO of recently evicted keys.
//!
//! The adaptive hybrid engine keeps one of these per part to remember which
//! keys it dropped recently. No values are stored. Implemented as an
//! [`IntrusiveList`] of keys plus an index for O(1) membership and removal.
//!
//! ```text
//!   index: FxHashMap<K, SlotId>        list: IntrusiveList<K>
//!   ┌─────────┬─────────┐              front ─► [A] ◄──► [B] ◄──► [C] ◄── back
//!   │  key A  │  id_1   │                      oldest             newest
//!   │  key B  │  id_2   │
//!   └─────────┴─────────┘
//! ```
//!
//! - `record(k)`: appends `k` at the back, dropping the oldest ghost when full
//! - `remove(k)`: forgets `k` (used on a ghost hit)
//!
//! `record`, `remove` and `contains` are O(1) average.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::slot_arena::SlotId;
use crate::error::InvariantError;

/// Bounded, key-only list of evicted keys.
#[derive(Debug)]
pub struct GhostList<K> {
    list: IntrusiveList<K>,
    index: FxHashMap<K, SlotId>,
    capacity: usize,
}

impl<K> GhostList<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates a ghost list holding at most `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            list: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::default(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Records `key` as the newest ghost and returns the ghost it displaced, if any.
    ///
    /// Re-recording a key already present refreshes its position.
    pub fn record(&mut self, key: K) -> Option<K> {
        if self.capacity == 0 {
            return None;
        }

        if let Some(&id) = self.index.get(&key) {
            self.list.move_to_back(id);
            return None;
        }

        let mut displaced = None;
        if self.list.len() >= self.capacity
            && let Some(oldest) = self.list.pop_front()
        {
            self.index.remove(&oldest);
            displaced = Some(oldest);
        }

        let id = self.list.push_back(key.clone());
        self.index.insert(key, id);
        displaced
    }

    /// Forgets `key`; returns `true` if it was a ghost.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.index.remove(key) {
            Some(id) => {
                self.list.remove(id);
                true
            },
            None => false,
        }
    }

    /// Ghost keys from oldest to newest.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.list.iter()
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.list.check_invariants()?;
        if self.list.len() != self.index.len() {
            return Err(InvariantError::new(format!(
                "ghost list holds {} keys but index holds {}",
                self.list.len(),
                self.index.len()
            )));
        }
        if self.list.len() > self.capacity {
            return Err(InvariantError::new(format!(
                "ghost list holds {} keys over capacity {}",
                self.list.len(),
                self.capacity
            )));
        }
        for (key, &id) in &self.index {
            if self.list.get(id) != Some(key) {
                return Err(InvariantError::new("ghost index points at a different key"));
            }
        }
        Ok(())
    }
}
