//! Doubly linked list whose nodes live in a [`SlotArena`].
//!
//! Nodes are addressed by [`SlotId`] and linked through `Option<SlotId>`
//! slots, so `None` plays the role of the list-end sentinel. The forward and
//! backward links are plain indices; neither owns its neighbour, and
//! unlinking a node always clears both of its slots before it is freed or
//! relinked.
//!
//! ## Architecture
//!
//! ```text
//!   arena (SlotArena<Node<T>>)
//!   ┌────────┬──────────────────────────────────────────────┐
//!   │ SlotId │ Node { value, prev, next }                   │
//!   ├────────┼──────────────────────────────────────────────┤
//!   │ id_1   │ { value: A, prev: None,       next: id_2 }   │
//!   │ id_2   │ { value: B, prev: id_1,       next: id_3 }   │
//!   │ id_3   │ { value: C, prev: id_2,       next: None }   │
//!   └────────┴──────────────────────────────────────────────┘
//!
//!   front ─► [id_1] ◄──► [id_2] ◄──► [id_3] ◄── back
//!            oldest                    newest
//! ```
//!
//! Recency users push new nodes at the back and evict from the front; a hit
//! is `move_to_back`, which is an unlink followed by a relink at the back.
//!
//! ## Performance
//! - `push_back` / `pop_front` / `remove` / `move_to_back`: O(1)
//! - `iter`: O(n)
//!
//! A node that cannot be found while following a link indicates a corrupted
//! list. Debug builds assert; release builds skip the broken step.

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::InvariantError;

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

/// Arena-backed doubly linked list with O(1) arbitrary removal.
#[derive(Debug)]
pub struct IntrusiveList<T> {
    arena: SlotArena<Node<T>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<T> IntrusiveList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            head: None,
            tail: None,
        }
    }

    /// Creates an empty list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Returns `true` if `id` is a live node of this list.
    pub fn contains(&self, id: SlotId) -> bool {
        self.arena.contains(id)
    }

    /// Oldest node (eviction end).
    pub fn front_id(&self) -> Option<SlotId> {
        self.head
    }

    /// Newest node.
    pub fn back_id(&self) -> Option<SlotId> {
        self.tail
    }

    pub fn front(&self) -> Option<&T> {
        self.head.and_then(|id| self.get(id))
    }

    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.arena.get_mut(id).map(|node| &mut node.value)
    }

    /// Links a new node at the back and returns its handle.
    pub fn push_back(&mut self, value: T) -> SlotId {
        let id = self.arena.insert(Node {
            value,
            prev: None,
            next: None,
        });
        self.attach_back(id);
        id
    }

    /// Unlinks and returns the front (oldest) value.
    pub fn pop_front(&mut self) -> Option<T> {
        let id = self.head?;
        self.remove(id)
    }

    /// Unlinks `id` and returns its value.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        if !self.arena.contains(id) {
            return None;
        }
        self.detach(id);
        self.arena.remove(id).map(|node| node.value)
    }

    /// Relinks an existing node at the back; returns `false` if `id` is not live.
    pub fn move_to_back(&mut self, id: SlotId) -> bool {
        if !self.arena.contains(id) {
            return false;
        }
        if self.tail == Some(id) {
            return true;
        }
        self.detach(id);
        self.attach_back(id);
        true
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterates values from front (oldest) to back (newest).
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
        }
    }

    fn detach(&mut self, id: SlotId) {
        let Some((prev, next)) = self.arena.get(id).map(|node| (node.prev, node.next)) else {
            debug_assert!(false, "detach of vacated slot {id:?}");
            return;
        };

        match prev {
            Some(prev_id) => match self.arena.get_mut(prev_id) {
                Some(prev_node) => prev_node.next = next,
                None => debug_assert!(false, "dangling prev link {prev_id:?}"),
            },
            None => self.head = next,
        }

        match next {
            Some(next_id) => match self.arena.get_mut(next_id) {
                Some(next_node) => next_node.prev = prev,
                None => debug_assert!(false, "dangling next link {next_id:?}"),
            },
            None => self.tail = prev,
        }

        if let Some(node) = self.arena.get_mut(id) {
            node.prev = None;
            node.next = None;
        }
    }

    fn attach_back(&mut self, id: SlotId) {
        let old_tail = self.tail;
        match self.arena.get_mut(id) {
            Some(node) => {
                node.prev = old_tail;
                node.next = None;
            },
            None => {
                debug_assert!(false, "attach of vacated slot {id:?}");
                return;
            },
        }
        match old_tail.and_then(|tail| self.arena.get_mut(tail)) {
            Some(tail_node) => tail_node.next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    /// Walks the list front to back and cross-checks every link.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.head.is_none() != self.tail.is_none() {
            return Err(InvariantError::new("head and tail disagree on emptiness"));
        }

        let mut count = 0usize;
        let mut prev = None;
        let mut current = self.head;
        while let Some(id) = current {
            let node = self
                .arena
                .get(id)
                .ok_or_else(|| InvariantError::new(format!("link to vacated slot {id:?}")))?;
            if node.prev != prev {
                return Err(InvariantError::new(format!(
                    "node {id:?} has prev {:?}, expected {prev:?}",
                    node.prev
                )));
            }
            count += 1;
            if count > self.arena.len() {
                return Err(InvariantError::new("cycle detected in list links"));
            }
            prev = Some(id);
            current = node.next;
        }

        if prev != self.tail {
            return Err(InvariantError::new("walk did not end at tail"));
        }
        if count != self.arena.len() {
            return Err(InvariantError::new(format!(
                "{count} linked nodes but {} allocated",
                self.arena.len()
            )));
        }
        Ok(())
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back iterator over list values.
pub struct Iter<'a, T> {
    list: &'a IntrusiveList<T>,
    current: Option<SlotId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.list.arena.get(id)?;
        self.current = node.next;
        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone>(list: &IntrusiveList<T>) -> Vec<T> {
        list.iter().cloned().collect()
    }

    #[test]
    fn push_back_and_pop_front_are_fifo() {
        let mut list = IntrusiveList::new();
        list.push_back(1);
        list.push_back(2);
        list.push_back(3);
        assert_eq!(list.front(), Some(&1));
        assert_eq!(list.back(), Some(&3));
        assert_eq!(list.pop_front(), Some(1));
        assert_eq!(list.pop_front(), Some(2));
        assert_eq!(list.pop_front(), Some(3));
        assert_eq!(list.pop_front(), None);
        assert!(list.is_empty());
        list.check_invariants().unwrap();
    }

    #[test]
    fn move_to_back_relinks_middle_and_front() {
        let mut list = IntrusiveList::new();
        let a = list.push_back("a");
        let b = list.push_back("b");
        let _c = list.push_back("c");

        assert!(list.move_to_back(b));
        assert_eq!(collect(&list), vec!["a", "c", "b"]);

        assert!(list.move_to_back(a));
        assert_eq!(collect(&list), vec!["c", "b", "a"]);

        assert!(list.move_to_back(a));
        assert_eq!(collect(&list), vec!["c", "b", "a"]);
        list.check_invariants().unwrap();
    }

    #[test]
    fn remove_from_each_position() {
        let mut list = IntrusiveList::new();
        let ids: Vec<_> = (0..5).map(|i| list.push_back(i)).collect();

        assert_eq!(list.remove(ids[2]), Some(2));
        assert_eq!(list.remove(ids[0]), Some(0));
        assert_eq!(list.remove(ids[4]), Some(4));
        assert_eq!(collect(&list), vec![1, 3]);
        assert_eq!(list.front_id(), Some(ids[1]));
        assert_eq!(list.back_id(), Some(ids[3]));
        list.check_invariants().unwrap();
    }

    #[test]
    fn stale_handle_is_rejected() {
        let mut list = IntrusiveList::new();
        let id = list.push_back(10);
        assert_eq!(list.remove(id), Some(10));
        assert_eq!(list.remove(id), None);
        assert!(!list.move_to_back(id));
        assert!(!list.contains(id));
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut list = IntrusiveList::new();
        let id = list.push_back(String::from("old"));
        if let Some(value) = list.get_mut(id) {
            value.push_str("-new");
        }
        assert_eq!(list.get(id).map(String::as_str), Some("old-new"));
    }

    #[test]
    fn clear_resets_ends() {
        let mut list = IntrusiveList::new();
        list.push_back(1);
        list.push_back(2);
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.front_id(), None);
        assert_eq!(list.back_id(), None);
        list.check_invariants().unwrap();
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::VecDeque;

        proptest! {
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_matches_vecdeque_model(ops in prop::collection::vec((0u8..3, 0usize..16), 0..200)) {
                let mut list = IntrusiveList::new();
                let mut model: VecDeque<(SlotId, usize)> = VecDeque::new();
                let mut next_value = 0usize;

                for (op, pick) in ops {
                    match op {
                        0 => {
                            let id = list.push_back(next_value);
                            model.push_back((id, next_value));
                            next_value += 1;
                        },
                        1 if !model.is_empty() => {
                            let (id, value) = model.remove(pick % model.len()).unwrap();
                            prop_assert_eq!(list.remove(id), Some(value));
                        },
                        2 if !model.is_empty() => {
                            let entry = model.remove(pick % model.len()).unwrap();
                            prop_assert!(list.move_to_back(entry.0));
                            model.push_back(entry);
                        },
                        _ => {},
                    }
                    prop_assert!(list.check_invariants().is_ok());
                    let expected: Vec<usize> = model.iter().map(|(_, v)| *v).collect();
                    prop_assert_eq!(collect(&list), expected);
                }
            }
        }
    }
}
