//! Indexed Binary Heap Module
//!
//! A binary heap that tracks the array slot of every resident node, so an
//! arbitrary node can be removed or re-positioned in O(log n) instead of only
//! the root.
//!
//! ```text
//!   entries: [ (id_4, 1) | (id_2, 3) | (id_3, 8) | (id_1, 5) ]   heap order
//!   slots:   id_1 -> 3, id_2 -> 1, id_3 -> 2, id_4 -> 0          id -> slot
//! ```
//!
//! Every swap rewrites the slot of both nodes involved, so `slots[id]` always
//! equals the node's true position. A node that left the heap (popped,
//! deleted or cleared) has no slot and its [`NodeId`] never resolves again.
//!
//! Ordering comes from an injected three-way comparator; the node that
//! compares `Less` than all others sits at the root. Ties are broken
//! arbitrarily.

use std::cmp::Ordering;
use std::fmt;

use crate::ds::slot_arena::{SlotArena, SlotId};
use crate::error::HeapError;

/// Stable handle to a node resident in an [`IndexedHeap`].
pub type NodeId = SlotId;

struct Entry<T> {
    id: NodeId,
    value: T,
}

// == Indexed Heap ==
pub struct IndexedHeap<T, F> {
    /// Nodes in heap order
    entries: Vec<Entry<T>>,
    /// Current slot of every resident node
    slots: SlotArena<usize>,
    /// Three-way comparator
    compare: F,
}

impl<T, F> IndexedHeap<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    // == Constructor ==
    /// Creates an empty heap ordered by `compare`.
    pub fn new(compare: F) -> Self {
        Self {
            entries: Vec::new(),
            slots: SlotArena::new(),
            compare,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slots.contains(id)
    }

    /// Current array position of `id`, or `None` if it is not resident.
    pub fn slot_of(&self, id: NodeId) -> Option<usize> {
        self.slots.get(id).copied()
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        let slot = self.slot_of(id)?;
        self.entries.get(slot).map(|entry| &entry.value)
    }

    /// Mutable access to a resident node.
    ///
    /// Changing a field that affects ordering must be followed by
    /// [`heapify_updated`](Self::heapify_updated).
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        let slot = self.slot_of(id)?;
        self.entries.get_mut(slot).map(|entry| &mut entry.value)
    }

    // == Push ==
    /// Inserts `value` and returns its handle. O(log n).
    pub fn push(&mut self, value: T) -> NodeId {
        let slot = self.entries.len();
        let id = self.slots.insert(slot);
        self.entries.push(Entry { id, value });
        self.sift_up(slot);
        id
    }

    // == Peek ==
    /// Returns the root without removing it. O(1).
    pub fn peek(&self) -> Option<&T> {
        self.entries.first().map(|entry| &entry.value)
    }

    /// Returns the root's handle without removing it.
    pub fn peek_id(&self) -> Option<NodeId> {
        self.entries.first().map(|entry| entry.id)
    }

    // == Pop ==
    /// Removes and returns the root. O(log n).
    pub fn pop(&mut self) -> Option<T> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.swap(0, last);
        let entry = self.entries.pop()?;
        self.slots.remove(entry.id);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        Some(entry.value)
    }

    // == Delete ==
    /// Removes an arbitrary resident node. O(log n).
    ///
    /// The last node is moved into the vacated slot and then sifted in
    /// whichever direction restores order.
    pub fn delete(&mut self, id: NodeId) -> Result<T, HeapError> {
        let slot = self.resident_slot(id)?;
        let last = self.entries.len() - 1;
        self.swap(slot, last);
        let entry = self.entries.pop().ok_or(HeapError::NotResident(id))?;
        self.slots.remove(entry.id);
        if slot < self.entries.len() {
            self.restore(slot);
        }
        Ok(entry.value)
    }

    // == Heapify Updated Node ==
    /// Re-establishes heap order around `id` after an in-place mutation.
    pub fn heapify_updated(&mut self, id: NodeId) -> Result<(), HeapError> {
        let slot = self.resident_slot(id)?;
        self.restore(slot);
        Ok(())
    }

    /// Mutates a resident node and re-heapifies it in one step.
    pub fn update(&mut self, id: NodeId, f: impl FnOnce(&mut T)) -> Result<(), HeapError> {
        let value = self.get_mut(id).ok_or(HeapError::NotResident(id))?;
        f(value);
        self.heapify_updated(id)
    }

    // == Clear ==
    /// Drops every node; all outstanding handles become stale.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
    }

    fn resident_slot(&self, id: NodeId) -> Result<usize, HeapError> {
        match self.slot_of(id) {
            Some(slot) if self.entries.get(slot).map(|entry| entry.id) == Some(id) => Ok(slot),
            _ => Err(HeapError::NotResident(id)),
        }
    }

    fn less(&self, a: usize, b: usize) -> bool {
        (self.compare)(&self.entries[a].value, &self.entries[b].value) == Ordering::Less
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.entries.swap(a, b);
        for slot in [a, b] {
            let id = self.entries[slot].id;
            if let Some(position) = self.slots.get_mut(id) {
                *position = slot;
            }
        }
    }

    fn restore(&mut self, slot: usize) {
        if slot > 0 && self.less(slot, (slot - 1) / 2) {
            self.sift_up(slot);
        } else {
            self.sift_down(slot);
        }
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !self.less(slot, parent) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }

    /// Panics if heap order or slot bookkeeping is broken.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.slots.len(), self.entries.len());
        for (slot, entry) in self.entries.iter().enumerate() {
            assert_eq!(self.slot_of(entry.id), Some(slot), "stale slot index");
            if slot > 0 {
                let parent = (slot - 1) / 2;
                assert!(!self.less(slot, parent), "child sorts before its parent");
            }
        }
    }
}

impl<T, F> fmt::Debug for IndexedHeap<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedHeap")
            .field("len", &self.entries.len())
            .finish()
    }
}
