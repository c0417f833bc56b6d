//! LRU Policy Module
//!
//! Implements Least Recently Used eviction over an intrusive list.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::debug;

use crate::ds::{IntrusiveList, SlotId};
use crate::eviction::EvictionPolicy;

// == LRU Policy ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys are stored in an intrusive list where:
/// - Front = Most recently used
/// - Back = Least recently used
///
/// The handle map gives O(1) move-to-front and unlink.
#[derive(Debug)]
pub struct LruPolicy<K> {
    /// Order of keys by access time
    order: IntrusiveList<K>,
    /// List handle of every tracked key
    handles: HashMap<K, SlotId>,
    /// Maximum number of entries
    capacity: usize,
}

impl<K> LruPolicy<K>
where
    K: Clone + Eq + Hash + Debug,
{
    // == Constructor ==
    /// Creates an empty policy allowing `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            order: IntrusiveList::new(),
            handles: HashMap::new(),
            capacity,
        }
    }

    // == Touch ==
    /// Marks a key as recently used (moves or inserts it at the front).
    pub fn touch(&mut self, key: &K) {
        match self.handles.get(key) {
            Some(&id) => {
                self.order.move_to_front(id);
            }
            None => {
                let id = self.order.push_front(key.clone());
                self.handles.insert(key.clone(), id);
            }
        }
    }

    // == Remove ==
    /// Removes a key from the tracker. Returns `false` if it was not tracked.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.handles.remove(key) {
            Some(id) => self.order.remove(id).is_some(),
            None => false,
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<K> {
        let key = self.order.pop_back()?;
        self.handles.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.back()
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.order.iter().cloned().collect()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.handles.contains_key(key)
    }
}

impl<K> EvictionPolicy<K> for LruPolicy<K>
where
    K: Clone + Eq + Hash + Debug + Send,
{
    fn name(&self) -> &'static str {
        "lru"
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.order.len()
    }

    fn on_set(&mut self, key: &K, size: usize, deleter: &mut dyn FnMut(K)) {
        let mut size = size;
        while size >= self.capacity {
            let Some(victim) = self.evict_oldest() else {
                break;
            };
            debug!(victim = ?victim, "LRU evicting least recently used key");
            deleter(victim);
            size -= 1;
        }
        self.touch(key);
    }

    fn on_update(&mut self, key: &K) {
        self.touch(key);
    }

    fn on_get(&mut self, key: &K) {
        if let Some(&id) = self.handles.get(key) {
            self.order.move_to_front(id);
        }
    }

    fn on_delete(&mut self, key: &K) {
        self.remove(key);
    }

    fn on_clear(&mut self) {
        self.order.clear();
        self.handles.clear();
    }
}
