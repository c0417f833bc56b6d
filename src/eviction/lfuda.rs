//! LFUDA Policy Module
//!
//! Least Frequently Used with Dynamic Aging.
//!
//! Entries live in FIFO buckets keyed by `frequency × cache_age`, kept in an
//! ordered map so the lowest bucket is always the next to lose an entry.
//! `cache_age` is a single counter for the whole policy. It starts at 1 and
//! grows by the victim's frequency on every eviction, so entries that were
//! popular long ago end up in the same range as fresh ones and stop being
//! immune to eviction.
//!
//! ```text
//!   buckets (ascending id)
//!   ┌────┬──────────────┐
//!   │  2 │ c            │ ◄── next victim: front of the lowest bucket
//!   │  4 │ a ─► d       │
//!   │  9 │ e            │
//!   └────┴──────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use tracing::debug;

use crate::ds::{IntrusiveList, SlotId};
use crate::eviction::EvictionPolicy;

/// Age every policy starts with.
const INITIAL_CACHE_AGE: u64 = 1;

#[derive(Debug, Clone, Copy)]
struct LfudaEntry {
    frequency: u64,
    bucket_id: u64,
    slot: SlotId,
}

// == LFUDA Policy ==
#[derive(Debug)]
pub struct LfudaPolicy<K> {
    buckets: BTreeMap<u64, IntrusiveList<K>>,
    entries: HashMap<K, LfudaEntry>,
    cache_age: u64,
    capacity: usize,
}

impl<K> LfudaPolicy<K>
where
    K: Clone + Eq + Hash + Debug,
{
    // == Constructor ==
    pub fn new(capacity: usize) -> Self {
        Self {
            buckets: BTreeMap::new(),
            entries: HashMap::new(),
            cache_age: INITIAL_CACHE_AGE,
            capacity,
        }
    }

    pub fn cache_age(&self) -> u64 {
        self.cache_age
    }

    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.frequency)
    }

    pub fn bucket_of(&self, key: &K) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.bucket_id)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Id of the bucket the next eviction takes from.
    pub fn lowest_bucket(&self) -> Option<u64> {
        self.buckets.keys().next().copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    // == Insert ==
    /// Starts tracking `key` with frequency 1. Already tracked keys are left alone.
    pub fn insert(&mut self, key: &K) {
        if self.entries.contains_key(key) {
            return;
        }
        let (bucket_id, slot) = self.push_into_bucket(key, 1);
        self.entries.insert(
            key.clone(),
            LfudaEntry {
                frequency: 1,
                bucket_id,
                slot,
            },
        );
    }

    // == Hit ==
    /// Bumps the frequency of `key` and moves it to its new bucket.
    ///
    /// # Returns
    /// The new bucket id, or `None` if the key is not tracked.
    pub fn hit(&mut self, key: &K) -> Option<u64> {
        let entry = self.entries.get(key).copied()?;
        self.unlink(entry.bucket_id, entry.slot);

        let frequency = entry.frequency.saturating_add(1);
        let (bucket_id, slot) = self.push_into_bucket(key, frequency);
        self.entries.insert(
            key.clone(),
            LfudaEntry {
                frequency,
                bucket_id,
                slot,
            },
        );
        Some(bucket_id)
    }

    // == Remove ==
    /// Stops tracking `key` without aging. Returns `false` if it was not tracked.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.unlink(entry.bucket_id, entry.slot);
                true
            }
            None => false,
        }
    }

    // == Evict ==
    /// Removes the oldest entry of the lowest bucket and ages the cache.
    pub fn evict(&mut self) -> Option<K> {
        let mut lowest = self.buckets.first_entry()?;
        let victim = lowest.get_mut().pop_front();
        if lowest.get().is_empty() {
            lowest.remove();
        }
        let victim = victim?;

        if let Some(entry) = self.entries.remove(&victim) {
            self.cache_age = self.cache_age.saturating_add(entry.frequency);
            debug!(
                victim = ?victim,
                frequency = entry.frequency,
                bucket = entry.bucket_id,
                cache_age = self.cache_age,
                "LFUDA evicting from lowest bucket"
            );
        }
        Some(victim)
    }

    fn push_into_bucket(&mut self, key: &K, frequency: u64) -> (u64, SlotId) {
        let bucket_id = frequency.saturating_mul(self.cache_age);
        let slot = self
            .buckets
            .entry(bucket_id)
            .or_default()
            .push_back(key.clone());
        (bucket_id, slot)
    }

    fn unlink(&mut self, bucket_id: u64, slot: SlotId) {
        if let Some(bucket) = self.buckets.get_mut(&bucket_id) {
            bucket.remove(slot);
            if bucket.is_empty() {
                self.buckets.remove(&bucket_id);
            }
        }
    }
}

impl<K> EvictionPolicy<K> for LfudaPolicy<K>
where
    K: Clone + Eq + Hash + Debug + Send,
{
    fn name(&self) -> &'static str {
        "lfuda"
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn on_set(&mut self, key: &K, size: usize, deleter: &mut dyn FnMut(K)) {
        let mut size = size;
        while size >= self.capacity {
            let Some(victim) = self.evict() else {
                break;
            };
            deleter(victim);
            size -= 1;
        }
        self.insert(key);
    }

    // Overwriting a value is not a read; frequency stays as it is.
    fn on_update(&mut self, _key: &K) {}

    fn on_get(&mut self, key: &K) {
        self.hit(key);
    }

    fn on_delete(&mut self, key: &K) {
        self.remove(key);
    }

    fn on_clear(&mut self) {
        self.buckets.clear();
        self.entries.clear();
        self.cache_age = INITIAL_CACHE_AGE;
    }
}
