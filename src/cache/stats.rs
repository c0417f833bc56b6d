//! Cache Statistics Module
//!
//! Counts reads and removals, split by why an entry left the cache.

use serde::Serialize;

use crate::cache::DeleteReason;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that found a live entry
    pub hits: u64,
    /// Reads that found nothing (or an entry past its deadline)
    pub misses: u64,
    /// Entries removed through `del`
    pub deletes: u64,
    /// Entries sacrificed by an eviction policy
    pub evictions: u64,
    /// Entries removed by the GC sweep
    pub expirations: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// hits / (hits + misses), or 0.0 before the first read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Delete ==
    /// Counts one removal under the counter matching `reason`.
    pub fn record_delete(&mut self, reason: DeleteReason) {
        match reason {
            DeleteReason::Explicit => self.deletes += 1,
            DeleteReason::Evicted => self.evictions += 1,
            DeleteReason::Expired => self.expirations += 1,
        }
    }

    // == Set Total Entries ==
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
