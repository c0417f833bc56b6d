//! Eviction Module
//!
//! Capacity-driven eviction policies. Each policy sees every key the cache
//! stores and decides on its own which one to sacrifice when the cache is
//! full.

mod lfuda;
mod lru;

pub use lfuda::LfudaPolicy;
pub use lru::LruPolicy;

/// Hooks a cache engine calls on every policy it has attached.
///
/// Policies never touch the backend. When one needs room it hands the victim
/// to the `deleter`; the engine removes it everywhere else.
pub trait EvictionPolicy<K>: Send {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Maximum number of entries the policy lets the cache hold
    fn capacity(&self) -> usize;

    /// Number of keys under the policy's control
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A new key is about to be stored in a cache currently holding `size`
    /// entries. Evicts through `deleter` until the key fits, then starts
    /// tracking it. The cache never exceeds capacity once this returns.
    fn on_set(&mut self, key: &K, size: usize, deleter: &mut dyn FnMut(K));

    /// An existing key had its value overwritten.
    fn on_update(&mut self, key: &K);

    /// A key was read.
    fn on_get(&mut self, key: &K);

    /// A key left the cache for a reason other than this policy's eviction.
    /// Must not call back into the cache.
    fn on_delete(&mut self, key: &K);

    /// The cache was flushed.
    fn on_clear(&mut self);
}
