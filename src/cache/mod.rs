//! Cache Module
//!
//! The cache engine together with its storage backend, entry metadata,
//! lifecycle events and statistics.

mod backend;
mod entry;
mod events;
mod stats;
mod store;


// Re-export public types
pub use backend::{Backend, HashMapBackend};
pub use entry::CacheEntry;
pub use events::{CacheEvent, DeleteReason, EventKind, Listener, ListenerId};
pub use stats::CacheStats;
pub use store::{Cache, CacheBuilder};
