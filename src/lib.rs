//! ttl_cache - An in-memory cache engine
//!
//! Pluggable storage with precise per-key TTL expiration (one GC timer
//! driven by an indexed min-heap) and composable LRU / LFUDA eviction.

pub mod cache;
pub mod clock;
pub mod config;
pub mod ds;
pub mod error;
pub mod eviction;
pub mod expiration;
pub mod models;
pub mod shell;
pub mod tasks;

pub use cache::{Cache, CacheBuilder, CacheEvent, DeleteReason};
pub use config::{Config, EvictionKind};
pub use error::{CacheError, Result};
