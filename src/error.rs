//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror. Missing keys are not
//! errors: lookups return `Option`. The variants below are caller bugs or
//! setup problems and are propagated as-is, never retried.

use thiserror::Error;

use crate::ds::NodeId;

// == Heap Error ==
/// Faults raised by [`IndexedHeap`](crate::ds::IndexedHeap).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
    /// The handle does not name a node currently inside the heap
    #[error("node {0:?} is not resident in the heap")]
    NotResident(NodeId),
}

// == Expiration Error ==
/// Faults raised by the expiration policy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpirationError {
    /// Re-tracking cannot turn a tracked key into a persistent one
    #[error("cannot re-track key {0} with an infinite ttl")]
    InfiniteRetrack(String),

    /// Heap bookkeeping went out of sync with the tracked keys
    #[error(transparent)]
    Heap(#[from] HeapError),
}

// == Cache Error Enum ==
/// Unified error type for the cache engine.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The expiration policy needs a Tokio runtime to schedule its timer
    #[error("No Tokio runtime available to drive the expiration timer")]
    NoRuntime,

    /// Invalid request data (command shell input, bad arguments)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Heap invariant violation
    #[error("Heap fault: {0}")]
    Heap(#[from] HeapError),

    /// Expiration policy invariant violation
    #[error("Expiration fault: {0}")]
    Expiration(#[from] ExpirationError),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
