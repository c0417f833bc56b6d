//! Expiration Module
//!
//! Precise TTL expiration driven by a single timer per policy.

mod policy;

pub use policy::{ExpirationPolicy, TrackedExpiry};
