//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL metadata.

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix seconds), None = no expiration.
    /// Mirrors the deadline held by the expiration policy.
    pub expires_at: Option<u64>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a persistent entry.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `created_at` - Creation time in Unix milliseconds
    pub fn new(value: V, created_at: u64) -> Self {
        Self {
            value,
            created_at,
            expires_at: None,
        }
    }

    /// Sets the expiration timestamp (Unix seconds).
    pub fn with_expiry(mut self, expires_at: Option<u64>) -> Self {
        self.expires_at = expires_at;
        self
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms` (Unix milliseconds).
    ///
    /// Boundary condition: an entry is expired from the first millisecond of
    /// its deadline second, which is also when the GC sweep fires.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms >= expires.saturating_mul(1000),
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in whole seconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if less than a second is left or the deadline has passed
    /// - `Some(remaining_seconds)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining(&self, now_ms: u64) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_mul(1000).saturating_sub(now_ms) / 1000)
    }
}
