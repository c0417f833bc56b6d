//! Clock Module
//!
//! Unix timestamps anchored on Tokio's monotonic clock, so expiry deadlines
//! and GC timers advance together (including under a paused test runtime).

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::Instant;

// == Clock ==
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
    origin_unix_ms: u64,
}

impl Clock {
    /// Anchors a clock on the current wall time.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_unix_ms: current_timestamp_ms(),
        }
    }

    /// Anchors a clock on an explicit unix time (milliseconds).
    pub fn starting_at(unix_ms: u64) -> Self {
        Self {
            origin: Instant::now(),
            origin_unix_ms: unix_ms,
        }
    }

    /// Current unix time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.origin_unix_ms + self.origin.elapsed().as_millis() as u64
    }

    /// Current unix time in whole seconds.
    pub fn now_secs(&self) -> u64 {
        self.now_ms() / 1000
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
