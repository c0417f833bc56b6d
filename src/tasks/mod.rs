//! Background Tasks Module
//!
//! Contains the timer task that drives the expiration policy.
//!
//! # Tasks
//! - GC timer: sleeps until the nearest expiry, then triggers one sweep

mod gc_timer;

pub use gc_timer::{spawn_gc_timer, SweepFuture, SweepTrigger};
