//! GC Timer Task
//!
//! One-shot background task that wakes the expiration policy when the
//! nearest tracked key is due.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Future returned by a [`SweepTrigger`].
pub type SweepFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Callback run when a GC timer fires.
///
/// Receives the generation the timer was armed with, so the owner can ignore
/// a timer that was superseded while it waited for the lock.
pub type SweepTrigger = Arc<dyn Fn(u64) -> SweepFuture + Send + Sync>;

/// Spawns a task that sleeps for `delay` and then runs `trigger(generation)`.
///
/// # Arguments
/// * `runtime` - Runtime the timer is spawned on
/// * `delay` - Time until the sweep is due
/// * `generation` - Token handed back to the trigger
/// * `trigger` - Sweep callback
///
/// # Returns
/// A JoinHandle the expiration policy keeps so it can abort the timer when
/// it reschedules or stops.
pub fn spawn_gc_timer(
    runtime: &Handle,
    delay: Duration,
    generation: u64,
    trigger: SweepTrigger,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        debug!(generation, "GC timer fired");
        trigger(generation).await;
    })
}
