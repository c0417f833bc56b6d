//! Expiration Policy Module
//!
//! Precise TTL garbage collector. Tracked keys sit in an [`IndexedHeap`]
//! ordered by deadline, and exactly one timer is kept armed for the heap
//! root. When it fires, every key sharing the root's deadline is deleted in
//! one sweep and the timer is re-armed for the next root.
//!
//! ```text
//!   Idle ──track──► Armed ──sweep (heap empty) / untrack last / stop──► Idle
//!                    │  ▲
//!                    └──┘ track / retrack / sweep: synchronize timer to root
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::ds::{IndexedHeap, NodeId};
use crate::error::ExpirationError;
use crate::tasks::{spawn_gc_timer, SweepTrigger};

// == Tracked Expiry ==
/// A key waiting for its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedExpiry<K> {
    pub key: K,
    /// Unix timestamp (seconds) at which the key is deleted
    pub when_to_delete: u64,
}

type DeadlineOrder<K> = fn(&TrackedExpiry<K>, &TrackedExpiry<K>) -> Ordering;

fn by_deadline<K>(a: &TrackedExpiry<K>, b: &TrackedExpiry<K>) -> Ordering {
    a.when_to_delete.cmp(&b.when_to_delete)
}

/// The single outstanding timer.
struct GcTimer {
    will_run_on: u64,
    generation: u64,
    handle: JoinHandle<()>,
}

// == Expiration Policy ==
pub struct ExpirationPolicy<K> {
    heap: IndexedHeap<TrackedExpiry<K>, DeadlineOrder<K>>,
    tracked: HashMap<K, NodeId>,
    timer: Option<GcTimer>,
    /// Bumped on every arm; a sweep carrying an older value is ignored
    generation: u64,
    clock: Clock,
    runtime: Handle,
    trigger: SweepTrigger,
}

impl<K> ExpirationPolicy<K>
where
    K: Clone + Eq + Hash + fmt::Debug,
{
    // == Constructor ==
    /// Creates an idle policy.
    ///
    /// # Arguments
    /// * `runtime` - Runtime the GC timer is spawned on
    /// * `clock` - Time source for deadlines
    /// * `trigger` - Called by the timer; expected to lock the owner and call
    ///   [`sweep`](Self::sweep) with the generation it receives
    pub fn new(runtime: Handle, clock: Clock, trigger: SweepTrigger) -> Self {
        Self {
            heap: IndexedHeap::new(by_deadline::<K> as DeadlineOrder<K>),
            tracked: HashMap::new(),
            timer: None,
            generation: 0,
            clock,
            runtime,
            trigger,
        }
    }

    // == Track ==
    /// Starts tracking `key` so it is deleted `ttl_secs` from now.
    ///
    /// A ttl of 0 means "never expires" and is not tracked. A key that is
    /// already tracked gets its deadline moved instead of a second node.
    pub fn track(&mut self, key: K, ttl_secs: u64) -> Result<(), ExpirationError> {
        if ttl_secs == 0 {
            return Ok(());
        }
        if self.tracked.contains_key(&key) {
            return self.retrack(key, ttl_secs);
        }

        let when_to_delete = self.deadline_for(ttl_secs);
        let id = self.heap.push(TrackedExpiry {
            key: key.clone(),
            when_to_delete,
        });
        self.tracked.insert(key, id);
        self.synchronize();
        Ok(())
    }

    // == Re-track ==
    /// Moves the deadline of a tracked key to `ttl_secs` from now.
    ///
    /// Untracked keys are tracked fresh. A ttl of 0 is rejected: a tracked
    /// key cannot be made persistent through this path.
    pub fn retrack(&mut self, key: K, ttl_secs: u64) -> Result<(), ExpirationError> {
        if ttl_secs == 0 {
            return Err(ExpirationError::InfiniteRetrack(format!("{:?}", key)));
        }
        let Some(id) = self.tracked.get(&key).copied() else {
            return self.track(key, ttl_secs);
        };

        let when_to_delete = self.deadline_for(ttl_secs);
        self.heap
            .update(id, |expiry| expiry.when_to_delete = when_to_delete)?;
        self.synchronize();
        Ok(())
    }

    // == Untrack ==
    /// Stops tracking `key`. Returns `false` if it was not tracked.
    pub fn untrack(&mut self, key: &K) -> Result<bool, ExpirationError> {
        let Some(id) = self.tracked.remove(key) else {
            return Ok(false);
        };
        self.heap.delete(id)?;
        self.synchronize();
        Ok(true)
    }

    // == Stop ==
    /// Cancels the timer and forgets every tracked key.
    pub fn stop(&mut self) {
        self.cancel_timer();
        self.heap.clear();
        self.tracked.clear();
    }

    /// True when no timer is armed.
    pub fn is_idle(&self) -> bool {
        self.timer.is_none()
    }

    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_tracked(&self, key: &K) -> bool {
        self.tracked.contains_key(key)
    }

    /// Deadline of the heap root.
    pub fn next_expiry(&self) -> Option<u64> {
        self.heap.peek().map(|expiry| expiry.when_to_delete)
    }

    /// Deadline the armed timer is scheduled for.
    pub fn scheduled_for(&self) -> Option<u64> {
        self.timer.as_ref().map(|timer| timer.will_run_on)
    }

    /// Deadline of a tracked key.
    pub fn expires_at(&self, key: &K) -> Option<u64> {
        let id = self.tracked.get(key)?;
        self.heap.get(*id).map(|expiry| expiry.when_to_delete)
    }

    // == Sweep ==
    /// Timer callback: deletes the root and every key sharing its deadline.
    ///
    /// `deleter` is invoked once per expired key. Afterwards the timer is
    /// re-armed for the new root, or the policy goes idle. A call carrying a
    /// generation other than the armed timer's is a superseded timer and does
    /// nothing.
    ///
    /// # Returns
    /// The number of keys deleted.
    pub fn sweep(&mut self, generation: u64, mut deleter: impl FnMut(K)) -> usize {
        match &self.timer {
            Some(timer) if timer.generation == generation => {}
            _ => {
                debug!(generation, "Ignoring superseded GC timer");
                return 0;
            }
        }
        // The firing task is this timer; let it finish instead of aborting it.
        self.timer = None;

        let Some(batch_deadline) = self.next_expiry() else {
            return 0;
        };
        if batch_deadline.saturating_mul(1000) > self.clock.now_ms() {
            self.synchronize();
            return 0;
        }

        let mut swept = 0;
        while self.next_expiry() == Some(batch_deadline) {
            let Some(expired) = self.heap.pop() else {
                break;
            };
            self.tracked.remove(&expired.key);
            deleter(expired.key);
            swept += 1;
        }

        info!(swept, deadline = batch_deadline, "GC sweep deleted expired keys");
        self.synchronize();
        swept
    }

    /// First whole second at or after `ttl_secs` from now.
    ///
    /// Rounding up keeps same-second batching without ever deleting a key
    /// before its full ttl has elapsed. Saturates for absurdly large ttls.
    fn deadline_for(&self, ttl_secs: u64) -> u64 {
        self.clock
            .now_ms()
            .saturating_add(ttl_secs.saturating_mul(1000))
            .div_ceil(1000)
    }

    /// Keeps exactly one timer aligned with the heap root.
    fn synchronize(&mut self) {
        let next = self.next_expiry();
        match (next, self.scheduled_for()) {
            (None, Some(_)) => self.cancel_timer(),
            (Some(when), None) => self.arm(when),
            (Some(when), Some(scheduled)) if when != scheduled => {
                self.cancel_timer();
                self.arm(when);
            }
            _ => {}
        }
    }

    fn arm(&mut self, will_run_on: u64) {
        self.generation += 1;
        let delay_ms = will_run_on
            .saturating_mul(1000)
            .saturating_sub(self.clock.now_ms());
        let handle = spawn_gc_timer(
            &self.runtime,
            Duration::from_millis(delay_ms),
            self.generation,
            self.trigger.clone(),
        );
        debug!(will_run_on, delay_ms, generation = self.generation, "GC timer armed");
        self.timer = Some(GcTimer {
            will_run_on,
            generation: self.generation,
            handle,
        });
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
            debug!(will_run_on = timer.will_run_on, "GC timer cancelled");
        }
    }
}

impl<K> Drop for ExpirationPolicy<K> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }
}

impl<K> fmt::Debug for ExpirationPolicy<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpirationPolicy")
            .field("tracked", &self.tracked.len())
            .field(
                "scheduled_for",
                &self.timer.as_ref().map(|timer| timer.will_run_on),
            )
            .finish()
    }
}
