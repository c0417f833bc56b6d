//! Cache Store Module
//!
//! The cache engine: composes a backend, zero-or-one expiration policy and
//! any number of eviction policies, and is the only component that writes
//! to the backend.
//!
//! [`Cache`] is a cheap, cloneable handle. All state sits behind one Tokio
//! mutex; every operation locks it, runs to completion without suspending,
//! and unlocks. The GC timer takes the same lock to sweep, so no operation
//! ever observes a half-swept batch.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::cache::events::Listeners;
use crate::cache::{
    Backend, CacheEntry, CacheEvent, CacheStats, DeleteReason, HashMapBackend, ListenerId,
};
use crate::clock::Clock;
use crate::config::{Config, EvictionKind};
use crate::error::{CacheError, Result};
use crate::eviction::{EvictionPolicy, LfudaPolicy, LruPolicy};
use crate::expiration::ExpirationPolicy;
use crate::tasks::{SweepFuture, SweepTrigger};

// == Cache Core ==
/// Everything the engine owns. Only reachable through the [`Cache`] lock.
struct CacheCore<K, V, B> {
    backend: B,
    expiration: Option<ExpirationPolicy<K>>,
    evictions: Vec<Box<dyn EvictionPolicy<K>>>,
    listeners: Listeners<K>,
    stats: CacheStats,
    clock: Clock,
    /// TTL applied to new keys stored without one (0 = never expires)
    default_ttl: u64,
    _value: PhantomData<fn() -> V>,
}

impl<K, V, B> CacheCore<K, V, B>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
    B: Backend<K, CacheEntry<V>> + 'static,
{
    // == Set ==
    fn set(&mut self, key: K, value: V, ttl: Option<u64>) -> Result<()> {
        // A due entry the sweep has not reached yet is replaced, not overwritten.
        if self.is_due(&key) {
            self.purge(&key, DeleteReason::Expired)?;
        }
        let exists = self.backend.contains(&key);
        if exists {
            for policy in &mut self.evictions {
                policy.on_update(&key);
            }
        } else {
            self.make_room(&key)?;
        }

        let previous_expiry = if exists {
            self.backend.get(&key).and_then(|entry| entry.expires_at)
        } else {
            None
        };
        let entry = CacheEntry::new(value, self.clock.now_ms()).with_expiry(previous_expiry);
        self.backend.set(key.clone(), entry);

        let expires_at = self.apply_ttl(&key, ttl, exists)?;
        if let Some(entry) = self.backend.get_mut(&key) {
            entry.expires_at = expires_at;
        }

        self.stats.set_total_entries(self.backend.size());
        self.listeners.emit(&CacheEvent::Set { key });
        Ok(())
    }

    /// Lets each eviction policy in turn make room for `key`.
    fn make_room(&mut self, key: &K) -> Result<()> {
        let mut victims = Vec::new();
        for index in 0..self.evictions.len() {
            let size = self.backend.size();
            self.evictions[index].on_set(key, size, &mut |victim| victims.push(victim));
            for victim in victims.drain(..) {
                info!(
                    key = ?victim,
                    policy = self.evictions[index].name(),
                    "Evicting entry to make room"
                );
                self.purge(&victim, DeleteReason::Evicted)?;
            }
        }
        Ok(())
    }

    /// Registers the TTL of `key` with the expiration policy.
    ///
    /// `Some(0)` makes the key persistent, `Some(t)` (re)starts a `t` second
    /// countdown, `None` applies the default TTL to new keys and leaves an
    /// overwritten key's deadline alone.
    ///
    /// # Returns
    /// The key's deadline afterwards.
    fn apply_ttl(&mut self, key: &K, ttl: Option<u64>, exists: bool) -> Result<Option<u64>> {
        let Some(expiration) = self.expiration.as_mut() else {
            if ttl.is_some_and(|secs| secs > 0) {
                debug!(key = ?key, "No expiration policy attached; ttl ignored");
            }
            return Ok(None);
        };

        match ttl {
            Some(0) => {
                expiration.untrack(key)?;
            }
            Some(secs) if exists => expiration.retrack(key.clone(), secs)?,
            Some(secs) => expiration.track(key.clone(), secs)?,
            None if !exists => expiration.track(key.clone(), self.default_ttl)?,
            None => {}
        }
        Ok(expiration.expires_at(key))
    }

    /// True for an entry past its deadline that is still in the backend.
    fn is_due(&self, key: &K) -> bool {
        let now = self.clock.now_ms();
        self.backend
            .get(key)
            .is_some_and(|entry| entry.is_expired(now))
    }

    // == Get ==
    fn get(&mut self, key: &K) -> Option<V> {
        let now = self.clock.now_ms();
        let value = match self.backend.get(key) {
            // A due entry whose sweep has not run yet is already gone for readers.
            Some(entry) if !entry.is_expired(now) => entry.value.clone(),
            _ => {
                self.stats.record_miss();
                return None;
            }
        };

        for policy in &mut self.evictions {
            policy.on_get(key);
        }
        self.stats.record_hit();
        self.listeners.emit(&CacheEvent::Get { key: key.clone() });
        Some(value)
    }

    fn has(&self, key: &K) -> bool {
        let now = self.clock.now_ms();
        self.backend
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    fn ttl(&self, key: &K) -> Option<u64> {
        self.backend
            .get(key)?
            .ttl_remaining(self.clock.now_ms())
    }

    // == Expire ==
    fn expire(&mut self, key: &K, ttl_secs: u64) -> Result<bool> {
        if !self.backend.contains(key) {
            return Ok(false);
        }
        let Some(expiration) = self.expiration.as_mut() else {
            return Err(CacheError::InvalidRequest(
                "no expiration policy attached".to_string(),
            ));
        };
        expiration.retrack(key.clone(), ttl_secs)?;
        let expires_at = expiration.expires_at(key);
        if let Some(entry) = self.backend.get_mut(key) {
            entry.expires_at = expires_at;
        }
        Ok(true)
    }

    fn persist(&mut self, key: &K) -> Result<bool> {
        let Some(entry) = self.backend.get_mut(key) else {
            return Ok(false);
        };
        entry.expires_at = None;
        if let Some(expiration) = self.expiration.as_mut() {
            expiration.untrack(key)?;
        }
        Ok(true)
    }

    // == Delete ==
    /// Removes `key` from the backend and from every policy, then reports it.
    fn purge(&mut self, key: &K, reason: DeleteReason) -> Result<bool> {
        if !self.backend.delete(key) {
            return Ok(false);
        }
        for policy in &mut self.evictions {
            policy.on_delete(key);
        }
        if let Some(expiration) = self.expiration.as_mut() {
            // Already gone from the heap when the sweep is the caller.
            expiration.untrack(key)?;
        }

        self.stats.record_delete(reason);
        self.stats.set_total_entries(self.backend.size());
        self.listeners.emit(&CacheEvent::Delete {
            key: key.clone(),
            reason,
        });
        Ok(true)
    }

    /// Sweep entry point for the GC timer.
    fn run_expiration(&mut self, generation: u64) {
        let Some(expiration) = self.expiration.as_mut() else {
            return;
        };
        let mut expired = Vec::new();
        expiration.sweep(generation, |key| expired.push(key));

        for key in expired {
            if let Err(err) = self.purge(&key, DeleteReason::Expired) {
                error!(key = ?key, error = %err, "Failed to delete expired entry");
            }
        }
    }

    // == Clear ==
    fn clear(&mut self) {
        self.backend.clear();
        if let Some(expiration) = self.expiration.as_mut() {
            expiration.stop();
        }
        for policy in &mut self.evictions {
            policy.on_clear();
        }
        self.stats.set_total_entries(0);
        self.listeners.emit(&CacheEvent::Flush);
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.backend.size());
        stats
    }
}

/// Builds the timer callback that sweeps the core behind `core`.
fn sweep_trigger<K, V, B>(core: Weak<Mutex<CacheCore<K, V, B>>>) -> SweepTrigger
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
    B: Backend<K, CacheEntry<V>> + 'static,
{
    Arc::new(move |generation: u64| -> SweepFuture {
        let core = core.clone();
        Box::pin(async move {
            if let Some(core) = core.upgrade() {
                core.lock().await.run_expiration(generation);
            }
        })
    })
}

// == Cache ==
/// Handle to a cache engine. Clones share the same engine.
pub struct Cache<K, V, B = HashMapBackend<K, CacheEntry<V>>> {
    core: Arc<Mutex<CacheCore<K, V, B>>>,
}

impl<K, V, B> Clone for Cache<K, V, B> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    /// Starts building a cache on the default HashMap backend.
    pub fn builder() -> CacheBuilder<K, V> {
        CacheBuilder::new()
    }

    /// Creates a cache from configuration.
    ///
    /// Attaches the configured eviction policy with `max_entries` capacity,
    /// and the expiration policy when `gc_enabled` is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::builder().default_ttl(config.default_ttl);
        builder = match config.eviction {
            EvictionKind::Lru => builder.with_eviction(LruPolicy::new(config.max_entries)),
            EvictionKind::Lfuda => builder.with_eviction(LfudaPolicy::new(config.max_entries)),
            EvictionKind::None => builder,
        };
        if config.gc_enabled {
            builder = builder.with_expiration();
        }
        builder.build()
    }
}

impl<K, V, B> Cache<K, V, B>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
    B: Backend<K, CacheEntry<V>> + 'static,
{
    // == Set ==
    /// Stores `value` under `key`, evicting other entries if needed.
    ///
    /// # Arguments
    /// * `ttl` - `Some(secs)` expires the key `secs` from now, `Some(0)` keeps
    ///   it forever, `None` uses the default TTL for new keys and keeps the
    ///   current deadline of existing ones
    pub async fn set(&self, key: K, value: V, ttl: Option<u64>) -> Result<()> {
        self.core.lock().await.set(key, value, ttl)
    }

    // == Get ==
    /// Reads `key`, counting a hit for every eviction policy.
    pub async fn get(&self, key: &K) -> Option<V> {
        self.core.lock().await.get(key)
    }

    // == Delete ==
    /// Removes `key`. Returns `false` if it was not present.
    pub async fn del(&self, key: &K) -> Result<bool> {
        self.core.lock().await.purge(key, DeleteReason::Explicit)
    }

    /// Existence check without hit bookkeeping.
    pub async fn has(&self, key: &K) -> bool {
        self.core.lock().await.has(key)
    }

    /// Seconds until `key` expires; `None` if absent or persistent.
    pub async fn ttl(&self, key: &K) -> Option<u64> {
        self.core.lock().await.ttl(key)
    }

    /// Unix timestamp (seconds) at which `key` expires.
    pub async fn expires_at(&self, key: &K) -> Option<u64> {
        let core = self.core.lock().await;
        core.backend.get(key).and_then(|entry| entry.expires_at)
    }

    /// Restarts the countdown of an existing key at `ttl_secs`.
    ///
    /// Returns `false` if the key is absent. A ttl of 0 is rejected; use
    /// [`persist`](Self::persist) instead.
    pub async fn expire(&self, key: &K, ttl_secs: u64) -> Result<bool> {
        self.core.lock().await.expire(key, ttl_secs)
    }

    /// Removes the deadline of an existing key.
    pub async fn persist(&self, key: &K) -> Result<bool> {
        self.core.lock().await.persist(key)
    }

    pub async fn keys(&self) -> Vec<K> {
        self.core.lock().await.backend.keys()
    }

    pub async fn len(&self) -> usize {
        self.core.lock().await.backend.size()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops every entry and stops the GC timer.
    pub async fn clear(&self) {
        self.core.lock().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        self.core.lock().await.stats()
    }

    /// True when no GC timer is pending (always true without an expiration policy).
    pub async fn is_gc_idle(&self) -> bool {
        let core = self.core.lock().await;
        core.expiration.as_ref().map_or(true, |expiration| expiration.is_idle())
    }

    /// Registers a listener for lifecycle events.
    pub async fn on_event<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&CacheEvent<K>) + Send + Sync + 'static,
    {
        self.core.lock().await.listeners.add(Box::new(listener))
    }

    pub async fn off_event(&self, id: ListenerId) -> bool {
        self.core.lock().await.listeners.remove(id)
    }
}

// == Cache Builder ==
pub struct CacheBuilder<K, V, B = HashMapBackend<K, CacheEntry<V>>> {
    backend: B,
    expiration: bool,
    evictions: Vec<Box<dyn EvictionPolicy<K>>>,
    default_ttl: u64,
    clock: Option<Clock>,
    _value: PhantomData<fn() -> V>,
}

impl<K, V> CacheBuilder<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            backend: HashMapBackend::new(),
            expiration: false,
            evictions: Vec::new(),
            default_ttl: 0,
            clock: None,
            _value: PhantomData,
        }
    }
}

impl<K, V> Default for CacheBuilder<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, B> CacheBuilder<K, V, B>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Clone + Send + 'static,
    B: Backend<K, CacheEntry<V>> + 'static,
{
    /// Swaps in a different backend.
    pub fn backend<B2>(self, backend: B2) -> CacheBuilder<K, V, B2>
    where
        B2: Backend<K, CacheEntry<V>> + 'static,
    {
        CacheBuilder {
            backend,
            expiration: self.expiration,
            evictions: self.evictions,
            default_ttl: self.default_ttl,
            clock: self.clock,
            _value: PhantomData,
        }
    }

    /// Attaches the precise expiration policy.
    pub fn with_expiration(mut self) -> Self {
        self.expiration = true;
        self
    }

    /// Appends an eviction policy. Policies are consulted in the order added.
    pub fn with_eviction<P>(mut self, policy: P) -> Self
    where
        P: EvictionPolicy<K> + 'static,
    {
        self.evictions.push(Box::new(policy));
        self
    }

    /// TTL in seconds for new keys stored without one (0 = never expires).
    pub fn default_ttl(mut self, secs: u64) -> Self {
        self.default_ttl = secs;
        self
    }

    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the cache.
    ///
    /// # Errors
    /// - `InvalidConfig` if an eviction policy has zero capacity
    /// - `NoRuntime` if expiration is enabled outside a Tokio runtime
    pub fn build(self) -> Result<Cache<K, V, B>> {
        if let Some(policy) = self.evictions.iter().find(|policy| policy.capacity() == 0) {
            return Err(CacheError::InvalidConfig(format!(
                "{} eviction policy needs a capacity of at least 1",
                policy.name()
            )));
        }
        let runtime = if self.expiration {
            Some(Handle::try_current().map_err(|_| CacheError::NoRuntime)?)
        } else {
            None
        };
        let clock = self.clock.unwrap_or_default();
        let policies: Vec<&'static str> = self.evictions.iter().map(|p| p.name()).collect();
        info!(
            expiration = self.expiration,
            evictions = ?policies,
            default_ttl = self.default_ttl,
            "Cache engine initialized"
        );

        let Self {
            backend,
            evictions,
            default_ttl,
            ..
        } = self;
        let core = Arc::new_cyclic(|weak| {
            let expiration = runtime.map(|runtime| {
                ExpirationPolicy::new(runtime, clock, sweep_trigger(weak.clone()))
            });
            Mutex::new(CacheCore {
                backend,
                expiration,
                evictions,
                listeners: Listeners::new(),
                stats: CacheStats::new(),
                clock,
                default_ttl,
                _value: PhantomData,
            })
        });
        Ok(Cache { core })
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use crate::cache::EventKind;

    const START_SECS: u64 = 1_700_000_000;

    type Events = Arc<StdMutex<Vec<CacheEvent<String>>>>;

    fn clock() -> Clock {
        Clock::starting_at(START_SECS * 1000)
    }

    async fn record_events(cache: &Cache<String, String>) -> Events {
        let events: Events = Arc::new(StdMutex::new(Vec::new()));
        let sink = events.clone();
        cache
            .on_event(move |event| sink.lock().unwrap().push(event.clone()))
            .await;
        events
    }

    fn deletes(events: &Events) -> Vec<(String, DeleteReason)> {
        events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                CacheEvent::Delete { key, reason } => Some((key.clone(), *reason)),
                _ => None,
            })
            .collect()
    }

    fn s(value: &str) -> String {
        value.to_string()
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache: Cache<String, String> = Cache::builder().build().unwrap();
        cache.set(s("key1"), s("value1"), None).await.unwrap();

        assert_eq!(cache.get(&s("key1")).await, Some(s("value1")));
        assert_eq!(cache.get(&s("missing")).await, None);
        assert_eq!(cache.len().await, 1);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_overwrite_replaces_value() {
        let cache: Cache<String, String> = Cache::builder().build().unwrap();
        cache.set(s("k"), s("v1"), None).await.unwrap();
        cache.set(s("k"), s("v2"), None).await.unwrap();

        assert_eq!(cache.get(&s("k")).await, Some(s("v2")));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_del_reports_explicit_delete() {
        let cache: Cache<String, String> = Cache::builder().build().unwrap();
        let events = record_events(&cache).await;
        cache.set(s("k"), s("v"), None).await.unwrap();

        assert!(cache.del(&s("k")).await.unwrap());
        assert!(!cache.del(&s("k")).await.unwrap());
        assert!(cache.is_empty().await);
        assert_eq!(deletes(&events), vec![(s("k"), DeleteReason::Explicit)]);
    }

    #[tokio::test]
    async fn test_event_sequence() {
        let cache: Cache<String, String> = Cache::builder().build().unwrap();
        let events = record_events(&cache).await;
        cache.set(s("k"), s("v"), None).await.unwrap();
        cache.get(&s("k")).await;
        cache.get(&s("missing")).await;
        cache.del(&s("k")).await.unwrap();
        cache.clear().await;

        let kinds: Vec<EventKind> = events.lock().unwrap().iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![EventKind::Set, EventKind::Get, EventKind::Delete, EventKind::Flush]
        );
    }

    #[tokio::test]
    async fn test_off_event_stops_delivery() {
        let cache: Cache<String, String> = Cache::builder().build().unwrap();
        let events: Events = Arc::new(StdMutex::new(Vec::new()));
        let sink = events.clone();
        let id = cache
            .on_event(move |event| sink.lock().unwrap().push(event.clone()))
            .await;

        cache.set(s("a"), s("1"), None).await.unwrap();
        assert!(cache.off_event(id).await);
        cache.set(s("b"), s("2"), None).await.unwrap();

        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lru_eviction_emits_delete_before_set_returns() {
        let cache: Cache<String, String> = Cache::builder()
            .with_eviction(LruPolicy::new(2))
            .build()
            .unwrap();
        let events = record_events(&cache).await;

        cache.set(s("a"), s("1"), None).await.unwrap();
        cache.set(s("b"), s("2"), None).await.unwrap();
        cache.get(&s("a")).await;
        cache.set(s("c"), s("3"), None).await.unwrap();

        assert_eq!(deletes(&events), vec![(s("b"), DeleteReason::Evicted)]);
        assert!(cache.has(&s("a")).await);
        assert!(!cache.has(&s("b")).await);
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.stats().await.evictions, 1);
    }

    #[tokio::test]
    async fn test_lfuda_eviction() {
        let cache: Cache<String, String> = Cache::builder()
            .with_eviction(LfudaPolicy::new(2))
            .build()
            .unwrap();

        cache.set(s("a"), s("1"), None).await.unwrap();
        cache.set(s("b"), s("2"), None).await.unwrap();
        for _ in 0..3 {
            cache.get(&s("a")).await;
        }
        cache.set(s("c"), s("3"), None).await.unwrap();

        assert!(cache.has(&s("a")).await);
        assert!(!cache.has(&s("b")).await);
        assert!(cache.has(&s("c")).await);
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let cache: Cache<String, String> = Cache::builder()
            .with_eviction(LruPolicy::new(2))
            .build()
            .unwrap();
        cache.set(s("a"), s("1"), None).await.unwrap();
        cache.set(s("b"), s("2"), None).await.unwrap();
        cache.set(s("a"), s("3"), None).await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.stats().await.evictions, 0);
        // the overwrite made `a` most recently used
        cache.set(s("c"), s("4"), None).await.unwrap();
        assert!(!cache.has(&s("b")).await);
    }

    #[tokio::test]
    async fn test_multiple_eviction_policies_stay_in_sync() {
        let cache: Cache<String, String> = Cache::builder()
            .with_eviction(LruPolicy::new(3))
            .with_eviction(LfudaPolicy::new(2))
            .build()
            .unwrap();

        for key in ["a", "b", "c", "d"] {
            cache.set(s(key), s(key), None).await.unwrap();
        }
        assert_eq!(cache.len().await, 2);
        let mut keys = cache.keys().await;
        keys.sort();
        assert_eq!(keys, vec![s("c"), s("d")]);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_rejected() {
        let result: Result<Cache<String, String>> =
            Cache::builder().with_eviction(LruPolicy::new(0)).build();
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_expiration_requires_runtime() {
        let result: Result<Cache<String, String>> = Cache::builder().with_expiration().build();
        assert!(matches!(result, Err(CacheError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_deletes_and_reports() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .with_eviction(LruPolicy::new(10))
            .clock(clock())
            .build()
            .unwrap();
        let events = record_events(&cache).await;

        cache.set(s("a"), s("1"), Some(2)).await.unwrap();
        cache.set(s("b"), s("2"), Some(2)).await.unwrap();
        cache.set(s("forever"), s("3"), None).await.unwrap();
        assert_eq!(cache.ttl(&s("a")).await, Some(2));
        assert_eq!(cache.expires_at(&s("a")).await, Some(START_SECS + 2));
        assert_eq!(cache.ttl(&s("forever")).await, None);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(cache.get(&s("a")).await, Some(s("1")));

        tokio::time::sleep(Duration::from_millis(600)).await;
        let mut expired = deletes(&events);
        expired.sort();
        assert_eq!(
            expired,
            vec![(s("a"), DeleteReason::Expired), (s("b"), DeleteReason::Expired)]
        );
        assert_eq!(cache.len().await, 1);
        assert!(cache.is_gc_idle().await);
        assert_eq!(cache.stats().await.expirations, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_ttl_applies_to_new_keys() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .default_ttl(5)
            .clock(clock())
            .build()
            .unwrap();

        cache.set(s("k"), s("v"), None).await.unwrap();
        assert_eq!(cache.ttl(&s("k")).await, Some(5));

        cache.set(s("p"), s("v"), Some(0)).await.unwrap();
        assert_eq!(cache.ttl(&s("p")).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_keeps_or_resets_ttl() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .clock(clock())
            .build()
            .unwrap();

        cache.set(s("k"), s("v1"), Some(10)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;

        // No ttl: deadline is kept
        cache.set(s("k"), s("v2"), None).await.unwrap();
        assert_eq!(cache.ttl(&s("k")).await, Some(7));

        // New ttl: countdown restarts
        cache.set(s("k"), s("v3"), Some(20)).await.unwrap();
        assert_eq!(cache.ttl(&s("k")).await, Some(20));

        // Zero: persistent, GC goes idle
        cache.set(s("k"), s("v4"), Some(0)).await.unwrap();
        assert_eq!(cache.ttl(&s("k")).await, None);
        assert!(cache.is_gc_idle().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_delete_untracks_key() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .clock(clock())
            .build()
            .unwrap();
        let events = record_events(&cache).await;

        cache.set(s("k"), s("v"), Some(1)).await.unwrap();
        assert!(!cache.is_gc_idle().await);
        cache.del(&s("k")).await.unwrap();
        assert!(cache.is_gc_idle().await);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(deletes(&events), vec![(s("k"), DeleteReason::Explicit)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_key_is_untracked() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .with_eviction(LruPolicy::new(1))
            .clock(clock())
            .build()
            .unwrap();

        cache.set(s("a"), s("1"), Some(5)).await.unwrap();
        cache.set(s("b"), s("2"), None).await.unwrap();

        assert!(!cache.has(&s("a")).await);
        assert!(cache.is_gc_idle().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_and_persist() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .clock(clock())
            .build()
            .unwrap();
        cache.set(s("k"), s("v"), None).await.unwrap();

        assert!(cache.expire(&s("k"), 4).await.unwrap());
        assert_eq!(cache.ttl(&s("k")).await, Some(4));
        assert!(!cache.expire(&s("missing"), 4).await.unwrap());
        assert!(matches!(
            cache.expire(&s("k"), 0).await,
            Err(CacheError::Expiration(_))
        ));

        assert!(cache.persist(&s("k")).await.unwrap());
        assert_eq!(cache.ttl(&s("k")).await, None);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(cache.has(&s("k")).await);
    }

    #[tokio::test]
    async fn test_expire_without_policy_is_rejected() {
        let cache: Cache<String, String> = Cache::builder().build().unwrap();
        cache.set(s("k"), s("v"), Some(5)).await.unwrap();

        assert_eq!(cache.ttl(&s("k")).await, None);
        assert!(matches!(
            cache.expire(&s("k"), 5).await,
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_flushes_and_stops_gc() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .with_eviction(LruPolicy::new(2))
            .clock(clock())
            .build()
            .unwrap();
        let events = record_events(&cache).await;
        cache.set(s("a"), s("1"), Some(1)).await.unwrap();
        cache.set(s("b"), s("2"), None).await.unwrap();

        cache.clear().await;
        assert!(cache.is_empty().await);
        assert!(cache.is_gc_idle().await);

        // policies were reset too: two fresh keys fit without eviction
        cache.set(s("c"), s("3"), None).await.unwrap();
        cache.set(s("d"), s("4"), None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(deletes(&events).is_empty());
        assert_eq!(events.lock().unwrap().last().map(|e| e.kind()), Some(EventKind::Set));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_second_ttl_is_never_cut_short() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .clock(Clock::starting_at(START_SECS * 1000 + 900))
            .build()
            .unwrap();
        let events = record_events(&cache).await;

        cache.set(s("k"), s("v"), Some(1)).await.unwrap();
        assert_eq!(cache.ttl(&s("k")).await, Some(1));
        assert_eq!(cache.expires_at(&s("k")).await, Some(START_SECS + 2));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(&s("k")).await, Some(s("v")));

        tokio::time::sleep(Duration::from_millis(850)).await;
        assert!(cache.has(&s("k")).await, "Expired before a full second");
        assert!(deletes(&events).is_empty());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(&s("k")).await, None);
        assert_eq!(deletes(&events), vec![(s("k"), DeleteReason::Expired)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_accepted() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .with_eviction(LruPolicy::new(10))
            .clock(clock())
            .build()
            .unwrap();

        cache.set(s("max"), s("v"), Some(u64::MAX)).await.unwrap();
        cache
            .set(s("big"), s("v"), Some(100_000_000_000_000_000))
            .await
            .unwrap();
        assert!(cache.expire(&s("max"), u64::MAX).await.unwrap());

        assert!(cache.ttl(&s("max")).await.is_some_and(|ttl| ttl > 1_000_000));
        assert!(!cache.is_gc_idle().await);

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(cache.get(&s("max")).await, Some(s("v")));
        assert_eq!(cache.get(&s("big")).await, Some(s("v")));
        assert!(cache.del(&s("max")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwriting_due_entry_starts_fresh() {
        let cache: Cache<String, String> = Cache::builder()
            .with_expiration()
            .clock(clock())
            .build()
            .unwrap();
        let events = record_events(&cache).await;
        cache.set(s("k"), s("old"), Some(1)).await.unwrap();

        {
            // Hold the engine so the timer cannot sweep while the deadline passes
            let mut core = cache.core.lock().await;
            tokio::time::advance(Duration::from_secs(2)).await;
            assert!(core.is_due(&s("k")));
            core.set(s("k"), s("new"), None).unwrap();
        }

        assert_eq!(cache.get(&s("k")).await, Some(s("new")));
        assert_eq!(cache.ttl(&s("k")).await, None);
        assert!(cache.is_gc_idle().await);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(cache.has(&s("k")).await);
        assert_eq!(deletes(&events), vec![(s("k"), DeleteReason::Expired)]);
        assert_eq!(cache.stats().await.expirations, 1);
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_break_set() {
        let cache: Cache<String, String> = Cache::builder().build().unwrap();
        cache.on_event(|_| panic!("listener bug")).await;

        cache.set(s("k"), s("v"), None).await.unwrap();
        assert_eq!(cache.get(&s("k")).await, Some(s("v")));
    }

    #[tokio::test]
    async fn test_from_config() {
        let config = Config {
            max_entries: 2,
            default_ttl: 0,
            eviction: EvictionKind::Lfuda,
            gc_enabled: true,
        };
        let cache: Cache<String, String> = Cache::from_config(&config).unwrap();
        for key in ["a", "b", "c"] {
            cache.set(s(key), s(key), None).await.unwrap();
        }
        assert_eq!(cache.len().await, 2);
        assert!(cache.is_gc_idle().await);
    }
}
