//! Cache Events Module
//!
//! Synchronous lifecycle notifications for collaborators such as session
//! registries or metrics collectors.
//!
//! Listeners run on the caller's task while the cache is locked. They get
//! read-only data and must not call back into the cache. A panicking listener
//! is logged and skipped; the cache operation still succeeds.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::Serialize;
use tracing::warn;

// == Delete Reason ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteReason {
    /// `del` was called
    Explicit,
    /// An eviction policy needed the room
    Evicted,
    /// The GC sweep found the deadline reached
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Set,
    Get,
    Delete,
    Flush,
}

// == Cache Event ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent<K> {
    Set { key: K },
    Get { key: K },
    Delete { key: K, reason: DeleteReason },
    /// Every entry was dropped by `clear`
    Flush,
}

impl<K> CacheEvent<K> {
    pub fn kind(&self) -> EventKind {
        match self {
            CacheEvent::Set { .. } => EventKind::Set,
            CacheEvent::Get { .. } => EventKind::Get,
            CacheEvent::Delete { .. } => EventKind::Delete,
            CacheEvent::Flush => EventKind::Flush,
        }
    }

    pub fn key(&self) -> Option<&K> {
        match self {
            CacheEvent::Set { key } | CacheEvent::Get { key } | CacheEvent::Delete { key, .. } => {
                Some(key)
            }
            CacheEvent::Flush => None,
        }
    }

    pub fn reason(&self) -> Option<DeleteReason> {
        match self {
            CacheEvent::Delete { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// Callback registered with [`Cache::on_event`](crate::cache::Cache::on_event).
pub type Listener<K> = Box<dyn Fn(&CacheEvent<K>) + Send + Sync>;

/// Handle for removing a listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// == Listener Registry ==
pub(crate) struct Listeners<K> {
    next_id: u64,
    registered: Vec<(ListenerId, Listener<K>)>,
}

impl<K> Listeners<K> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            registered: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, listener: Listener<K>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.registered.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.registered.len();
        self.registered.retain(|(registered, _)| *registered != id);
        self.registered.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.registered.len()
    }

    /// Delivers `event` to every listener in registration order.
    pub(crate) fn emit(&self, event: &CacheEvent<K>) {
        for (id, listener) in &self.registered {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                warn!(listener = id.0, kind = ?event.kind(), "Cache event listener panicked");
            }
        }
    }
}

impl<K> fmt::Debug for Listeners<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("registered", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Listener<String>, Arc<Mutex<Vec<CacheEvent<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: Listener<String> = Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        });
        (listener, seen)
    }

    #[test]
    fn test_event_accessors() {
        let event = CacheEvent::Delete {
            key: "k".to_string(),
            reason: DeleteReason::Expired,
        };
        assert_eq!(event.kind(), EventKind::Delete);
        assert_eq!(event.key(), Some(&"k".to_string()));
        assert_eq!(event.reason(), Some(DeleteReason::Expired));

        let flush: CacheEvent<String> = CacheEvent::Flush;
        assert_eq!(flush.key(), None);
        assert_eq!(flush.reason(), None);
    }

    #[test]
    fn test_delete_records_sort_by_key_then_reason() {
        let mut deletes = vec![
            ("b".to_string(), DeleteReason::Expired),
            ("a".to_string(), DeleteReason::Expired),
            ("a".to_string(), DeleteReason::Explicit),
        ];
        deletes.sort();

        assert_eq!(
            deletes,
            vec![
                ("a".to_string(), DeleteReason::Explicit),
                ("a".to_string(), DeleteReason::Expired),
                ("b".to_string(), DeleteReason::Expired),
            ]
        );
    }

    #[test]
    fn test_emit_reaches_listeners_in_order() {
        let mut listeners = Listeners::new();
        let (first, seen_first) = recorder();
        let (second, seen_second) = recorder();
        listeners.add(first);
        let second_id = listeners.add(second);

        listeners.emit(&CacheEvent::Set { key: "a".to_string() });
        assert!(listeners.remove(second_id));
        assert!(!listeners.remove(second_id));
        listeners.emit(&CacheEvent::Get { key: "a".to_string() });

        assert_eq!(seen_first.lock().unwrap().len(), 2);
        assert_eq!(seen_second.lock().unwrap().len(), 1);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let mut listeners = Listeners::new();
        listeners.add(Box::new(|_: &CacheEvent<String>| panic!("listener bug")));
        let (recording, seen) = recorder();
        listeners.add(recording);

        listeners.emit(&CacheEvent::Flush);

        assert_eq!(*seen.lock().unwrap(), vec![CacheEvent::Flush]);
    }
}
