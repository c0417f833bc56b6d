//! Backend Module
//!
//! The map the cache engine stores entries in. The engine is the only
//! writer; policies never see the backend.

use std::collections::HashMap;
use std::hash::Hash;

/// Map-like storage a [`Cache`](crate::cache::Cache) can be built on.
pub trait Backend<K, V>: Send {
    fn get(&self, key: &K) -> Option<&V>;

    fn get_mut(&mut self, key: &K) -> Option<&mut V>;

    /// Inserts or overwrites.
    fn set(&mut self, key: K, value: V);

    /// Returns `true` if something was removed.
    fn delete(&mut self, key: &K) -> bool;

    fn size(&self) -> usize;

    fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    fn keys(&self) -> Vec<K>;

    fn clear(&mut self);
}

// == HashMap Backend ==
/// Default backend over `std::collections::HashMap`.
#[derive(Debug)]
pub struct HashMapBackend<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> HashMapBackend<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K, V> Default for HashMapBackend<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Backend<K, V> for HashMapBackend<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Send,
{
    fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    fn set(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    fn delete(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}
