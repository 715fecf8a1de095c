//! Global and cached storage scopes.

use crate::errors::ActorflowError;
use lru::LruCache;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// A stored object.
pub type StorageItem = Arc<dyn Any + Send + Sync>;

/// How a storage change affected a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageChangeType {
    /// A new item.
    Added,
    /// An existing item was overwritten.
    Modified,
    /// An item was removed.
    Removed,
}

/// A change to a single storage item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChangeEvent {
    /// The item name.
    pub name: String,
    /// The cache scope, or `None` for the global scope.
    pub cache: Option<String>,
    /// The kind of change.
    pub change_type: StorageChangeType,
}

/// Receives storage change events, synchronously after the change.
pub trait StorageChangeListener: Send + Sync {
    /// Handles a change event.
    fn storage_changed(&self, event: &StorageChangeEvent);
}

impl<F> StorageChangeListener for F
where
    F: Fn(&StorageChangeEvent) + Send + Sync,
{
    fn storage_changed(&self, event: &StorageChangeEvent) {
        self(event);
    }
}

/// Named object storage with a global scope and LRU cache scopes.
#[derive(Default)]
pub struct Storage {
    global: RwLock<HashMap<String, StorageItem>>,
    caches: RwLock<HashMap<String, LruCache<String, StorageItem>>>,
    listeners: RwLock<Vec<Arc<dyn StorageChangeListener>>>,
}

impl Storage {
    /// Creates empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `name` in the global scope.
    pub fn put<T: Any + Send + Sync>(&self, name: &str, value: T) {
        self.put_item(name, Arc::new(value));
    }

    /// Stores an already shared item in the global scope.
    pub fn put_item(&self, name: &str, item: StorageItem) {
        let previous = self.global.write().insert(name.to_string(), item);
        self.notify(&StorageChangeEvent {
            name: name.to_string(),
            cache: None,
            change_type: change_type(previous.is_some()),
        });
    }

    /// Returns the item stored under `name` in the global scope.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<StorageItem> {
        self.global.read().get(name).cloned()
    }

    /// Returns the global item under `name` if it has type `T`.
    #[must_use]
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name).and_then(|item| item.downcast::<T>().ok())
    }

    /// Returns true if the global scope has an item under `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.global.read().contains_key(name)
    }

    /// Removes an item from the global scope.
    pub fn remove(&self, name: &str) -> Option<StorageItem> {
        let removed = self.global.write().remove(name)?;
        self.notify(&StorageChangeEvent {
            name: name.to_string(),
            cache: None,
            change_type: StorageChangeType::Removed,
        });
        Some(removed)
    }

    /// Adds a cache scope holding at most `capacity` items. Re-adding an
    /// existing cache keeps its content.
    pub fn add_cache(&self, cache: &str, capacity: usize) {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        let mut caches = self.caches.write();
        match caches.get_mut(cache) {
            Some(existing) => existing.resize(capacity),
            None => {
                caches.insert(cache.to_string(), LruCache::new(capacity));
            }
        }
    }

    /// Returns true if the cache scope exists.
    #[must_use]
    pub fn has_cache(&self, cache: &str) -> bool {
        self.caches.read().contains_key(cache)
    }

    /// Stores `value` under `name` in a cache scope. Evicts the least
    /// recently used item when the cache is full.
    pub fn put_in<T: Any + Send + Sync>(
        &self,
        cache: &str,
        name: &str,
        value: T,
    ) -> Result<(), ActorflowError> {
        let previous = {
            let mut caches = self.caches.write();
            let scope = caches
                .get_mut(cache)
                .ok_or_else(|| ActorflowError::Resource(format!("Unknown storage cache: {cache}")))?;
            scope.put(name.to_string(), Arc::new(value) as StorageItem)
        };
        self.notify(&StorageChangeEvent {
            name: name.to_string(),
            cache: Some(cache.to_string()),
            change_type: change_type(previous.is_some()),
        });
        Ok(())
    }

    /// Returns an item from a cache scope, marking it as recently used.
    #[must_use]
    pub fn get_from(&self, cache: &str, name: &str) -> Option<StorageItem> {
        self.caches
            .write()
            .get_mut(cache)
            .and_then(|scope| scope.get(name).cloned())
    }

    /// Returns a cached item under `name` if it has type `T`.
    #[must_use]
    pub fn get_from_as<T: Any + Send + Sync>(&self, cache: &str, name: &str) -> Option<Arc<T>> {
        self.get_from(cache, name)
            .and_then(|item| item.downcast::<T>().ok())
    }

    /// Returns true if the cache scope has an item under `name`.
    #[must_use]
    pub fn has_in(&self, cache: &str, name: &str) -> bool {
        self.caches
            .read()
            .get(cache)
            .is_some_and(|scope| scope.contains(name))
    }

    /// Removes an item from a cache scope.
    pub fn remove_from(&self, cache: &str, name: &str) -> Option<StorageItem> {
        let removed = self.caches.write().get_mut(cache)?.pop(name)?;
        self.notify(&StorageChangeEvent {
            name: name.to_string(),
            cache: Some(cache.to_string()),
            change_type: StorageChangeType::Removed,
        });
        Some(removed)
    }

    /// Removes every item, global or cached, whose name matches `pattern`.
    /// Returns the number of removed items.
    pub fn remove_matching(&self, pattern: &Regex) -> usize {
        let mut removed = 0;
        for name in self.keys() {
            if pattern.is_match(&name) && self.remove(&name).is_some() {
                removed += 1;
            }
        }
        for cache in self.caches() {
            for name in self.cache_keys(&cache) {
                if pattern.is_match(&name) && self.remove_from(&cache, &name).is_some() {
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Returns the global item names, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.global.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the item names of a cache scope, most recently used first.
    #[must_use]
    pub fn cache_keys(&self, cache: &str) -> Vec<String> {
        self.caches
            .read()
            .get(cache)
            .map(|scope| scope.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the cache scope names, sorted.
    #[must_use]
    pub fn caches(&self) -> Vec<String> {
        let mut caches: Vec<String> = self.caches.read().keys().cloned().collect();
        caches.sort();
        caches
    }

    /// Returns the number of global items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.global.read().len()
    }

    /// Returns true if the global scope is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.global.read().is_empty()
    }

    /// Removes all items and cache scopes. Does not notify listeners.
    pub fn clear(&self) {
        self.global.write().clear();
        self.caches.write().clear();
    }

    /// Returns a shallow copy of the global scope, restricted to names
    /// matching `filter` (all, if `None`). Items are shared, not cloned.
    #[must_use]
    pub fn get_clone(&self, filter: Option<&Regex>) -> Self {
        let global = self
            .global
            .read()
            .iter()
            .filter(|(name, _)| filter.map_or(true, |re| re.is_match(name)))
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        Self {
            global: RwLock::new(global),
            caches: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Subscribes a change listener.
    pub fn subscribe(&self, listener: Arc<dyn StorageChangeListener>) {
        self.listeners.write().push(listener);
    }

    /// Drops all change listeners.
    pub fn clear_listeners(&self) {
        self.listeners.write().clear();
    }

    fn notify(&self, event: &StorageChangeEvent) {
        let listeners: Vec<Arc<dyn StorageChangeListener>> = self.listeners.read().clone();
        for listener in listeners {
            listener.storage_changed(event);
        }
    }
}

fn change_type(existed: bool) -> StorageChangeType {
    if existed {
        StorageChangeType::Modified
    } else {
        StorageChangeType::Added
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("keys", &self.keys())
            .field("caches", &self.caches())
            .finish()
    }
}
