//! Snapshots of an actor's derived state.

use std::any::Any;
use std::collections::HashMap;

/// A key-addressed snapshot of the state an actor wants to survive a
/// variable-driven re-set-up.
///
/// Only derived or externally mutable fields belong here, never the full
/// actor. Restoring a key that is absent is a no-op.
#[derive(Default)]
pub struct BackupState {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl BackupState {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value under `key`.
    pub fn put<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Stores a value under `key`, builder-style.
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.put(key, value);
        self
    }

    /// Returns the value under `key` if it has type `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns the value under `key` if it has type `T`.
    pub fn take<T: Any + Send + Sync>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key).is_some_and(|v| v.is::<T>()) {
            return None;
        }
        self.values
            .remove(key)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Merges another snapshot into this one; `other` wins on conflicts.
    pub fn merge(&mut self, other: Self) {
        self.values.extend(other.values);
    }

    /// Returns the keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for BackupState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupState").field("keys", &self.keys()).finish()
    }
}
