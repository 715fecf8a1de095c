//! Flow-scoped object storage for sharing data between distant actors.
//!
//! Items live either in the global scope or in a named LRU cache scope.
//! Writing an existing key overwrites it; merging, where wanted, is up to
//! the writing actor.

mod store;

pub use store::{Storage, StorageChangeEvent, StorageChangeListener, StorageChangeType, StorageItem};
