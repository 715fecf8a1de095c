//! Flow-scoped string variables.
//!
//! Configuration strings reference variables with `@{name}` placeholders.
//! The store notifies subscribed listeners synchronously whenever a
//! variable is added, modified or removed.

pub mod names;
mod store;
mod store_tests;

pub use names::{extract_name, extract_names, is_placeholder, is_valid_name, pad_name, to_valid_name};
pub use store::{
    ListenerId, UnsetPolicy, VariableChangeEvent, VariableChangeListener, VariableChangeType,
    VariableStore,
};
