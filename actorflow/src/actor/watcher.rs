//! Records changes to the variables an actor depends on.

use crate::variables::{VariableChangeEvent, VariableChangeListener, VariableChangeType};
use parking_lot::Mutex;
use std::collections::HashSet;

/// Subscribed to the flow's variable store while an actor is set up.
///
/// Matches exact names only, in the store of the owning flow. Removals are
/// not recorded: a removed variable cannot be re-applied.
#[derive(Debug, Default)]
pub struct VariableWatcher {
    names: HashSet<String>,
    changes: Mutex<Vec<VariableChangeEvent>>,
}

impl VariableWatcher {
    /// Creates a watcher for `names`.
    #[must_use]
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            names: names.into_iter().collect(),
            changes: Mutex::new(Vec::new()),
        }
    }

    /// Returns true if `name` is watched.
    #[must_use]
    pub fn watches(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns true if changes were recorded since the last take.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.lock().is_empty()
    }

    /// Returns and clears the recorded changes, oldest first.
    pub fn take_changes(&self) -> Vec<VariableChangeEvent> {
        std::mem::take(&mut *self.changes.lock())
    }
}

impl VariableChangeListener for VariableWatcher {
    fn variable_changed(&self, event: &VariableChangeEvent) {
        if event.change_type != VariableChangeType::Removed && self.watches(&event.name) {
            self.changes.lock().push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableStore;
    use std::sync::Arc;

    #[test]
    fn test_records_exact_name_changes_only() {
        let store = VariableStore::new();
        let watcher = Arc::new(VariableWatcher::new(vec!["exp".to_string()]));
        store.subscribe(watcher.clone());

        store.set("exp", "2").unwrap();
        store.set("exponent", "9").unwrap();
        store.set("exp", "3").unwrap();
        store.remove("exp");

        let changes = watcher.take_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].new_value.as_deref(), Some("3"));
        assert!(!watcher.has_changes());
    }
}
