//! The per-flow variable store.

use super::names::{is_valid_name, pad_name, ENV_PREFIX, START};
use crate::errors::VariableError;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// How a variable change affected the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableChangeType {
    /// The variable did not exist before.
    Added,
    /// The variable existed and was overwritten.
    Modified,
    /// The variable was removed.
    Removed,
}

/// A change to a single variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableChangeEvent {
    /// The variable name.
    pub name: String,
    /// The value before the change.
    pub old_value: Option<String>,
    /// The value after the change; `None` for removals.
    pub new_value: Option<String>,
    /// The kind of change.
    pub change_type: VariableChangeType,
}

/// Receives variable change events.
///
/// Called synchronously on the thread performing the change, after the
/// store has been updated. Implementations must not block on I/O.
pub trait VariableChangeListener: Send + Sync {
    /// Handles a change event.
    fn variable_changed(&self, event: &VariableChangeEvent);
}

impl<F> VariableChangeListener for F
where
    F: Fn(&VariableChangeEvent) + Send + Sync,
{
    fn variable_changed(&self, event: &VariableChangeEvent) {
        self(event);
    }
}

/// Identifies a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What to do with a placeholder whose variable is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsetPolicy {
    /// Leave `@{name}` in the output.
    #[default]
    Keep,
    /// Substitute an empty string.
    Empty,
    /// Fail with [`VariableError::NotSet`].
    Fail,
}

type ListenerList = Vec<(ListenerId, Arc<dyn VariableChangeListener>)>;

/// Mapping from variable name to string value, with change notification.
///
/// Listeners are notified in subscription order after the map mutation has
/// been committed and before the mutating call returns. No lock is held
/// while listeners run, so they may read the store.
pub struct VariableStore {
    values: RwLock<HashMap<String, String>>,
    listeners: RwLock<ListenerList>,
    next_listener: AtomicU64,
    unset_policy: UnsetPolicy,
    import_environment: bool,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore {
    /// Creates an empty store with the `Keep` policy and environment access.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            unset_policy: UnsetPolicy::Keep,
            import_environment: true,
        }
    }

    /// Sets the default policy used by [`expand`](Self::expand).
    #[must_use]
    pub fn with_unset_policy(mut self, policy: UnsetPolicy) -> Self {
        self.unset_policy = policy;
        self
    }

    /// Enables or disables the read-only `env.` variables.
    #[must_use]
    pub fn with_environment(mut self, import: bool) -> Self {
        self.import_environment = import;
        self
    }

    /// Returns the default unset policy.
    #[must_use]
    pub fn unset_policy(&self) -> UnsetPolicy {
        self.unset_policy
    }

    fn is_env_name(&self, name: &str) -> bool {
        self.import_environment && name.starts_with(ENV_PREFIX)
    }

    /// Returns the value of a variable.
    pub fn get(&self, name: &str) -> Result<String, VariableError> {
        if self.is_env_name(name) {
            return std::env::var(&name[ENV_PREFIX.len()..])
                .map_err(|_| VariableError::NotSet(name.to_string()));
        }
        self.values
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| VariableError::NotSet(name.to_string()))
    }

    /// Returns true if the variable is set.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        if self.is_env_name(name) {
            return std::env::var_os(&name[ENV_PREFIX.len()..]).is_some();
        }
        self.values.read().contains_key(name)
    }

    /// Sets a variable and notifies all listeners.
    ///
    /// `env.` variables are read-only; setting one is ignored.
    pub fn set(&self, name: &str, value: impl Into<String>) -> Result<(), VariableError> {
        if !is_valid_name(name) {
            return Err(VariableError::InvalidName(name.to_string()));
        }
        if self.is_env_name(name) {
            debug!(variable = %name, "Ignoring write to read-only environment variable");
            return Ok(());
        }

        let value = value.into();
        let old_value = self.values.write().insert(name.to_string(), value.clone());
        let change_type = if old_value.is_some() {
            VariableChangeType::Modified
        } else {
            VariableChangeType::Added
        };
        self.notify(&VariableChangeEvent {
            name: name.to_string(),
            old_value,
            new_value: Some(value),
            change_type,
        });
        Ok(())
    }

    /// Removes a variable, returning its value. Fires a `Removed` event if
    /// the variable existed.
    pub fn remove(&self, name: &str) -> Option<String> {
        let old_value = self.values.write().remove(name)?;
        self.notify(&VariableChangeEvent {
            name: name.to_string(),
            old_value: Some(old_value.clone()),
            new_value: None,
            change_type: VariableChangeType::Removed,
        });
        Some(old_value)
    }

    /// Removes every variable whose name matches `pattern`. Returns the
    /// removed names.
    pub fn remove_matching(&self, pattern: &Regex) -> Vec<String> {
        let mut matching: Vec<String> = self
            .values
            .read()
            .keys()
            .filter(|name| pattern.is_match(name))
            .cloned()
            .collect();
        matching.sort();
        matching.retain(|name| self.remove(name).is_some());
        matching
    }

    /// Removes all variables, firing a `Removed` event for each.
    pub fn clear(&self) {
        for name in self.names() {
            self.remove(&name);
        }
    }

    /// Drops all values and listeners without notifying anyone.
    pub fn clean_up(&self) {
        self.listeners.write().clear();
        self.values.write().clear();
    }

    /// Returns all variable names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Returns true if no variables are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Returns a listener-free copy of the store containing the variables
    /// whose names match `filter` (all, if `None`).
    #[must_use]
    pub fn get_clone(&self, filter: Option<&Regex>) -> Self {
        let values: HashMap<String, String> = self
            .values
            .read()
            .iter()
            .filter(|(name, _)| filter.map_or(true, |re| re.is_match(name)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self {
            values: RwLock::new(values),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            unset_policy: self.unset_policy,
            import_environment: self.import_environment,
        }
    }

    /// Copies the variables of `other` matching `filter` into this store,
    /// notifying listeners for each one.
    pub fn assign(&self, other: &Self, filter: Option<&Regex>) -> Result<(), VariableError> {
        for name in other.names() {
            if filter.map_or(true, |re| re.is_match(&name)) {
                let value = other.get(&name)?;
                self.set(&name, value)?;
            }
        }
        Ok(())
    }

    /// Subscribes a listener. Listeners are notified in subscription order.
    pub fn subscribe(&self, listener: Arc<dyn VariableChangeListener>) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, listener));
        id
    }

    /// Unsubscribes a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Returns the number of subscribed listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn notify(&self, event: &VariableChangeEvent) {
        let listeners: Vec<Arc<dyn VariableChangeListener>> =
            self.listeners.read().iter().map(|(_, l)| Arc::clone(l)).collect();
        for listener in listeners {
            listener.variable_changed(event);
        }
    }

    /// Expands every `@{name}` in `template` using the store's default policy.
    pub fn expand(&self, template: &str) -> Result<String, VariableError> {
        self.expand_with(template, self.unset_policy)
    }

    /// Expands every `@{name}` in `template` using `policy` for unset
    /// variables.
    ///
    /// Substituted values are not scanned again, so expansion is idempotent
    /// on its own output. A nested reference such as `@{@{inner}}` resolves
    /// the inner placeholder first and then looks up the resulting name.
    pub fn expand_with(&self, template: &str, policy: UnsetPolicy) -> Result<String, VariableError> {
        if !template.contains(START) {
            return Ok(template.to_string());
        }

        let bytes = template.as_bytes();
        let mut out = String::with_capacity(template.len());
        let mut i = 0;
        while i < template.len() {
            if bytes[i..].starts_with(START.as_bytes()) {
                if let Some(end) = matching_end(template, i + START.len()) {
                    let inner = &template[i + START.len()..end];
                    let name = if inner.contains(START) {
                        self.expand_with(inner, policy)?
                    } else {
                        inner.to_string()
                    };
                    out.push_str(&self.resolve(&name, policy)?);
                    i = end + 1;
                    continue;
                }
            }
            let ch_len = utf8_len(bytes[i]);
            out.push_str(&template[i..i + ch_len]);
            i += ch_len;
        }
        Ok(out)
    }

    fn resolve(&self, name: &str, policy: UnsetPolicy) -> Result<String, VariableError> {
        if !is_valid_name(name) {
            return Ok(pad_name(name));
        }
        match self.get(name) {
            Ok(value) => Ok(value),
            Err(err) => match policy {
                UnsetPolicy::Keep => Ok(pad_name(name)),
                UnsetPolicy::Empty => Ok(String::new()),
                UnsetPolicy::Fail => Err(err),
            },
        }
    }
}

/// Finds the `}` closing the placeholder whose body starts at `start`,
/// skipping over nested placeholders.
fn matching_end(s: &str, start: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 1;
    let mut j = start;
    while j < bytes.len() {
        if bytes[j..].starts_with(START.as_bytes()) {
            depth += 1;
            j += START.len();
            continue;
        }
        if bytes[j] == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

impl std::fmt::Debug for VariableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableStore")
            .field("len", &self.len())
            .field("listeners", &self.listener_count())
            .field("unset_policy", &self.unset_policy)
            .finish()
    }
}
