//! State shared by every actor implementation.

use super::watcher::VariableWatcher;
use crate::cancellation::StopToken;
use crate::core::{ActorState, Token};
use crate::variables::ListenerId;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// The bookkeeping every actor carries: identity, common options, state,
/// pending outputs, the stop signal and variable bindings.
///
/// Concrete actors embed one and expose it through `Actor::base`.
#[derive(Debug)]
pub struct ActorBase {
    name: String,
    full_name: String,
    skip: bool,
    stop_flow_on_error: bool,
    annotation: String,
    state: ActorState,
    pending: VecDeque<Token>,
    stop: Arc<StopToken>,
    bindings: IndexMap<String, String>,
    watched: Vec<String>,
    watcher: Option<Arc<VariableWatcher>>,
    listener: Option<ListenerId>,
    last_error: Option<String>,
}

impl ActorBase {
    /// Creates the base for an actor called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            full_name: name.clone(),
            name,
            skip: false,
            stop_flow_on_error: false,
            annotation: String::new(),
            state: ActorState::Unconfigured,
            pending: VecDeque::new(),
            stop: Arc::new(StopToken::new()),
            bindings: IndexMap::new(),
            watched: Vec::new(),
            watcher: None,
            listener: None,
            last_error: None,
        }
    }

    /// Returns the actor name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dotted path from the flow root, e.g. `Flow.Sub.Math`.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Places the actor below `parent` in the flow tree.
    pub fn set_parent(&mut self, parent: &str) {
        self.full_name = if parent.is_empty() {
            self.name.clone()
        } else {
            format!("{parent}.{}", self.name)
        };
    }

    /// Returns true if the actor forwards its input unchanged.
    #[must_use]
    pub fn skip(&self) -> bool {
        self.skip
    }

    /// Sets the skip flag.
    pub fn set_skip(&mut self, skip: bool) {
        self.skip = skip;
    }

    /// Returns true if an error of this actor stops the flow.
    #[must_use]
    pub fn stop_flow_on_error(&self) -> bool {
        self.stop_flow_on_error
    }

    /// Sets the stop-flow-on-error flag.
    pub fn set_stop_flow_on_error(&mut self, stop: bool) {
        self.stop_flow_on_error = stop;
    }

    /// Returns the annotation.
    #[must_use]
    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// Sets the annotation.
    pub fn set_annotation(&mut self, annotation: impl Into<String>) {
        self.annotation = annotation.into();
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ActorState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ActorState) {
        self.state = state;
    }

    /// Queues an output token. Ignored once the actor has been stopped.
    pub fn emit(&mut self, token: Token) {
        if self.stop.is_stopped() {
            debug!(actor = %self.full_name, "Dropping output of stopped actor");
            return;
        }
        self.pending.push_back(token);
    }

    /// Returns true if output tokens are queued.
    #[must_use]
    pub fn has_pending_output(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Dequeues the next output token.
    pub fn pop_output(&mut self) -> Option<Token> {
        self.pending.pop_front()
    }

    /// Returns the number of queued output tokens.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drops all queued output tokens.
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Returns a handle on the actor's stop token, usable from other threads.
    #[must_use]
    pub fn stop_token(&self) -> Arc<StopToken> {
        Arc::clone(&self.stop)
    }

    /// Returns true once `stop_execution` has been called in this run.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Cooperative, thread-safe stop: unblocks interactive waits and
    /// suppresses any further output.
    pub fn stop_execution(&self, reason: impl Into<String>) {
        self.stop.stop(reason);
    }

    /// Returns the stop reason, if stopped.
    #[must_use]
    pub fn stop_message(&self) -> Option<String> {
        self.stop.reason()
    }

    pub(crate) fn reset_stop(&mut self) {
        self.stop.reset();
    }

    /// Binds `option` to the variable `variable`.
    pub fn bind(&mut self, option: impl Into<String>, variable: impl Into<String>) {
        self.bindings.insert(option.into(), variable.into());
    }

    /// Removes the binding of `option`. Returns the variable it was bound to.
    pub fn unbind(&mut self, option: &str) -> Option<String> {
        self.bindings.shift_remove(option)
    }

    /// Returns the variable `option` is bound to.
    #[must_use]
    pub fn binding(&self, option: &str) -> Option<&str> {
        self.bindings.get(option).map(String::as_str)
    }

    /// Returns all `(option, variable)` bindings in binding order.
    #[must_use]
    pub fn bindings(&self) -> Vec<(String, String)> {
        self.bindings
            .iter()
            .map(|(o, v)| (o.clone(), v.clone()))
            .collect()
    }

    /// Adds a variable to watch besides the bound and referenced ones.
    pub fn watch(&mut self, variable: impl Into<String>) {
        let variable = variable.into();
        if !self.watched.contains(&variable) {
            self.watched.push(variable);
        }
    }

    /// Returns the explicitly watched variables.
    #[must_use]
    pub fn watched(&self) -> &[String] {
        &self.watched
    }

    pub(crate) fn attach_watcher(&mut self, watcher: Arc<VariableWatcher>, listener: ListenerId) {
        self.watcher = Some(watcher);
        self.listener = Some(listener);
    }

    pub(crate) fn detach_watcher(&mut self) -> Option<ListenerId> {
        self.watcher = None;
        self.listener.take()
    }

    /// Returns the active variable watcher, if any.
    #[must_use]
    pub fn watcher(&self) -> Option<&Arc<VariableWatcher>> {
        self.watcher.as_ref()
    }

    /// Returns the last error message.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn set_last_error(&mut self, error: Option<String>) {
        self.last_error = error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let mut base = ActorBase::new("Math");
        assert_eq!(base.full_name(), "Math");

        base.set_parent("Flow.Sub");
        assert_eq!(base.full_name(), "Flow.Sub.Math");
        assert_eq!(base.name(), "Math");
    }

    #[test]
    fn test_pending_fifo() {
        let mut base = ActorBase::new("A");
        base.emit(Token::new(1_i64));
        base.emit(Token::new(2_i64));

        assert_eq!(base.pending_count(), 2);
        assert_eq!(base.pop_output().unwrap().payload().as_f64(), Some(1.0));
        assert_eq!(base.pop_output().unwrap().payload().as_f64(), Some(2.0));
        assert!(!base.has_pending_output());
    }

    #[test]
    fn test_emit_after_stop_is_dropped() {
        let mut base = ActorBase::new("A");
        base.stop_execution("stop");
        base.emit(Token::new(1_i64));

        assert!(!base.has_pending_output());
        assert_eq!(base.stop_message().as_deref(), Some("stop"));
    }

    #[test]
    fn test_stop_token_shared_across_threads() {
        let base = ActorBase::new("A");
        let token = base.stop_token();
        std::thread::spawn(move || token.stop("remote"))
            .join()
            .unwrap();
        assert!(base.is_stopped());
    }

    #[test]
    fn test_bindings_ordered() {
        let mut base = ActorBase::new("A");
        base.bind("factor", "f");
        base.bind("expression", "e");

        assert_eq!(
            base.bindings(),
            vec![
                ("factor".to_string(), "f".to_string()),
                ("expression".to_string(), "e".to_string())
            ]
        );
        assert_eq!(base.unbind("factor").as_deref(), Some("f"));
        assert_eq!(base.binding("factor"), None);
    }

    #[test]
    fn test_watch_dedups() {
        let mut base = ActorBase::new("A");
        base.watch("x");
        base.watch("x");
        assert_eq!(base.watched(), &["x".to_string()]);
    }
}
