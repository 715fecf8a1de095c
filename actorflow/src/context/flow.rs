//! The explicit execution context handed to every actor.

use super::identity::FlowIdentity;
use crate::actor::Actor;
use crate::cancellation::StopToken;
use crate::config::{ErrorHandling, FlowConfig};
use crate::db::DatabaseConnection;
use crate::errors::{DatabaseError, VariableError};
use crate::events::{EventSink, FlowEvent, FlowEventType, NoOpEventSink};
use crate::interactive::{HeadlessInteraction, UserInteraction};
use crate::provenance::ProvenanceTracker;
use crate::storage::Storage;
use crate::variables::VariableStore;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// A callable actor shared between the flow and the actors invoking it.
pub type CallableActor = Arc<tokio::sync::Mutex<Box<dyn Actor>>>;

/// Why a run stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// Requested by a handle or an actor (e.g. an interactive cancel).
    Requested,
    /// Caused by a fatal actor error.
    Error,
}

#[derive(Debug, Clone)]
struct FlowStop {
    cause: StopCause,
    message: String,
}

/// Everything an actor may touch besides its own configuration: variables,
/// storage, provenance, collaborators and the flow's stop signal.
///
/// One context exists per flow. Actors receive it by reference at set-up,
/// execution and wrap-up; nothing is looked up through globals.
pub struct FlowContext {
    identity: RwLock<FlowIdentity>,
    config: FlowConfig,
    variables: Arc<VariableStore>,
    storage: Arc<Storage>,
    provenance: Arc<ProvenanceTracker>,
    database: Option<Arc<dyn DatabaseConnection>>,
    interaction: Arc<dyn UserInteraction>,
    event_sink: Arc<dyn EventSink>,
    stop: Arc<StopToken>,
    stop_state: RwLock<Option<FlowStop>>,
    errors: RwLock<Vec<String>>,
    callables: DashMap<String, CallableActor>,
}

impl FlowContext {
    /// Creates a context for `flow_name` from `config`.
    #[must_use]
    pub fn new(flow_name: impl Into<String>, config: FlowConfig) -> Self {
        let variables = VariableStore::new()
            .with_unset_policy(config.unset_variable_policy)
            .with_environment(config.import_environment);
        let provenance = ProvenanceTracker::new(config.provenance_enabled);
        Self {
            identity: RwLock::new(FlowIdentity::new(flow_name)),
            config,
            variables: Arc::new(variables),
            storage: Arc::new(Storage::new()),
            provenance: Arc::new(provenance),
            database: None,
            interaction: Arc::new(HeadlessInteraction::accepting()),
            event_sink: Arc::new(NoOpEventSink),
            stop: Arc::new(StopToken::new()),
            stop_state: RwLock::new(None),
            errors: RwLock::new(Vec::new()),
            callables: DashMap::new(),
        }
    }

    /// Sets the database collaborator.
    #[must_use]
    pub fn with_database(mut self, database: Arc<dyn DatabaseConnection>) -> Self {
        self.database = Some(database);
        self
    }

    /// Sets the interaction collaborator. Ignored in headless mode.
    #[must_use]
    pub fn with_interaction(mut self, interaction: Arc<dyn UserInteraction>) -> Self {
        self.interaction = interaction;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Shares an existing variable store.
    #[must_use]
    pub fn with_variables(mut self, variables: Arc<VariableStore>) -> Self {
        self.variables = variables;
        self
    }

    /// Shares an existing storage.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<Storage>) -> Self {
        self.storage = storage;
        self
    }

    /// Returns the current run identity.
    #[must_use]
    pub fn identity(&self) -> FlowIdentity {
        self.identity.read().clone()
    }

    /// Returns the flow name.
    #[must_use]
    pub fn flow_name(&self) -> String {
        self.identity.read().flow_name.clone()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Returns the error handling mode.
    #[must_use]
    pub fn error_handling(&self) -> ErrorHandling {
        self.config.error_handling
    }

    /// Returns true when running without a user.
    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.config.headless
    }

    /// Returns the variable store.
    #[must_use]
    pub fn variables(&self) -> &Arc<VariableStore> {
        &self.variables
    }

    /// Expands `@{...}` placeholders with the store's default policy.
    pub fn expand(&self, template: &str) -> Result<String, VariableError> {
        self.variables.expand(template)
    }

    /// Returns the storage.
    #[must_use]
    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    /// Returns the provenance tracker.
    #[must_use]
    pub fn provenance(&self) -> &Arc<ProvenanceTracker> {
        &self.provenance
    }

    /// Returns the database connection.
    pub fn database(&self) -> Result<&Arc<dyn DatabaseConnection>, DatabaseError> {
        self.database.as_ref().ok_or(DatabaseError::NotConnected)
    }

    /// Returns the interaction collaborator; the deterministic headless
    /// substitute when running headless.
    #[must_use]
    pub fn interaction(&self) -> Arc<dyn UserInteraction> {
        if self.config.headless {
            Arc::new(HeadlessInteraction::accepting())
        } else {
            Arc::clone(&self.interaction)
        }
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Emits an event for `actor` (or the flow itself).
    pub async fn emit(
        &self,
        event_type: FlowEventType,
        actor: Option<&str>,
        data: Option<serde_json::Value>,
    ) {
        self.event_sink.emit(self.event(event_type, actor, data)).await;
    }

    /// Emits an event without awaiting.
    pub fn try_emit(
        &self,
        event_type: FlowEventType,
        actor: Option<&str>,
        data: Option<serde_json::Value>,
    ) {
        self.event_sink.try_emit(self.event(event_type, actor, data));
    }

    fn event(
        &self,
        event_type: FlowEventType,
        actor: Option<&str>,
        data: Option<serde_json::Value>,
    ) -> FlowEvent {
        let mut event = FlowEvent::new(event_type, self.flow_name());
        if let Some(actor) = actor {
            event = event.with_actor(actor);
        }
        if let Some(data) = data {
            event = event.with_data(data);
        }
        event
    }

    /// Returns the flow's stop token.
    #[must_use]
    pub fn stop_token(&self) -> &Arc<StopToken> {
        &self.stop
    }

    /// Returns true once the flow has been stopped, for any reason.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Stops the flow without marking it failed. The first stop wins.
    pub fn stop_flow(&self, message: impl Into<String>) {
        self.record_stop(StopCause::Requested, message.into());
    }

    /// Stops the flow because of a fatal error. The first stop wins.
    pub fn fail_flow(&self, message: impl Into<String>) {
        self.record_stop(StopCause::Error, message.into());
    }

    fn record_stop(&self, cause: StopCause, message: String) {
        {
            let mut state = self.stop_state.write();
            if state.is_some() {
                debug!(message = %message, "Flow already stopped");
                return;
            }
            *state = Some(FlowStop {
                cause,
                message: message.clone(),
            });
        }
        match cause {
            StopCause::Requested => debug!(message = %message, "Flow stop requested"),
            StopCause::Error => warn!(message = %message, "Flow stopped on error"),
        }
        self.stop.stop(message);
    }

    /// Returns why the flow stopped, if it did.
    #[must_use]
    pub fn stop_cause(&self) -> Option<StopCause> {
        self.stop_state.read().as_ref().map(|s| s.cause)
    }

    /// Returns the stop message, if the flow stopped.
    #[must_use]
    pub fn stop_message(&self) -> Option<String> {
        self.stop_state.read().as_ref().map(|s| s.message.clone())
    }

    /// Records a non-fatal actor error.
    pub fn record_error(&self, message: impl Into<String>) {
        self.errors.write().push(message.into());
    }

    /// Returns the errors recorded during the current run.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.read().clone()
    }

    /// Registers a callable actor under `name`.
    pub fn register_callable(&self, name: impl Into<String>, actor: Box<dyn Actor>) {
        self.callables
            .insert(name.into(), Arc::new(tokio::sync::Mutex::new(actor)));
    }

    /// Returns the callable actor registered under `name`.
    #[must_use]
    pub fn callable(&self, name: &str) -> Option<CallableActor> {
        self.callables.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns true if a callable actor is registered under `name`.
    #[must_use]
    pub fn has_callable(&self, name: &str) -> bool {
        self.callables.contains_key(name)
    }

    /// Prepares the context for a new run: fresh run ID, no stop, no errors.
    /// Variables and storage are kept.
    pub fn begin_run(&self) {
        let next = self.identity.read().next_run();
        *self.identity.write() = next;
        self.stop.reset();
        *self.stop_state.write() = None;
        self.errors.write().clear();
    }

    /// Flow teardown: drops all variables with their listeners, and all
    /// storage.
    pub fn clean_up(&self) {
        self.variables.clean_up();
        self.storage.clear();
        self.storage.clear_listeners();
    }
}

impl std::fmt::Debug for FlowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowContext")
            .field("identity", &*self.identity.read())
            .field("config", &self.config)
            .field("variables", &self.variables)
            .field("storage", &self.storage)
            .field("has_database", &self.database.is_some())
            .field("stopped", &self.is_stopped())
            .field("callables", &self.callables.len())
            .finish()
    }
}
