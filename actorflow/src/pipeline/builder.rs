//! Flow builder with validation.

use super::flow::Flow;
use super::sequence::{validate_name, Sequence};
use crate::actor::Actor;
use crate::config::FlowConfig;
use crate::context::FlowContext;
use crate::db::DatabaseConnection;
use crate::errors::PipelineValidationError;
use crate::events::EventSink;
use crate::interactive::UserInteraction;
use crate::storage::Storage;
use crate::variables::VariableStore;
use std::collections::HashSet;
use std::sync::Arc;

/// Builder for creating validated flows.
pub struct PipelineBuilder {
    name: String,
    config: FlowConfig,
    actors: Vec<Box<dyn Actor>>,
    callables: Vec<Box<dyn Actor>>,
    variables: Vec<(String, String)>,
    shared_variables: Option<Arc<VariableStore>>,
    shared_storage: Option<Arc<Storage>>,
    database: Option<Arc<dyn DatabaseConnection>>,
    interaction: Option<Arc<dyn UserInteraction>>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl PipelineBuilder {
    /// Creates a builder for a flow called `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: FlowConfig::default(),
            actors: Vec::new(),
            callables: Vec::new(),
            variables: Vec::new(),
            shared_variables: None,
            shared_storage: None,
            database: None,
            interaction: None,
            event_sink: None,
        }
    }

    /// Sets the flow configuration.
    #[must_use]
    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Appends an actor to the main sequence.
    #[must_use]
    pub fn actor(self, actor: impl Actor + 'static) -> Self {
        self.add_actor(Box::new(actor))
    }

    /// Appends a boxed actor to the main sequence.
    #[must_use]
    pub fn add_actor(mut self, actor: Box<dyn Actor>) -> Self {
        self.actors.push(actor);
        self
    }

    /// Registers a callable actor under its own name.
    #[must_use]
    pub fn callable(mut self, actor: impl Actor + 'static) -> Self {
        self.callables.push(Box::new(actor));
        self
    }

    /// Sets a variable before the first run.
    #[must_use]
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// Shares an existing variable store with the flow.
    #[must_use]
    pub fn with_variables(mut self, variables: Arc<VariableStore>) -> Self {
        self.shared_variables = Some(variables);
        self
    }

    /// Shares an existing storage with the flow.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<Storage>) -> Self {
        self.shared_storage = Some(storage);
        self
    }

    /// Sets the database collaborator.
    #[must_use]
    pub fn with_database(mut self, database: Arc<dyn DatabaseConnection>) -> Self {
        self.database = Some(database);
        self
    }

    /// Sets the interaction collaborator.
    #[must_use]
    pub fn with_interaction(mut self, interaction: Arc<dyn UserInteraction>) -> Self {
        self.interaction = Some(interaction);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Returns the flow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of actors in the main sequence.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Validates the actors and builds the flow.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty sequence, invalid or duplicate names,
    /// misplaced actors, incompatible neighbours, unknown callables or
    /// initial variables with invalid names.
    pub fn build(self) -> Result<Flow, PipelineValidationError> {
        if self.actors.is_empty() {
            return Err(PipelineValidationError::coded(
                "FLOW-001-EMPTY",
                format!("Flow '{}' has no actors", self.name),
            ));
        }

        let mut names = HashSet::new();
        for actor in self.actors.iter().chain(&self.callables) {
            let name = actor.base().name();
            validate_name(name)?;
            if !names.insert(name.to_string()) {
                return Err(PipelineValidationError::coded(
                    "FLOW-002-DUPLICATE_NAME",
                    format!("Duplicate actor name '{name}'"),
                )
                .with_actors(vec![name.to_string()]));
            }
        }

        Sequence::validate(&self.actors, true)?;

        let callable_names: Vec<String> = self
            .callables
            .iter()
            .map(|a| a.base().name().to_string())
            .collect();
        let mut sequence = Sequence::new(self.actors);
        let referenced = sequence
            .referenced_callables()
            .into_iter()
            .chain(self.callables.iter().flat_map(|a| a.referenced_callables()));
        for callable in referenced {
            if !callable_names.contains(&callable) {
                return Err(PipelineValidationError::coded(
                    "FLOW-005-UNKNOWN_CALLABLE",
                    format!("Unknown callable actor '{callable}'"),
                )
                .with_actors(vec![callable]));
            }
        }

        let mut ctx = FlowContext::new(&self.name, self.config);
        if let Some(variables) = self.shared_variables {
            ctx = ctx.with_variables(variables);
        }
        if let Some(storage) = self.shared_storage {
            ctx = ctx.with_storage(storage);
        }
        if let Some(database) = self.database {
            ctx = ctx.with_database(database);
        }
        if let Some(interaction) = self.interaction {
            ctx = ctx.with_interaction(interaction);
        }
        if let Some(sink) = self.event_sink {
            ctx = ctx.with_event_sink(sink);
        }
        for (name, value) in &self.variables {
            ctx.variables().set(name, value.clone()).map_err(|e| {
                PipelineValidationError::new(format!("Initial variable: {e}"))
            })?;
        }

        sequence.set_parent(&self.name);
        for mut callable in self.callables {
            callable.set_parent(&self.name);
            let name = callable.base().name().to_string();
            ctx.register_callable(name, callable);
        }

        Ok(Flow::new(self.name, sequence, callable_names, Arc::new(ctx)))
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("actors", &self.actors)
            .field("callables", &self.callables)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}
