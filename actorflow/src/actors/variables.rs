//! Actors that write flow variables.

use crate::actor::{Actor, ActorBase, ActorOption, Configurable};
use crate::configurable_options;
use crate::context::FlowContext;
use crate::core::{PayloadType, Token};
use crate::errors::ActorflowError;
use crate::variables::is_valid_name;
use async_trait::async_trait;
use std::collections::VecDeque;
use tracing::warn;

fn check_name(actor: &ActorBase, option: &str, name: &str) -> Result<(), ActorflowError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(ActorflowError::configuration(
            actor.full_name(),
            format!("Invalid variable name for '{option}': '{name}'"),
        ))
    }
}

/// Sets a variable for every token passing through, then forwards the
/// token.
///
/// With an empty `variable-value` the token itself, as text, becomes the
/// value. Otherwise the value is expanded against the current variables.
#[derive(Debug)]
pub struct SetVariable {
    base: ActorBase,
    variable_name: String,
    variable_value: String,
}

impl SetVariable {
    /// Creates an actor storing each token in `variable_name`.
    #[must_use]
    pub fn new(name: impl Into<String>, variable_name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            variable_name: variable_name.into(),
            variable_value: String::new(),
        }
    }

    /// Stores a fixed, expandable value instead of the token.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.variable_value = value.into();
        self
    }
}

impl Configurable for SetVariable {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "variable-name",
            description: "The variable to set.",
            set: |a, v| {
                a.variable_name = v.to_string();
                Ok(())
            },
            get: |a| a.variable_name.clone(),
        },
        ActorOption {
            name: "variable-value",
            description: "The value; empty to use the token.",
            set: |a, v| {
                a.variable_value = v.to_string();
                Ok(())
            },
            get: |a| a.variable_value.clone(),
        },
    ];
}

#[async_trait]
impl Actor for SetVariable {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        check_name(&self.base, "variable-name", &self.variable_name)
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        let value = if self.variable_value.is_empty() {
            match &input {
                Some(token) => token.payload().to_string(),
                None => return Ok(()),
            }
        } else {
            ctx.expand(&self.variable_value)?
        };
        ctx.variables().set(&self.variable_name, value)?;
        if let Some(token) = input {
            self.base.emit(token);
        }
        Ok(())
    }

    configurable_options!();
}

/// Sets several variables to fixed, expandable values, in order, then
/// forwards the token.
#[derive(Debug)]
pub struct SetManyVariables {
    base: ActorBase,
    assignments: Vec<(String, String)>,
}

impl SetManyVariables {
    /// Creates an actor with no assignments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            assignments: Vec::new(),
        }
    }

    /// Adds an assignment.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.assignments.push((name.into(), value.into()));
        self
    }

    fn parse_assignments(text: &str) -> Result<Vec<(String, String)>, String> {
        text.split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.split_once('=')
                    .map(|(name, value)| (name.trim().to_string(), value.to_string()))
                    .ok_or_else(|| format!("Expected name=value, got '{part}'"))
            })
            .collect()
    }
}

impl Configurable for SetManyVariables {
    const OPTIONS: &'static [ActorOption<Self>] = &[ActorOption {
        name: "variables",
        description: "Assignments as 'name=value' pairs separated by ';'.",
        set: |a, v| {
            a.assignments = SetManyVariables::parse_assignments(v)?;
            Ok(())
        },
        get: |a| {
            a.assignments
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(";")
        },
    }];
}

#[async_trait]
impl Actor for SetManyVariables {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        for (name, _) in &self.assignments {
            check_name(&self.base, "variables", name)?;
        }
        Ok(())
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        for (name, value) in &self.assignments {
            let value = ctx.expand(value)?;
            ctx.variables().set(name, value)?;
        }
        if let Some(token) = input {
            self.base.emit(token);
        }
        Ok(())
    }

    configurable_options!();
}

/// Iterates the entries of a map token.
///
/// Each entry becomes one pending output: before the output is handed
/// downstream, `key-variable` and `value-variable` are set to that entry,
/// and the same map token is re-emitted.
#[derive(Debug)]
pub struct MapVariableIterator {
    base: ActorBase,
    key_variable: String,
    value_variable: String,
    current: Option<Token>,
    entries: VecDeque<(String, String)>,
}

impl MapVariableIterator {
    /// Creates the actor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        key_variable: impl Into<String>,
        value_variable: impl Into<String>,
    ) -> Self {
        Self {
            base: ActorBase::new(name),
            key_variable: key_variable.into(),
            value_variable: value_variable.into(),
            current: None,
            entries: VecDeque::new(),
        }
    }
}

impl Configurable for MapVariableIterator {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "key-variable",
            description: "The variable receiving the key.",
            set: |a, v| {
                a.key_variable = v.to_string();
                Ok(())
            },
            get: |a| a.key_variable.clone(),
        },
        ActorOption {
            name: "value-variable",
            description: "The variable receiving the value.",
            set: |a, v| {
                a.value_variable = v.to_string();
                Ok(())
            },
            get: |a| a.value_variable.clone(),
        },
    ];
}

#[async_trait]
impl Actor for MapVariableIterator {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn accepts(&self) -> Vec<PayloadType> {
        vec![PayloadType::Map]
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::Map]
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        check_name(&self.base, "key-variable", &self.key_variable)?;
        check_name(&self.base, "value-variable", &self.value_variable)?;
        self.current = None;
        self.entries.clear();
        Ok(())
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        _ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        let Some(token) = input else {
            return Ok(());
        };
        let map = token.payload().as_map().ok_or_else(|| {
            ActorflowError::execution(self.base.full_name(), "Input is not a map")
        })?;
        self.entries = map
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect();
        self.current = Some(token);
        Ok(())
    }

    fn has_pending_output(&self) -> bool {
        !self.entries.is_empty()
    }

    fn output(&mut self, ctx: &FlowContext) -> Option<Token> {
        let (key, value) = self.entries.pop_front()?;
        let token = self.current.clone()?;
        for (variable, content) in [(&self.key_variable, key), (&self.value_variable, value)] {
            if let Err(e) = ctx.variables().set(variable, content) {
                let message = format!("{}: {e}", self.base.full_name());
                warn!(actor = %self.base.full_name(), error = %e, "Failed to set variable, dropping map");
                self.base.set_last_error(Some(message.clone()));
                ctx.record_error(message);
                self.entries.clear();
                self.current = None;
                return None;
            }
        }
        if self.entries.is_empty() {
            self.current = None;
        }
        Some(token)
    }

    fn wrap_up(&mut self, _ctx: &FlowContext) {
        self.current = None;
        self.entries.clear();
    }

    configurable_options!();
}
