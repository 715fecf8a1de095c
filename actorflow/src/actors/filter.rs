//! A trainable scaling filter.

use crate::actor::options::parse_f64;
use crate::actor::{Actor, ActorBase, ActorOption, BackupState, Configurable};
use crate::configurable_options;
use crate::context::FlowContext;
use crate::core::{PayloadType, Token};
use crate::errors::ActorflowError;
use crate::provenance::ActorType;
use crate::variables::{extract_name, is_placeholder, VariableChangeEvent};
use async_trait::async_trait;
use tracing::debug;

const BACKUP_TRAINED: &str = "trained";
const BACKUP_REFERENCE: &str = "reference";

/// Scales every value relative to the first value it sees:
/// `output = x / reference * factor`.
///
/// The filter trains on its first input. Training survives a change of a
/// bound `factor` (the state is backed up and restored around the
/// re-set-up); a change of `reset-variable` discards it.
#[derive(Debug)]
pub struct ScaleFilter {
    base: ActorBase,
    factor: f64,
    reset_variable: String,
    trained: bool,
    reference: f64,
}

impl ScaleFilter {
    /// Creates the filter. `factor` may be a number or a placeholder such
    /// as `@{factor}`; anything else leaves the factor at 1.
    #[must_use]
    pub fn new(name: impl Into<String>, factor: &str) -> Self {
        let mut filter = Self {
            base: ActorBase::new(name),
            factor: 1.0,
            reset_variable: String::new(),
            trained: false,
            reference: 0.0,
        };
        if is_placeholder(factor) {
            filter.base.bind("factor", extract_name(factor));
        } else if let Ok(value) = parse_f64(factor) {
            filter.factor = value;
        }
        filter
    }

    /// Retrains whenever `variable` changes.
    #[must_use]
    pub fn with_reset_variable(mut self, variable: impl Into<String>) -> Self {
        self.reset_variable = variable.into();
        self
    }

    /// Returns true once the reference value is known.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Returns the reference value.
    #[must_use]
    pub fn reference(&self) -> f64 {
        self.reference
    }
}

impl Configurable for ScaleFilter {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "factor",
            description: "The factor applied after normalising by the reference.",
            set: |a, v| {
                a.factor = parse_f64(v)?;
                Ok(())
            },
            get: |a| a.factor.to_string(),
        },
        ActorOption {
            name: "reset-variable",
            description: "The variable whose change discards the training.",
            set: |a, v| {
                a.reset_variable = v.to_string();
                Ok(())
            },
            get: |a| a.reset_variable.clone(),
        },
    ];
}

#[async_trait]
impl Actor for ScaleFilter {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn accepts(&self) -> Vec<PayloadType> {
        vec![PayloadType::Number]
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::Double]
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        self.trained = false;
        self.reference = 0.0;
        if !self.reset_variable.is_empty() {
            self.base.watch(self.reset_variable.clone());
        }
        Ok(())
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        let Some(token) = input else {
            return Ok(());
        };
        let x = token.payload().as_f64().ok_or_else(|| {
            ActorflowError::execution(
                self.base.full_name(),
                format!("Not a number: {}", token.payload()),
            )
        })?;

        if !self.trained {
            if x == 0.0 {
                return Err(ActorflowError::execution(
                    self.base.full_name(),
                    "Cannot train on a zero value",
                ));
            }
            self.reference = x;
            self.trained = true;
            debug!(actor = %self.base.full_name(), reference = x, "Filter trained");
        }

        let value = x / self.reference * self.factor;
        let output = ctx
            .provenance()
            .derive(Some(&token), value, self.base.full_name(), ActorType::Filter);
        self.base.emit(output);
        Ok(())
    }

    fn backup_state(&self) -> BackupState {
        BackupState::new()
            .with(BACKUP_TRAINED, self.trained)
            .with(BACKUP_REFERENCE, self.reference)
    }

    fn restore_state(&mut self, state: &mut BackupState) {
        if let Some(trained) = state.take::<bool>(BACKUP_TRAINED) {
            self.trained = trained;
        }
        if let Some(reference) = state.take::<f64>(BACKUP_REFERENCE) {
            self.reference = reference;
        }
    }

    fn variable_changed(&mut self, events: &[VariableChangeEvent]) {
        if events.iter().any(|e| e.name == self.reset_variable) {
            debug!(actor = %self.base.full_name(), "Training reset");
            self.trained = false;
        }
    }

    configurable_options!();
}
