//! Prompts the user for a value.

use crate::actor::options::parse_bool;
use crate::actor::{Actor, ActorBase, ActorOption, Configurable};
use crate::configurable_options;
use crate::context::FlowContext;
use crate::core::{PayloadType, Token};
use crate::errors::ActorflowError;
use crate::interactive::{InteractionState, InteractiveStep, PromptRequest, UserChoice};
use crate::provenance::ActorType;
use crate::variables::extract_names;
use async_trait::async_trait;
use tracing::{debug, info};

/// Asks the user for a value whenever a token arrives and emits the answer
/// as a string.
///
/// Accepting without a value emits `initial-value`. Cancelling either stops
/// the flow (`stop-flow-if-canceled`) or fails the token.
#[derive(Debug)]
pub struct EnterValue {
    base: ActorBase,
    message: String,
    initial_value: String,
    stop_flow_if_canceled: bool,
    custom_stop_message: String,
    step: InteractiveStep,
}

impl EnterValue {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            message: message.into(),
            initial_value: String::new(),
            stop_flow_if_canceled: false,
            custom_stop_message: String::new(),
            step: InteractiveStep::new(),
        }
    }

    /// Sets the value pre-filled in the prompt.
    #[must_use]
    pub fn with_initial_value(mut self, value: impl Into<String>) -> Self {
        self.initial_value = value.into();
        self
    }

    /// Stops the flow when the user cancels; `message` replaces the default
    /// stop message when non-empty.
    #[must_use]
    pub fn stop_flow_if_canceled(mut self, message: impl Into<String>) -> Self {
        self.stop_flow_if_canceled = true;
        self.custom_stop_message = message.into();
        self
    }

    /// Returns the state of the current (or last) interaction.
    #[must_use]
    pub fn state(&self) -> InteractionState {
        self.step.state()
    }
}

impl Configurable for EnterValue {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "message",
            description: "The message shown to the user; may contain variables.",
            set: |a, v| {
                a.message = v.to_string();
                Ok(())
            },
            get: |a| a.message.clone(),
        },
        ActorOption {
            name: "initial-value",
            description: "The value pre-filled in the prompt.",
            set: |a, v| {
                a.initial_value = v.to_string();
                Ok(())
            },
            get: |a| a.initial_value.clone(),
        },
        ActorOption {
            name: "stop-flow-if-canceled",
            description: "Whether a cancel stops the flow.",
            set: |a, v| {
                a.stop_flow_if_canceled = parse_bool(v)?;
                Ok(())
            },
            get: |a| a.stop_flow_if_canceled.to_string(),
        },
        ActorOption {
            name: "custom-stop-message",
            description: "The stop message used instead of the default one.",
            set: |a, v| {
                a.custom_stop_message = v.to_string();
                Ok(())
            },
            get: |a| a.custom_stop_message.clone(),
        },
    ];
}

#[async_trait]
impl Actor for EnterValue {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::String]
    }

    fn referenced_variables(&self) -> Vec<String> {
        extract_names(&self.message)
    }

    fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ActorflowError> {
        self.step.reset();
        self.step.set_timeout(ctx.config().interaction_timeout());
        Ok(())
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        let Some(trigger) = input else {
            return Ok(());
        };
        let message = ctx.expand(&self.message)?;
        let request = PromptRequest::new(self.base.full_name(), message)
            .with_default_value(self.initial_value.clone());

        let interaction = ctx.interaction();
        let stop = self.base.stop_token();
        match self.step.interact(&*interaction, request, &stop).await {
            UserChoice::Accepted(value) => {
                let value = value.unwrap_or_else(|| self.initial_value.clone());
                debug!(actor = %self.base.full_name(), "Value entered");
                let output = ctx.provenance().derive(
                    Some(&trigger),
                    value,
                    self.base.full_name(),
                    ActorType::DataGenerator,
                );
                self.base.emit(output);
                Ok(())
            }
            UserChoice::Cancelled if self.base.is_stopped() => Err(ActorflowError::Cancelled(
                self.base.stop_message().unwrap_or_default(),
            )),
            UserChoice::Cancelled if self.stop_flow_if_canceled => {
                let reason = if self.custom_stop_message.is_empty() {
                    format!("Flow canceled: {}", self.base.full_name())
                } else {
                    self.custom_stop_message.clone()
                };
                info!(actor = %self.base.full_name(), reason = %reason, "Interaction cancelled, stopping flow");
                ctx.stop_flow(reason.clone());
                Err(ActorflowError::Cancelled(reason))
            }
            UserChoice::Cancelled => Err(ActorflowError::execution(
                self.base.full_name(),
                "User cancelled dialog!",
            )),
        }
    }

    configurable_options!();
}
