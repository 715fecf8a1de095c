//! The per-actor interaction state machine.

use super::{PromptRequest, UserChoice, UserInteraction};
use crate::cancellation::StopToken;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// `Idle -> AwaitingInput -> (Accepted | Cancelled)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    /// No interaction has started.
    #[default]
    Idle,
    /// Waiting for the user.
    AwaitingInput,
    /// The user accepted.
    Accepted,
    /// The user cancelled, or the wait was stopped or timed out.
    Cancelled,
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingInput => write!(f, "awaiting_input"),
            Self::Accepted => write!(f, "accepted"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Coordinates one interactive actor's waits.
///
/// The prompt is raced against the stop token: stopping an actor that is
/// awaiting input moves it straight to `Cancelled` and releases the wait.
#[derive(Debug, Default)]
pub struct InteractiveStep {
    state: RwLock<InteractionState>,
    timeout: Option<Duration>,
}

impl InteractiveStep {
    /// Creates an idle step without timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time limit for a single interaction.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Changes the time limit.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> InteractionState {
        *self.state.read()
    }

    /// Returns to `Idle`.
    pub fn reset(&self) {
        *self.state.write() = InteractionState::Idle;
    }

    /// Prompts through `interaction` and waits for the answer, a stop of
    /// `stop`, or the timeout, whichever comes first.
    pub async fn interact(
        &self,
        interaction: &dyn UserInteraction,
        request: PromptRequest,
        stop: &StopToken,
    ) -> UserChoice {
        if stop.is_stopped() {
            return self.finish(UserChoice::Cancelled);
        }
        *self.state.write() = InteractionState::AwaitingInput;
        let actor = request.actor.clone();

        let prompt = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, interaction.prompt_user(request))
                    .await
                    .unwrap_or_else(|_| {
                        debug!(actor = %actor, "Interaction timed out");
                        UserChoice::Cancelled
                    }),
                None => interaction.prompt_user(request).await,
            }
        };

        let choice = tokio::select! {
            biased;
            () = stop.stopped() => {
                debug!(actor = %actor, "Interaction released by stop");
                UserChoice::Cancelled
            }
            choice = prompt => choice,
        };
        self.finish(choice)
    }

    fn finish(&self, choice: UserChoice) -> UserChoice {
        *self.state.write() = if choice.is_accepted() {
            InteractionState::Accepted
        } else {
            InteractionState::Cancelled
        };
        choice
    }
}
