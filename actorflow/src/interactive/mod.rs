//! Interactive steps: actors that pause for external input.
//!
//! The engine never talks to a UI directly. It sends a [`PromptRequest`] to
//! the [`UserInteraction`] collaborator held by the flow context and awaits
//! a [`UserChoice`]. The wait is raced against the actor's stop token, so a
//! stop releases it and counts as a cancel.

mod channel;
mod step;

pub use channel::ChannelInteraction;
pub use step::{InteractionState, InteractiveStep};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The outcome of an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserChoice {
    /// The user accepted, optionally entering a value.
    Accepted(Option<String>),
    /// The user cancelled, or the wait was stopped or timed out.
    Cancelled,
}

impl UserChoice {
    /// Returns true for `Accepted`.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// A request for user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    /// Request ID.
    pub id: Uuid,
    /// Full path of the asking actor.
    pub actor: String,
    /// Message shown to the user.
    pub message: String,
    /// Value pre-filled in the prompt.
    pub default_value: Option<String>,
}

impl PromptRequest {
    /// Creates a request with a fresh ID.
    #[must_use]
    pub fn new(actor: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.into(),
            message: message.into(),
            default_value: None,
        }
    }

    /// Sets the pre-filled value.
    #[must_use]
    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// The collaborator that talks to the user.
#[async_trait]
pub trait UserInteraction: Send + Sync {
    /// Asks the user and waits for the answer.
    async fn prompt_user(&self, request: PromptRequest) -> UserChoice;
}

/// A non-prompting substitute for headless runs.
///
/// Answers deterministically from its configuration: accept with the
/// request's default value, or cancel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessInteraction {
    accept: bool,
}

impl Default for HeadlessInteraction {
    fn default() -> Self {
        Self::accepting()
    }
}

impl HeadlessInteraction {
    /// Accepts every request with its default value.
    #[must_use]
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    /// Cancels every request.
    #[must_use]
    pub fn cancelling() -> Self {
        Self { accept: false }
    }

    /// Answers a request without waiting.
    #[must_use]
    pub fn answer(&self, request: &PromptRequest) -> UserChoice {
        if self.accept {
            UserChoice::Accepted(request.default_value.clone())
        } else {
            UserChoice::Cancelled
        }
    }
}

#[async_trait]
impl UserInteraction for HeadlessInteraction {
    async fn prompt_user(&self, request: PromptRequest) -> UserChoice {
        self.answer(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_headless_accepting_uses_default() {
        let request = PromptRequest::new("Flow.Enter", "Value?").with_default_value("42");
        let choice = HeadlessInteraction::accepting().prompt_user(request).await;
        assert_eq!(choice, UserChoice::Accepted(Some("42".to_string())));
        assert!(choice.is_accepted());
    }

    #[tokio::test]
    async fn test_headless_cancelling() {
        let request = PromptRequest::new("Flow.Enter", "Value?");
        let choice = HeadlessInteraction::cancelling().prompt_user(request).await;
        assert_eq!(choice, UserChoice::Cancelled);
    }

    #[test]
    fn test_prompt_request_ids_unique() {
        let a = PromptRequest::new("a", "m");
        let b = PromptRequest::new("a", "m");
        assert_ne!(a.id, b.id);
    }
}
