//! Interaction answered through channels by an embedding UI.

use super::{PromptRequest, UserChoice, UserInteraction};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

#[derive(Debug)]
struct PendingPrompt {
    request: PromptRequest,
    response_tx: oneshot::Sender<UserChoice>,
}

type PendingMap = Arc<RwLock<HashMap<Uuid, PendingPrompt>>>;

/// Removes an abandoned request when the waiting future is dropped.
struct PendingGuard {
    pending: PendingMap,
    id: Uuid,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.write().remove(&self.id);
    }
}

/// A [`UserInteraction`] whose prompts are listed for a UI and answered by
/// request ID.
///
/// A prompt whose wait is dropped (stopped actor, timeout) disappears from
/// the pending list.
#[derive(Default, Clone)]
pub struct ChannelInteraction {
    pending: PendingMap,
}

impl ChannelInteraction {
    /// Creates a new channel interaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers a pending prompt. Returns false if no such prompt is pending.
    pub fn respond(&self, id: Uuid, choice: UserChoice) -> bool {
        match self.pending.write().remove(&id) {
            Some(prompt) => prompt.response_tx.send(choice).is_ok(),
            None => false,
        }
    }

    /// Accepts a pending prompt with a value.
    pub fn accept(&self, id: Uuid, value: Option<String>) -> bool {
        self.respond(id, UserChoice::Accepted(value))
    }

    /// Cancels a pending prompt.
    pub fn cancel(&self, id: Uuid) -> bool {
        self.respond(id, UserChoice::Cancelled)
    }

    /// Returns the pending prompts.
    #[must_use]
    pub fn pending_requests(&self) -> Vec<PromptRequest> {
        self.pending
            .read()
            .values()
            .map(|p| p.request.clone())
            .collect()
    }

    /// Returns the number of pending prompts.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.read().len()
    }
}

#[async_trait]
impl UserInteraction for ChannelInteraction {
    async fn prompt_user(&self, request: PromptRequest) -> UserChoice {
        let id = request.id;
        let (tx, rx) = oneshot::channel();
        self.pending.write().insert(
            id,
            PendingPrompt {
                request,
                response_tx: tx,
            },
        );
        let _guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            id,
        };

        rx.await.unwrap_or(UserChoice::Cancelled)
    }
}

impl std::fmt::Debug for ChannelInteraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelInteraction")
            .field("pending_count", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for_prompt(ui: &ChannelInteraction) -> PromptRequest {
        for _ in 0..100 {
            if let Some(request) = ui.pending_requests().into_iter().next() {
                return request;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no prompt arrived");
    }

    #[tokio::test]
    async fn test_accept() {
        let ui = ChannelInteraction::new();
        let ui_clone = ui.clone();
        let handle = tokio::spawn(async move {
            ui_clone
                .prompt_user(PromptRequest::new("Flow.Enter", "Value?"))
                .await
        });

        let request = wait_for_prompt(&ui).await;
        assert_eq!(request.actor, "Flow.Enter");
        assert!(ui.accept(request.id, Some("7".to_string())));

        let choice = handle.await.unwrap();
        assert_eq!(choice, UserChoice::Accepted(Some("7".to_string())));
        assert_eq!(ui.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel() {
        let ui = ChannelInteraction::new();
        let ui_clone = ui.clone();
        let handle =
            tokio::spawn(async move { ui_clone.prompt_user(PromptRequest::new("a", "m")).await });

        let request = wait_for_prompt(&ui).await;
        assert!(ui.cancel(request.id));
        assert_eq!(handle.await.unwrap(), UserChoice::Cancelled);
    }

    #[tokio::test]
    async fn test_respond_unknown_id() {
        let ui = ChannelInteraction::new();
        assert!(!ui.accept(Uuid::new_v4(), None));
    }

    #[tokio::test]
    async fn test_dropped_wait_removes_prompt() {
        let ui = ChannelInteraction::new();
        let result = tokio::time::timeout(
            Duration::from_millis(20),
            ui.prompt_user(PromptRequest::new("a", "m")),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(ui.pending_count(), 0);
    }
}
