//! Flow execution result.

use crate::core::{Payload, Token};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// How a flow run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    /// Ran to the end of input. Non-fatal errors may have been recorded.
    Completed,
    /// Stopped on request, by a handle or an interactive cancel.
    Stopped,
    /// Stopped by a fatal actor error.
    Failed,
}

impl std::fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a flow run.
#[derive(Debug, Clone)]
pub struct FlowResult {
    /// How the run ended.
    pub status: FlowStatus,
    /// Tokens produced by the last actor, in emission order.
    pub outputs: Vec<Token>,
    /// Every actor error recorded during the run, fatal ones included.
    pub errors: Vec<String>,
    /// Why the run stopped early, if it did.
    pub stop_message: Option<String>,
    /// Total run time in milliseconds.
    pub duration_ms: f64,
}

impl FlowResult {
    /// Returns true if the run completed without any recorded error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == FlowStatus::Completed && self.errors.is_empty()
    }

    /// Returns true if the run was stopped on request.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.status == FlowStatus::Stopped
    }

    /// Returns true if the run failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == FlowStatus::Failed
    }

    /// Returns the output payloads.
    #[must_use]
    pub fn payloads(&self) -> Vec<&Payload> {
        self.outputs.iter().map(Token::payload).collect()
    }

    /// Returns the first recorded error.
    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("status".to_string(), serde_json::json!(self.status));
        map.insert(
            "outputs".to_string(),
            serde_json::json!(self.payloads()),
        );
        map.insert("errors".to_string(), serde_json::json!(self.errors));
        map.insert("stop_message".to_string(), serde_json::json!(self.stop_message));
        map.insert("duration_ms".to_string(), serde_json::json!(self.duration_ms));
        map
    }
}
