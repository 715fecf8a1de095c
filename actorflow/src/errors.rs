//! Error types for the actorflow engine.
//!
//! The taxonomy separates configuration problems (detected at set-up),
//! execution problems (detected while processing a token), cancellation
//! (a clean stop, never a failure) and resource problems raised by external
//! collaborators. Everything an actor raises is funnelled through
//! [`handle_exception`] before the driver sees it, so the pipeline only ever
//! deals with plain messages.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for actorflow operations.
#[derive(Debug, Error)]
pub enum ActorflowError {
    /// The actor's configuration is invalid; raised during set-up.
    #[error("Configuration error in '{actor}': {message}")]
    Configuration {
        /// Full path of the actor.
        actor: String,
        /// What is wrong.
        message: String,
    },

    /// The actor failed while processing a token.
    #[error("Execution error in '{actor}': {message}")]
    Execution {
        /// Full path of the actor.
        actor: String,
        /// What went wrong.
        message: String,
    },

    /// Execution was stopped. Not a failure.
    #[error("Execution stopped: {0}")]
    Cancelled(String),

    /// An external resource (file, network, database) failed.
    #[error("Resource error: {0}")]
    Resource(String),

    /// A flow validation error occurred.
    #[error(transparent)]
    Validation(#[from] PipelineValidationError),

    /// A variable store error.
    #[error(transparent)]
    Variable(#[from] VariableError),

    /// A database collaborator error.
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// An expression could not be parsed or evaluated.
    #[error("Expression error: {0}")]
    Expression(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActorflowError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(actor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            actor: actor.into(),
            message: message.into(),
        }
    }

    /// Creates an execution error.
    #[must_use]
    pub fn execution(actor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            actor: actor.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error represents a stop rather than a failure.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns the bare message, without the actor path prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Configuration { message, .. } | Self::Execution { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Converts any error raised inside an actor into the message the driver
/// records. This is the single exception-to-message boundary of the engine.
///
/// The result is `"<actor path>: <context><error>"`.
#[must_use]
pub fn handle_exception(
    actor_path: &str,
    context: &str,
    error: &(dyn std::error::Error + 'static),
) -> String {
    let mut msg = format!("{actor_path}: {context}{error}");
    let mut source = error.source();
    while let Some(cause) = source {
        msg.push_str("\nCaused by: ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

/// Converts a caught panic payload into the message the driver records.
#[must_use]
pub fn handle_panic(actor_path: &str, context: &str, payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("{actor_path}: {context}panicked: {detail}")
}

/// Metadata about a validation error for better diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "FLOW-003-TYPE_MISMATCH").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns the default fix hint for a known code.
    #[must_use]
    pub fn suggestion(code: &str) -> Option<&'static str> {
        match code {
            "FLOW-001-EMPTY" => Some("Add at least one actor to the flow before building."),
            "FLOW-002-DUPLICATE_NAME" => Some(
                "Actor names must be unique within a flow, callable actors included. \
                 Rename one of the actors.",
            ),
            "FLOW-003-TYPE_MISMATCH" => Some(
                "Insert a conversion actor between the two actors, or change the \
                 upstream actor so that it generates a type the downstream accepts.",
            ),
            "FLOW-004-PLACEMENT" => Some(
                "Standalones go first, a source is the first non-standalone actor \
                 and a sink can only be the last actor.",
            ),
            "FLOW-005-UNKNOWN_CALLABLE" => Some("Register the callable actor on the builder."),
            "FLOW-006-INVALID_NAME" => Some("Actor names must be non-empty and must not contain '.'."),
            _ => None,
        }
    }
}

/// Error raised when flow validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineValidationError {
    /// The error message.
    pub message: String,
    /// The actors involved in the error.
    pub actors: Vec<String>,
    /// Optional contract error info.
    pub error_info: Option<ContractErrorInfo>,
}

impl PipelineValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            actors: Vec::new(),
            error_info: None,
        }
    }

    /// Creates a validation error with a code; the fix hint is filled in
    /// from [`ContractErrorInfo::suggestion`].
    #[must_use]
    pub fn coded(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut info = ContractErrorInfo::new(code, message.clone());
        if let Some(hint) = ContractErrorInfo::suggestion(code) {
            info = info.with_fix_hint(hint);
        }
        Self::new(message).with_error_info(info)
    }

    /// Sets the actors involved.
    #[must_use]
    pub fn with_actors(mut self, actors: Vec<String>) -> Self {
        self.actors = actors;
        self
    }

    /// Sets the contract error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ContractErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|i| i.code.as_str())
    }
}

/// Errors raised by the variable store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    /// The variable is not set.
    #[error("Variable not set: {0}")]
    NotSet(String),

    /// The variable name contains invalid characters or is empty.
    #[error("Invalid variable name: '{0}'")]
    InvalidName(String),
}

/// Errors raised by the database collaborator.
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    /// No connection is available in the flow context.
    #[error("No database connection available")]
    NotConnected,

    /// The query failed.
    #[error("Query failed: {sql} - {reason}")]
    QueryFailed {
        /// The query.
        sql: String,
        /// The reason for failure.
        reason: String,
    },
}

impl DatabaseError {
    /// Creates a query failed error.
    #[must_use]
    pub fn query_failed(sql: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            sql: sql.into(),
            reason: reason.into(),
        }
    }
}
