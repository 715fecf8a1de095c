//! Actor state and kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The role an actor plays in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    /// No input, no output. Runs once before the token loop.
    Standalone,
    /// No input, produces tokens.
    Source,
    /// Consumes a token and produces zero or more tokens.
    Transformer,
    /// Consumes a token, produces nothing.
    Sink,
}

impl Default for ActorKind {
    fn default() -> Self {
        Self::Transformer
    }
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Source => write!(f, "source"),
            Self::Transformer => write!(f, "transformer"),
            Self::Sink => write!(f, "sink"),
        }
    }
}

impl ActorKind {
    /// Returns true if actors of this kind take an input token.
    #[must_use]
    pub fn has_input(&self) -> bool {
        matches!(self, Self::Transformer | Self::Sink)
    }

    /// Returns true if actors of this kind produce tokens.
    #[must_use]
    pub fn has_output(&self) -> bool {
        matches!(self, Self::Source | Self::Transformer)
    }
}

/// The lifecycle state of an actor.
///
/// `Unconfigured -> SetUp -> Ready -> Executing -> (Ready | Stopped | Failed)`.
/// `SetUp` is held while the actor's set-up is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorState {
    /// Not set up yet (or wrapped up).
    Unconfigured,
    /// Set-up in progress.
    SetUp,
    /// Set up and waiting for input.
    Ready,
    /// Processing a token.
    Executing,
    /// Stopped via `stop_execution`.
    Stopped,
    /// Set-up or execution failed.
    Failed,
}

impl Default for ActorState {
    fn default() -> Self {
        Self::Unconfigured
    }
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => write!(f, "unconfigured"),
            Self::SetUp => write!(f, "set_up"),
            Self::Ready => write!(f, "ready"),
            Self::Executing => write!(f, "executing"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl ActorState {
    /// Returns true if the actor may be executed in this state.
    #[must_use]
    pub fn can_execute(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns true if the state is terminal for the current run.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}
