//! # Actorflow
//!
//! An actor execution substrate for token-passing workflows.
//!
//! A flow is a linear chain of actors. Tokens are pushed from a source
//! through transformers to a sink, one token in flight at a time, while the
//! actors share a flow context:
//!
//! - **Variables**: string values with change notification and `@{name}`
//!   expansion; actors whose options depend on a variable are re-set-up when
//!   it changes, with their runtime state backed up and restored around it
//! - **Storage**: a typed key/value store with named LRU caches
//! - **Provenance**: an optional per-token history of the actors it passed
//! - **Interaction**: actors that wait for user input, released by a stop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use actorflow::prelude::*;
//!
//! let mut flow = PipelineBuilder::new("Flow")
//!     .actor(ForLoop::new("Loop", 1, 3, 1))
//!     .actor(MathExpression::new("Math", "pow(X, @{exp})"))
//!     .actor(LogSink::new("Log"))
//!     .variable("exp", "2")
//!     .build()?;
//!
//! let result = flow.run(None).await;
//! assert!(result.is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod actor;
pub mod actors;
pub mod cancellation;
pub mod config;
pub mod context;
pub mod core;
pub mod db;
pub mod errors;
pub mod events;
pub mod interactive;
pub mod observability;
pub mod pipeline;
pub mod provenance;
pub mod storage;
pub mod testing;
pub mod variables;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::actor::{Actor, ActorBase, ActorOption, BackupState, Configurable};
    pub use crate::actors::{
        CallableTransformer, DbQuery, EnterValue, ForLoop, GetStorageValue, InitStorageCache,
        LogSink, MapVariableIterator, MathExpression, NullSink, PassThrough, ScaleFilter,
        SetManyVariables, SetStorageValue, SetVariable,
    };
    pub use crate::cancellation::StopToken;
    pub use crate::config::{ErrorHandling, FlowConfig, LoggingConfig};
    pub use crate::context::FlowContext;
    pub use crate::core::{ActorKind, ActorState, Payload, PayloadType, Token, Value};
    pub use crate::errors::{ActorflowError, PipelineValidationError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::interactive::{HeadlessInteraction, UserChoice, UserInteraction};
    pub use crate::pipeline::{
        Flow, FlowResult, FlowStatus, FlowStopHandle, PipelineBuilder, SubFlow,
    };
    pub use crate::storage::Storage;
    pub use crate::variables::{UnsetPolicy, VariableStore};
}
