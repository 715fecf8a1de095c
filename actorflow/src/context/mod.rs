//! The execution context shared by the actors of one flow.
//!
//! This module provides:
//! - The run identity used to correlate events and logs
//! - The flow context carrying variables, storage, provenance, collaborators
//!   and the stop signal

mod flow;
mod identity;

pub use flow::{CallableActor, FlowContext, StopCause};
pub use identity::FlowIdentity;
