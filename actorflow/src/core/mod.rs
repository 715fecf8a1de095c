//! Core types: payloads, tokens, and actor lifecycle enums.

mod payload;
mod status;
mod token;

pub use payload::{Payload, PayloadType, Value};
pub use status::{ActorKind, ActorState};
pub use token::Token;
