//! Cooperative stop signalling.
//!
//! Every actor owns a [`StopToken`]; the flow owns one more that stops the
//! whole run. Stopping never preempts an actor: it is observed at the next
//! safe point, and awaiting [`StopToken::stopped`] releases blocking waits.

mod token;

pub use token::{StopCallback, StopToken};
