//! Observability utilities.
//!
//! Lifecycle events go through the flow's [`EventSink`](crate::events::EventSink);
//! this module covers subscriber installation and timing.

mod logging;
mod timer;

pub use logging::init_tracing;
pub use timer::SpanTimer;
