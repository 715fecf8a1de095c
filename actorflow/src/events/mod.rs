//! Flow execution events.
//!
//! The driver reports lifecycle points to the [`EventSink`] held by the
//! flow context. Sinks decide what to do with them: drop, log or collect.

mod sink;

pub use sink::{
    CollectingEventSink, EventSink, FlowEvent, FlowEventType, LoggingEventSink, NoOpEventSink,
};
