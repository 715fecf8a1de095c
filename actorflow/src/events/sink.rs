//! Flow events and the sinks that receive them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, Level};

/// The lifecycle points reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowEventType {
    /// A flow run started.
    #[serde(rename = "flow.started")]
    FlowStarted,
    /// An actor finished set-up.
    #[serde(rename = "actor.setup")]
    ActorSetUp,
    /// An actor executed one input.
    #[serde(rename = "actor.executed")]
    ActorExecuted,
    /// An actor reported an error.
    #[serde(rename = "actor.failed")]
    ActorFailed,
    /// An actor produced an output token.
    #[serde(rename = "actor.output")]
    ActorOutput,
    /// The flow was stopped before finishing.
    #[serde(rename = "flow.stopped")]
    FlowStopped,
    /// The flow ran to completion.
    #[serde(rename = "flow.completed")]
    FlowCompleted,
    /// An actor was wrapped up.
    #[serde(rename = "actor.wrapped_up")]
    ActorWrappedUp,
}

impl FlowEventType {
    /// Returns the dotted event name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlowStarted => "flow.started",
            Self::ActorSetUp => "actor.setup",
            Self::ActorExecuted => "actor.executed",
            Self::ActorFailed => "actor.failed",
            Self::ActorOutput => "actor.output",
            Self::FlowStopped => "flow.stopped",
            Self::FlowCompleted => "flow.completed",
            Self::ActorWrappedUp => "actor.wrapped_up",
        }
    }
}

impl fmt::Display for FlowEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event emitted while running a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowEvent {
    /// What happened.
    pub event_type: FlowEventType,
    /// The flow name.
    pub flow: String,
    /// Full path of the actor involved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Extra data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl FlowEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(event_type: FlowEventType, flow: impl Into<String>) -> Self {
        Self {
            event_type,
            flow: flow.into(),
            actor: None,
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// Sets the actor path.
    #[must_use]
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Sets the event data.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Receives flow events.
///
/// Sinks are carried by the flow context; there is no process-wide sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    async fn emit(&self, event: FlowEvent);

    /// Emits an event without awaiting. Must never panic; errors are
    /// logged and suppressed.
    fn try_emit(&self, event: FlowEvent);
}

/// Discards all events. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: FlowEvent) {}

    fn try_emit(&self, _event: FlowEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &FlowEvent) {
        let actor = event.actor.as_deref().unwrap_or("-");
        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.event_type,
                flow = %event.flow,
                actor = %actor,
                event_data = ?event.data,
                "Event: {}", event.event_type
            );
        } else {
            info!(
                event_type = %event.event_type,
                flow = %event.flow,
                actor = %actor,
                event_data = ?event.data,
                "Event: {}", event.event_type
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: FlowEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: FlowEvent) {
        self.log_event(&event);
    }
}

/// Collects events in memory, for tests and listeners.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<FlowEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<FlowEvent> {
        self.events.read().clone()
    }

    /// Returns the event names in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(|e| e.event_type.as_str()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose name starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<FlowEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.as_str().starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Returns the events concerning one actor.
    #[must_use]
    pub fn events_for_actor(&self, actor: &str) -> Vec<FlowEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.actor.as_deref() == Some(actor))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: FlowEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: FlowEvent) {
        self.events.write().push(event);
    }
}
