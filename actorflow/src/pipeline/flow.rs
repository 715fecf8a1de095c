//! A built, runnable flow.

use super::result::{FlowResult, FlowStatus};
use super::sequence::Sequence;
use crate::actor::{lifecycle, Actor};
use crate::context::{FlowContext, StopCause};
use crate::core::Token;
use crate::events::FlowEventType;
use crate::observability::SpanTimer;
use std::sync::Arc;
use tracing::{info, warn};

/// Stops a running flow from another task or thread.
#[derive(Debug, Clone)]
pub struct FlowStopHandle {
    ctx: Arc<FlowContext>,
}

impl FlowStopHandle {
    /// Requests a stop. The run ends with [`FlowStatus::Stopped`].
    ///
    /// A stop requested before [`Flow::run`] starts is discarded by the
    /// run's reset.
    pub fn stop(&self, reason: impl Into<String>) {
        self.ctx.stop_flow(reason);
    }

    /// Returns true once the current run has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.ctx.is_stopped()
    }
}

/// A validated flow: the main sequence plus its callable actors and the
/// context they share. Build one with
/// [`PipelineBuilder`](super::PipelineBuilder).
#[derive(Debug)]
pub struct Flow {
    name: String,
    sequence: Sequence,
    callables: Vec<String>,
    ctx: Arc<FlowContext>,
}

impl Flow {
    pub(crate) fn new(
        name: String,
        sequence: Sequence,
        callables: Vec<String>,
        ctx: Arc<FlowContext>,
    ) -> Self {
        Self {
            name,
            sequence,
            callables,
            ctx,
        }
    }

    /// Returns the flow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the shared context.
    #[must_use]
    pub fn context(&self) -> &Arc<FlowContext> {
        &self.ctx
    }

    /// Returns a handle that stops the running flow.
    #[must_use]
    pub fn stop_handle(&self) -> FlowStopHandle {
        FlowStopHandle {
            ctx: Arc::clone(&self.ctx),
        }
    }

    /// Returns the main sequence.
    #[must_use]
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Returns the actor called `name` in the main sequence.
    #[must_use]
    pub fn actor(&self, name: &str) -> Option<&dyn Actor> {
        self.sequence.actor(name)
    }

    /// Returns the registered callable names, in registration order.
    #[must_use]
    pub fn callables(&self) -> &[String] {
        &self.callables
    }

    /// Runs the flow once.
    ///
    /// Callables are set up first, then the main sequence. A set-up failure
    /// fails the run without executing anything. Every actor is wrapped up
    /// exactly once, in reverse order, whatever happened before.
    pub async fn run(&mut self, input: Option<Token>) -> FlowResult {
        let timer = SpanTimer::start(self.name.clone());
        let ctx = Arc::clone(&self.ctx);
        ctx.begin_run();
        info!(flow = %self.name, run_id = %ctx.identity().run_id, "Flow started");
        ctx.emit(FlowEventType::FlowStarted, None, None).await;

        let mut outputs = Vec::new();
        match self.set_up(&ctx).await {
            Ok(()) => match self.sequence.execute(input, &ctx).await {
                Ok(tokens) => outputs = tokens,
                Err(message) => warn!(flow = %self.name, error = %message, "Flow failed"),
            },
            Err(message) => {
                warn!(flow = %self.name, error = %message, "Flow set-up failed");
                ctx.record_error(message.clone());
                ctx.fail_flow(message);
            }
        }

        self.wrap_up(&ctx).await;

        let status = match ctx.stop_cause() {
            None => FlowStatus::Completed,
            Some(StopCause::Requested) => FlowStatus::Stopped,
            Some(StopCause::Error) => FlowStatus::Failed,
        };
        let result = FlowResult {
            status,
            outputs,
            errors: ctx.errors(),
            stop_message: ctx.stop_message(),
            duration_ms: timer.finish(),
        };

        let (event, data) = match status {
            FlowStatus::Completed => (
                FlowEventType::FlowCompleted,
                serde_json::json!({
                    "outputs": result.outputs.len(),
                    "errors": result.errors.len(),
                    "duration_ms": result.duration_ms,
                }),
            ),
            FlowStatus::Stopped | FlowStatus::Failed => (
                FlowEventType::FlowStopped,
                serde_json::json!({
                    "status": status,
                    "reason": &result.stop_message,
                    "duration_ms": result.duration_ms,
                }),
            ),
        };
        ctx.emit(event, None, Some(data)).await;
        info!(
            flow = %self.name,
            status = %status,
            outputs = result.outputs.len(),
            duration_ms = result.duration_ms,
            "Flow finished"
        );
        result
    }

    async fn set_up(&mut self, ctx: &FlowContext) -> Result<(), String> {
        for name in &self.callables {
            if let Some(callable) = ctx.callable(name) {
                let mut actor = callable.lock().await;
                lifecycle::set_up(&mut **actor, ctx)?;
            }
        }
        self.sequence.set_up(ctx)
    }

    async fn wrap_up(&mut self, ctx: &FlowContext) {
        self.sequence.wrap_up(ctx);
        for name in self.callables.iter().rev() {
            if let Some(callable) = ctx.callable(name) {
                let mut actor = callable.lock().await;
                lifecycle::wrap_up(&mut **actor, ctx);
            }
        }
    }

    /// Flow teardown: clears the variables, their listeners and storage.
    pub fn clean_up(&self) {
        self.ctx.clean_up();
    }
}
