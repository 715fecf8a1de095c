//! Nested sequences as a single control actor.

use super::sequence::Sequence;
use crate::actor::{Actor, ActorBase};
use crate::context::FlowContext;
use crate::core::{PayloadType, Token};
use crate::errors::{ActorflowError, PipelineValidationError};
use async_trait::async_trait;
use tracing::debug;

/// Runs a nested sequence once per input token and forwards the tokens its
/// last actor produces.
///
/// Inner actors live below the sub-flow in the flow tree
/// (`Flow.Sub.Inner`). A fatal inner error stops the whole flow; a
/// non-fatal one only ends that inner branch.
#[derive(Debug)]
pub struct SubFlow {
    base: ActorBase,
    sequence: Sequence,
}

impl SubFlow {
    /// Creates a sub-flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the inner actors are empty, misnamed, misplaced
    /// or incompatible. Sources are not allowed inside a sub-flow.
    pub fn new(
        name: impl Into<String>,
        actors: Vec<Box<dyn Actor>>,
    ) -> Result<Self, PipelineValidationError> {
        Sequence::validate(&actors, false)?;
        let base = ActorBase::new(name);
        let mut sequence = Sequence::new(actors);
        sequence.set_parent(base.full_name());
        Ok(Self { base, sequence })
    }

    /// Returns the nested sequence.
    #[must_use]
    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }
}

#[async_trait]
impl Actor for SubFlow {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn accepts(&self) -> Vec<PayloadType> {
        self.sequence.accepts()
    }

    fn generates(&self) -> Vec<PayloadType> {
        self.sequence.generates()
    }

    fn set_parent(&mut self, parent: &str) {
        self.base.set_parent(parent);
        self.sequence.set_parent(self.base.full_name());
    }

    fn referenced_callables(&self) -> Vec<String> {
        self.sequence.referenced_callables()
    }

    fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ActorflowError> {
        self.sequence
            .set_up(ctx)
            .map_err(|message| ActorflowError::configuration(self.base.full_name(), message))
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        match self.sequence.execute(input, ctx).await {
            Ok(tokens) => {
                debug!(actor = %self.base.full_name(), outputs = tokens.len(), "Sub-flow finished");
                for token in tokens {
                    self.base.emit(token);
                }
                Ok(())
            }
            // Already recorded and the flow failed; do not report it twice.
            Err(message) => Err(ActorflowError::Cancelled(message)),
        }
    }

    fn wrap_up(&mut self, ctx: &FlowContext) {
        self.sequence.wrap_up(ctx);
    }
}
