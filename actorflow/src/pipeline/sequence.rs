//! The sequence driver.
//!
//! A sequence is a linear chain of actors: optional leading standalones,
//! then an optional source, transformers and an optional trailing sink.
//! Tokens are pushed depth-first: an actor holding pending output is
//! resumed (most recent first) before upstream is asked for more.

use crate::actor::{lifecycle, Actor};
use crate::config::ErrorHandling;
use crate::context::FlowContext;
use crate::core::{ActorKind, PayloadType, Token};
use crate::errors::PipelineValidationError;
use std::collections::HashSet;
use tracing::{debug, info_span, warn, Instrument};

/// A linear chain of actors and the driver that pushes tokens through it.
#[derive(Debug, Default)]
pub struct Sequence {
    actors: Vec<Box<dyn Actor>>,
}

impl Sequence {
    /// Creates a sequence. Use [`validate`](Self::validate) or the
    /// builder to check placement and types.
    #[must_use]
    pub fn new(actors: Vec<Box<dyn Actor>>) -> Self {
        Self { actors }
    }

    /// Checks names, placement and adjacent type compatibility.
    ///
    /// With `allow_source == false` (nested sequences) no source may appear.
    pub fn validate(
        actors: &[Box<dyn Actor>],
        allow_source: bool,
    ) -> Result<(), PipelineValidationError> {
        if actors.is_empty() {
            return Err(PipelineValidationError::coded(
                "FLOW-001-EMPTY",
                "Sequence has no actors",
            ));
        }

        let mut seen = HashSet::new();
        for actor in actors {
            let name = actor.base().name();
            validate_name(name)?;
            if !seen.insert(name) {
                return Err(PipelineValidationError::coded(
                    "FLOW-002-DUPLICATE_NAME",
                    format!("Duplicate actor name '{name}'"),
                )
                .with_actors(vec![name.to_string()]));
            }
        }

        validate_placement(actors, allow_source)?;
        validate_types(actors)
    }

    /// Returns the actors.
    #[must_use]
    pub fn actors(&self) -> &[Box<dyn Actor>] {
        &self.actors
    }

    /// Returns the actor called `name`.
    #[must_use]
    pub fn actor(&self, name: &str) -> Option<&dyn Actor> {
        self.actors
            .iter()
            .find(|a| a.base().name() == name)
            .map(AsRef::as_ref)
    }

    /// Returns the number of actors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Returns true if the sequence has no actors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Returns the payload types accepted by the first actor that takes
    /// input.
    #[must_use]
    pub fn accepts(&self) -> Vec<PayloadType> {
        self.actors
            .iter()
            .find(|a| a.kind() != ActorKind::Standalone)
            .map_or_else(|| vec![PayloadType::Unknown], |a| a.accepts())
    }

    /// Returns the payload types generated by the last actor.
    #[must_use]
    pub fn generates(&self) -> Vec<PayloadType> {
        self.actors
            .last()
            .map_or_else(|| vec![PayloadType::Unknown], |a| a.generates())
    }

    /// Places every actor below `parent`.
    pub fn set_parent(&mut self, parent: &str) {
        for actor in &mut self.actors {
            actor.set_parent(parent);
        }
    }

    /// Returns the callables referenced by literal name, nested ones
    /// included.
    #[must_use]
    pub fn referenced_callables(&self) -> Vec<String> {
        self.actors
            .iter()
            .flat_map(|a| a.referenced_callables())
            .collect()
    }

    /// Sets up the actors in order, stopping at the first failure.
    pub fn set_up(&mut self, ctx: &FlowContext) -> Result<(), String> {
        for actor in &mut self.actors {
            lifecycle::set_up(actor.as_mut(), ctx)?;
        }
        Ok(())
    }

    /// Wraps up every actor in reverse order. Actors that were never set up
    /// are wrapped up too; wrap-up is safe in every state.
    pub fn wrap_up(&mut self, ctx: &FlowContext) {
        for actor in self.actors.iter_mut().rev() {
            lifecycle::wrap_up(actor.as_mut(), ctx);
        }
    }

    /// Runs the chain for one input and returns the tokens produced by the
    /// last actor.
    ///
    /// A non-fatal actor error is recorded on the context and ends that
    /// branch. A fatal one fails the flow and is returned.
    pub async fn execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<Vec<Token>, String> {
        let mut outputs = Vec::new();
        let first = self
            .actors
            .iter()
            .position(|a| a.kind() != ActorKind::Standalone);

        for idx in 0..first.unwrap_or(self.actors.len()) {
            if ctx.is_stopped() {
                return Ok(outputs);
            }
            self.step(idx, None, ctx).await?;
        }
        let Some(first) = first else {
            return Ok(outputs);
        };

        let last = self.actors.len() - 1;
        let mut feed = Some((first, input));
        let mut pending: Vec<usize> = Vec::new();

        loop {
            if ctx.is_stopped() {
                debug!(stop = ?ctx.stop_message(), "Sequence interrupted by stop");
                break;
            }

            let (idx, succeeded) = if let Some((idx, token)) = feed.take() {
                (idx, self.step(idx, token, ctx).await?)
            } else if let Some(idx) = pending.pop() {
                if lifecycle::has_pending_output(self.actors[idx].as_ref()) {
                    (idx, true)
                } else {
                    // Not finished: run again without input.
                    (idx, self.step(idx, None, ctx).await?)
                }
            } else {
                break;
            };

            let actor = self.actors[idx].as_mut();
            let token = lifecycle::output(actor, ctx);
            let more = lifecycle::has_pending_output(actor)
                || (succeeded && !actor.is_finished() && !actor.base().is_stopped());
            if more {
                pending.push(idx);
            }

            match token {
                Some(token) if idx < last => feed = Some((idx + 1, Some(token))),
                Some(token) => outputs.push(token),
                None => {}
            }
        }

        Ok(outputs)
    }

    /// Executes one actor, applying the error handling mode. Returns false
    /// for a recorded, non-fatal error.
    async fn step(
        &mut self,
        idx: usize,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<bool, String> {
        let actor = self.actors[idx].as_mut();
        let span = info_span!("actor", path = %actor.base().full_name());
        let Err(message) = lifecycle::execute(actor, input, ctx).instrument(span).await else {
            return Ok(true);
        };

        ctx.record_error(message.clone());
        let fatal = ctx.error_handling() == ErrorHandling::ActorsAlwaysStopOnError
            || actor.base().stop_flow_on_error();
        if fatal {
            ctx.fail_flow(message.clone());
            return Err(message);
        }
        warn!(error = %message, "Actor failed, continuing");
        Ok(false)
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), PipelineValidationError> {
    if name.trim().is_empty() || name.contains('.') {
        return Err(PipelineValidationError::coded(
            "FLOW-006-INVALID_NAME",
            format!("Invalid actor name '{name}'"),
        )
        .with_actors(vec![name.to_string()]));
    }
    Ok(())
}

fn validate_placement(
    actors: &[Box<dyn Actor>],
    allow_source: bool,
) -> Result<(), PipelineValidationError> {
    let first = actors
        .iter()
        .position(|a| a.kind() != ActorKind::Standalone)
        .unwrap_or(actors.len());
    let last = actors.len() - 1;

    for (idx, actor) in actors.iter().enumerate() {
        let misplaced = match actor.kind() {
            ActorKind::Standalone => idx > first,
            ActorKind::Source => !allow_source || idx != first,
            ActorKind::Sink => idx != last,
            ActorKind::Transformer => false,
        };
        if misplaced {
            let name = actor.base().name();
            return Err(PipelineValidationError::coded(
                "FLOW-004-PLACEMENT",
                format!("{} actor '{name}' cannot be placed at position {idx}", actor.kind()),
            )
            .with_actors(vec![name.to_string()]));
        }
    }
    Ok(())
}

fn validate_types(actors: &[Box<dyn Actor>]) -> Result<(), PipelineValidationError> {
    let chain: Vec<&Box<dyn Actor>> = actors
        .iter()
        .filter(|a| a.kind() != ActorKind::Standalone)
        .collect();

    for pair in chain.windows(2) {
        let (upstream, downstream) = (pair[0], pair[1]);
        if !PayloadType::compatible(&upstream.generates(), &downstream.accepts()) {
            let (up, down) = (upstream.base().name(), downstream.base().name());
            return Err(PipelineValidationError::coded(
                "FLOW-003-TYPE_MISMATCH",
                format!(
                    "'{down}' accepts {:?} but '{up}' generates {:?}",
                    downstream.accepts(),
                    upstream.generates()
                ),
            )
            .with_actors(vec![up.to_string(), down.to_string()]));
        }
    }
    Ok(())
}
