//! Sources.

use crate::actor::options::parse_i64;
use crate::actor::{Actor, ActorBase, ActorOption, Configurable};
use crate::configurable_options;
use crate::context::FlowContext;
use crate::core::{ActorKind, PayloadType, Token};
use crate::errors::ActorflowError;
use crate::provenance::ActorType;
use async_trait::async_trait;

/// Emits the integers from `lower` to `upper` (inclusive) in steps of
/// `step`.
///
/// Values are produced lazily, one per `output` call, so downstream actors
/// finish with one value before the next is generated.
#[derive(Debug)]
pub struct ForLoop {
    base: ActorBase,
    lower: i64,
    upper: i64,
    step: i64,
    current: Option<i64>,
}

impl ForLoop {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>, lower: i64, upper: i64, step: i64) -> Self {
        Self {
            base: ActorBase::new(name),
            lower,
            upper,
            step,
            current: None,
        }
    }

    fn in_range(&self, value: i64) -> bool {
        if self.step > 0 {
            value <= self.upper
        } else {
            value >= self.upper
        }
    }
}

impl Configurable for ForLoop {
    const OPTIONS: &'static [ActorOption<Self>] = &[
        ActorOption {
            name: "lower",
            description: "The first value.",
            set: |a, v| {
                a.lower = parse_i64(v)?;
                Ok(())
            },
            get: |a| a.lower.to_string(),
        },
        ActorOption {
            name: "upper",
            description: "The last value (inclusive).",
            set: |a, v| {
                a.upper = parse_i64(v)?;
                Ok(())
            },
            get: |a| a.upper.to_string(),
        },
        ActorOption {
            name: "step",
            description: "The increment; negative to count down.",
            set: |a, v| {
                a.step = parse_i64(v)?;
                Ok(())
            },
            get: |a| a.step.to_string(),
        },
    ];
}

#[async_trait]
impl Actor for ForLoop {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Source
    }

    fn accepts(&self) -> Vec<PayloadType> {
        Vec::new()
    }

    fn generates(&self) -> Vec<PayloadType> {
        vec![PayloadType::Integer]
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        self.current = None;
        if self.step == 0 {
            return Err(ActorflowError::configuration(
                self.base.full_name(),
                "Step cannot be zero",
            ));
        }
        Ok(())
    }

    async fn do_execute(
        &mut self,
        _input: Option<Token>,
        _ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        self.current = Some(self.lower);
        Ok(())
    }

    fn has_pending_output(&self) -> bool {
        self.current.is_some_and(|value| self.in_range(value))
    }

    fn output(&mut self, ctx: &FlowContext) -> Option<Token> {
        let value = self.current.filter(|value| self.in_range(*value))?;
        self.current = value.checked_add(self.step);
        Some(
            ctx.provenance()
                .derive(None, value, self.base.full_name(), ActorType::DataGenerator),
        )
    }

    fn wrap_up(&mut self, _ctx: &FlowContext) {
        self.current = None;
    }

    configurable_options!();
}
