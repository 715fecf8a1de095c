//! Actors that forward or consume tokens without transforming them.

use crate::actor::{Actor, ActorBase, ActorOption, Configurable};
use crate::configurable_options;
use crate::context::FlowContext;
use crate::core::{ActorKind, PayloadType, Token};
use crate::errors::ActorflowError;
use async_trait::async_trait;
use tracing::info;

/// Forwards every token unchanged.
#[derive(Debug)]
pub struct PassThrough {
    base: ActorBase,
}

impl PassThrough {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
        }
    }
}

#[async_trait]
impl Actor for PassThrough {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        _ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        if let Some(token) = input {
            self.base.emit(token);
        }
        Ok(())
    }
}

/// Swallows every token.
#[derive(Debug)]
pub struct NullSink {
    base: ActorBase,
}

impl NullSink {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
        }
    }
}

#[async_trait]
impl Actor for NullSink {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Sink
    }

    fn generates(&self) -> Vec<PayloadType> {
        Vec::new()
    }

    async fn do_execute(
        &mut self,
        _input: Option<Token>,
        _ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        Ok(())
    }
}

/// Logs every token through `tracing` at info level.
#[derive(Debug)]
pub struct LogSink {
    base: ActorBase,
    prefix: String,
    count: usize,
}

impl LogSink {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            prefix: String::new(),
            count: 0,
        }
    }

    /// Sets the text logged before each token.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Returns the number of tokens logged since set-up.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Configurable for LogSink {
    const OPTIONS: &'static [ActorOption<Self>] = &[ActorOption {
        name: "prefix",
        description: "Text logged before each token; may contain variables.",
        set: |a, v| {
            a.prefix = v.to_string();
            Ok(())
        },
        get: |a| a.prefix.clone(),
    }];
}

#[async_trait]
impl Actor for LogSink {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn kind(&self) -> ActorKind {
        ActorKind::Sink
    }

    fn generates(&self) -> Vec<PayloadType> {
        Vec::new()
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        self.count = 0;
        Ok(())
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        let Some(token) = input else {
            return Ok(());
        };
        let prefix = ctx.expand(&self.prefix)?;
        self.count += 1;
        info!(actor = %self.base.full_name(), count = self.count, "{prefix}{token}");
        Ok(())
    }

    configurable_options!();
}
