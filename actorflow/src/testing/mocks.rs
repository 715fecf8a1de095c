//! Scripted actors for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::actor::{Actor, ActorBase};
use crate::context::FlowContext;
use crate::core::{ActorKind, Payload, PayloadType, Token};
use crate::errors::ActorflowError;

/// A lifecycle log shared between several [`RecordingActor`]s.
pub type LifecycleLog = Arc<Mutex<Vec<String>>>;

/// Forwards every token and records `"<name>.set_up"`, `"<name>.execute"`
/// and `"<name>.wrap_up"` in its log.
#[derive(Debug)]
pub struct RecordingActor {
    base: ActorBase,
    log: LifecycleLog,
}

impl RecordingActor {
    /// Creates a recorder with its own log.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_log(name, Self::shared_log())
    }

    /// Creates an empty log to share between recorders.
    #[must_use]
    pub fn shared_log() -> LifecycleLog {
        Arc::new(Mutex::new(Vec::new()))
    }

    /// Creates a recorder writing to `log`.
    #[must_use]
    pub fn with_log(name: impl Into<String>, log: LifecycleLog) -> Self {
        Self {
            base: ActorBase::new(name),
            log,
        }
    }

    /// Returns the log.
    #[must_use]
    pub fn log(&self) -> LifecycleLog {
        Arc::clone(&self.log)
    }

    /// Returns how often `execute` ran.
    #[must_use]
    pub fn execution_count(&self) -> usize {
        let entry = format!("{}.execute", self.base.name());
        self.log.lock().iter().filter(|e| **e == entry).count()
    }

    fn record(&self, call: &str) {
        self.log.lock().push(format!("{}.{call}", self.base.name()));
    }
}

#[async_trait]
impl Actor for RecordingActor {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        self.record("set_up");
        Ok(())
    }

    async fn do_execute(
        &mut self,
        input: Option<Token>,
        _ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        self.record("execute");
        if let Some(token) = input {
            self.base.emit(token);
        }
        Ok(())
    }

    fn wrap_up(&mut self, _ctx: &FlowContext) {
        self.record("wrap_up");
    }
}

/// Where a [`FailingActor`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// The set-up hook returns a configuration error.
    SetUp,
    /// Every execute returns an execution error.
    Execute,
    /// Every execute panics.
    Panic,
}

/// An actor that fails at a chosen point with a chosen message.
#[derive(Debug)]
pub struct FailingActor {
    base: ActorBase,
    point: FailurePoint,
    message: String,
    attempts: usize,
}

impl FailingActor {
    fn new(name: impl Into<String>, point: FailurePoint, message: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            point,
            message: message.into(),
            attempts: 0,
        }
    }

    /// Fails during set-up.
    #[must_use]
    pub fn at_set_up(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, FailurePoint::SetUp, message)
    }

    /// Fails on every token.
    #[must_use]
    pub fn at_execute(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, FailurePoint::Execute, message)
    }

    /// Panics on every token.
    #[must_use]
    pub fn panicking(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, FailurePoint::Panic, message)
    }

    /// Sets `stop-flow-on-error`.
    #[must_use]
    pub fn stopping_flow(mut self) -> Self {
        self.base.set_stop_flow_on_error(true);
        self
    }

    /// Returns how many tokens reached the actor.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

#[async_trait]
impl Actor for FailingActor {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn set_up(&mut self, _ctx: &FlowContext) -> Result<(), ActorflowError> {
        if self.point == FailurePoint::SetUp {
            return Err(ActorflowError::configuration(
                self.base.full_name(),
                self.message.clone(),
            ));
        }
        Ok(())
    }

    async fn do_execute(
        &mut self,
        _input: Option<Token>,
        _ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        self.attempts += 1;
        match self.point {
            FailurePoint::Panic => panic!("{}", self.message),
            FailurePoint::SetUp => Ok(()),
            FailurePoint::Execute => Err(ActorflowError::execution(
                self.base.full_name(),
                self.message.clone(),
            )),
        }
    }
}

/// A source emitting a fixed list of payloads, all queued at once.
#[derive(Debug)]
pub struct ConstantSource {
    base: ActorBase,
    values: Vec<Payload>,
}

impl ConstantSource {
    /// Creates the source.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<Payload>) -> Self {
        Self {
            base: ActorBase::new(name),
            values,
        }
    }
}

#[async_trait]
impl Actor for ConstantSource {
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
        let mut types: Vec<PayloadType> = Vec::new();
        for value in &self.values {
            let t = value.payload_type();
            if !types.contains(&t) {
                types.push(t);
            }
        }
        if types.is_empty() {
            types.push(PayloadType::Unknown);
        }
        types
    }

    async fn do_execute(
        &mut self,
        _input: Option<Token>,
        _ctx: &FlowContext,
    ) -> Result<(), ActorflowError> {
        for value in &self.values {
            self.base.emit(Token::new(value.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::lifecycle;
    use crate::config::FlowConfig;
    use pretty_assertions::assert_eq;

    fn context() -> FlowContext {
        FlowContext::new("Flow", FlowConfig::default())
    }

    #[tokio::test]
    async fn test_recording_actor_logs_lifecycle() {
        let ctx = context();
        let mut actor = RecordingActor::new("Rec");
        lifecycle::set_up(&mut actor, &ctx).unwrap();
        lifecycle::execute(&mut actor, Some(Token::new(1_i64)), &ctx)
            .await
            .unwrap();
        lifecycle::wrap_up(&mut actor, &ctx);

        assert_eq!(
            *actor.log().lock(),
            vec!["Rec.set_up", "Rec.execute", "Rec.wrap_up"]
        );
        assert_eq!(actor.execution_count(), 1);
    }

    #[test]
    fn test_failing_actor_at_set_up() {
        let ctx = context();
        let mut actor = FailingActor::at_set_up("Bad", "no config");
        let err = lifecycle::set_up(&mut actor, &ctx).unwrap_err();
        assert_eq!(err, "Bad: no config");
        assert_eq!(actor.attempts(), 0);
    }

    #[test]
    fn test_constant_source_queues_all_values() {
        let ctx = context();
        let mut source = ConstantSource::new("Const", vec![1_i64.into(), 2.5.into()]);
        lifecycle::set_up(&mut source, &ctx).unwrap();
        tokio_test::block_on(lifecycle::execute(&mut source, None, &ctx)).unwrap();

        assert_eq!(source.base().pending_count(), 2);
        assert_eq!(
            source.generates(),
            vec![PayloadType::Integer, PayloadType::Double]
        );
    }
}
