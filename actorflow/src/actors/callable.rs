//! Pushes tokens through a callable actor.

use crate::actor::{lifecycle, Actor, ActorBase, ActorOption, Configurable};
use crate::configurable_options;
use crate::context::FlowContext;
use crate::core::Token;
use crate::errors::ActorflowError;
use async_trait::async_trait;

/// Executes the callable actor registered under `callable` with each input
/// and forwards every token it produces.
///
/// The callable is shared: it is set up and wrapped up by the flow, not by
/// this actor.
#[derive(Debug)]
pub struct CallableTransformer {
    base: ActorBase,
    callable: String,
}

impl CallableTransformer {
    /// Creates the actor.
    #[must_use]
    pub fn new(name: impl Into<String>, callable: impl Into<String>) -> Self {
        Self {
            base: ActorBase::new(name),
            callable: callable.into(),
        }
    }

    /// Returns the callable name.
    #[must_use]
    pub fn callable(&self) -> &str {
        &self.callable
    }
}

impl Configurable for CallableTransformer {
    const OPTIONS: &'static [ActorOption<Self>] = &[ActorOption {
        name: "callable",
        description: "The name of the callable actor to use.",
        set: |a, v| {
            a.callable = v.to_string();
            Ok(())
        },
        get: |a| a.callable.clone(),
    }];
}

#[async_trait]
impl Actor for CallableTransformer {
    fn base(&self) -> &ActorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ActorBase {
        &mut self.base
    }

    fn referenced_callables(&self) -> Vec<String> {
        if self.base.binding("callable").is_some() {
            Vec::new()
        } else {
            vec![self.callable.clone()]
        }
    }

    fn set_up(&mut self, ctx: &FlowContext) -> Result<(), ActorflowError> {
        if !ctx.has_callable(&self.callable) {
            return Err(ActorflowError::configuration(
                self.base.full_name(),
                format!("Callable actor not found: {}", self.callable),
            ));
        }
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
        let callable = ctx.callable(&self.callable).ok_or_else(|| {
            ActorflowError::execution(
                self.base.full_name(),
                format!("Callable actor not found: {}", self.callable),
            )
        })?;

        let mut actor = callable.lock().await;
        let callable_path = actor.base().full_name().to_string();
        lifecycle::execute(&mut **actor, Some(token), ctx)
            .await
            .map_err(|message| ActorflowError::execution(callable_path, message))?;
        while lifecycle::has_pending_output(&**actor) {
            match lifecycle::output(&mut **actor, ctx) {
                Some(output) => self.base.emit(output),
                None => break,
            }
        }
        Ok(())
    }

    configurable_options!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actors::MathExpression;
    use crate::config::FlowConfig;
    use crate::core::Payload;
    use crate::testing::FailingActor;

    #[tokio::test]
    async fn test_forwards_callable_outputs() {
        let ctx = FlowContext::new("Flow", FlowConfig::default());
        ctx.register_callable("Double", Box::new(MathExpression::new("Double", "X*2")));
        if let Some(callable) = ctx.callable("Double") {
            lifecycle::set_up(&mut **callable.lock().await, &ctx).unwrap();
        }

        let mut actor = CallableTransformer::new("Call", "Double");
        lifecycle::set_up(&mut actor, &ctx).unwrap();
        lifecycle::execute(&mut actor, Some(Token::new(21_i64)), &ctx)
            .await
            .unwrap();

        let out = lifecycle::output(&mut actor, &ctx).unwrap();
        assert_eq!(out.payload(), &Payload::from(42.0));
    }

    #[tokio::test]
    async fn test_callable_error_keeps_its_own_path() {
        let ctx = FlowContext::new("Flow", FlowConfig::default());
        let mut bad = FailingActor::at_execute("Bad", "boom");
        bad.set_parent("Flow");
        ctx.register_callable("Bad", Box::new(bad));
        if let Some(callable) = ctx.callable("Bad") {
            lifecycle::set_up(&mut **callable.lock().await, &ctx).unwrap();
        }

        let mut actor = CallableTransformer::new("Call", "Bad");
        actor.set_parent("Flow");
        lifecycle::set_up(&mut actor, &ctx).unwrap();
        let err = lifecycle::execute(&mut actor, Some(Token::new(1_i64)), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err, "Flow.Bad: boom");
    }

    #[tokio::test]
    async fn test_unknown_callable_fails_set_up() {
        let ctx = FlowContext::new("Flow", FlowConfig::default());
        let mut actor = CallableTransformer::new("Call", "Missing");
        let err = lifecycle::set_up(&mut actor, &ctx).unwrap_err();
        assert_eq!(err, "Call: Callable actor not found: Missing");
    }

    #[test]
    fn test_bound_callable_not_checked_at_build() {
        let mut actor = CallableTransformer::new("Call", "Double");
        assert_eq!(actor.referenced_callables(), vec!["Double".to_string()]);
        actor.base_mut().bind("callable", "which");
        assert!(actor.referenced_callables().is_empty());
    }
}
