//! The lifecycle boundary between the driver and actor implementations.
//!
//! These functions own the actor state machine. They resolve variable
//! bindings, keep the variable watcher subscribed, apply `skip`, check
//! payload types, honour stops and convert every error or panic raised by
//! an actor hook into a plain message.

use super::options::apply_value;
use super::watcher::VariableWatcher;
use super::Actor;
use crate::context::FlowContext;
use crate::core::{ActorState, Token};
use crate::errors::{handle_exception, handle_panic, ActorflowError};
use crate::events::FlowEventType;
use crate::variables::VariableChangeEvent;
use futures::FutureExt;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Converts an actor error into the message recorded by the driver.
///
/// Messages raised by nested or callable actors already carry their own
/// path and are kept as they are.
#[must_use]
pub fn error_message(actor_path: &str, error: &ActorflowError) -> String {
    match error {
        ActorflowError::Configuration { actor, message }
        | ActorflowError::Execution { actor, message } => {
            let carries_path = message.starts_with(&format!("{actor_path}."))
                || (actor != actor_path
                    && (message.starts_with(&format!("{actor}: "))
                        || message.starts_with(&format!("{actor}."))));
            if carries_path {
                message.clone()
            } else {
                format!("{actor_path}: {message}")
            }
        }
        other => handle_exception(actor_path, "", other),
    }
}

/// Sets up `actor` for a new run.
///
/// Resets the stop signal, links it to the flow's stop token, resolves bound
/// options, runs the set-up hook and subscribes the variable watcher.
pub fn set_up(actor: &mut dyn Actor, ctx: &FlowContext) -> Result<(), String> {
    let path = actor.base().full_name().to_string();
    actor.base_mut().reset_stop();
    actor.base_mut().clear_pending();
    actor.base_mut().set_last_error(None);
    release_watcher(actor, ctx);

    let actor_stop = actor.base().stop_token();
    let flow_stop = Arc::downgrade(ctx.stop_token());
    ctx.stop_token().on_stop(move || {
        let reason = flow_stop
            .upgrade()
            .and_then(|token| token.reason())
            .unwrap_or_else(|| "Flow stopped".to_string());
        actor_stop.stop(reason);
    });

    if let Err(message) = configure(actor, ctx) {
        return Err(fail(actor, ctx, message));
    }
    attach_watcher(actor, ctx);

    actor.base_mut().set_state(ActorState::SetUp);
    debug!(actor = %path, "Actor set up");
    ctx.try_emit(FlowEventType::ActorSetUp, Some(&path), None);
    Ok(())
}

/// Executes `actor` once with `input`.
///
/// A stopped actor does nothing. Recorded variable changes are applied
/// first; a skipped actor forwards its input. Cancellation is not an error.
pub async fn execute(
    actor: &mut dyn Actor,
    input: Option<Token>,
    ctx: &FlowContext,
) -> Result<(), String> {
    let path = actor.base().full_name().to_string();
    if actor.base().is_stopped() {
        debug!(actor = %path, "Actor stopped, not executing");
        return Ok(());
    }

    let changes = actor
        .base()
        .watcher()
        .filter(|w| w.has_changes())
        .map(|w| w.take_changes());
    if let Some(events) = changes {
        if let Err(message) = reconfigure(actor, ctx, &events) {
            return Err(fail(actor, ctx, message));
        }
    }

    if actor.base().skip() {
        if let Some(token) = input {
            actor.base_mut().emit(token);
        }
        actor.base_mut().set_state(ActorState::Ready);
        return Ok(());
    }

    if let Some(token) = &input {
        let actual = token.payload_type();
        if !actor.accepts().iter().any(|accepted| accepted.accepts(actual)) {
            let message = format!("{path}: Input type {actual} not accepted");
            return Err(fail(actor, ctx, message));
        }
    }

    actor.base_mut().set_state(ActorState::Executing);
    let outcome = AssertUnwindSafe(actor.do_execute(input, ctx))
        .catch_unwind()
        .await;

    let message = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) if e.is_cancellation() => {
            debug!(actor = %path, reason = %e.message(), "Actor execution cancelled");
            actor.base_mut().set_state(ActorState::Stopped);
            return Ok(());
        }
        Ok(Err(e)) => Some(error_message(&path, &e)),
        Err(panic) => Some(handle_panic(&path, "", panic.as_ref())),
    };

    if let Some(message) = message {
        return Err(fail(actor, ctx, message));
    }

    let state = if actor.base().is_stopped() {
        ActorState::Stopped
    } else {
        ActorState::Ready
    };
    actor.base_mut().set_state(state);
    ctx.try_emit(FlowEventType::ActorExecuted, Some(&path), None);
    Ok(())
}

/// Returns true if `actor` has output waiting. Always false once stopped.
///
/// Tokens queued on the base (skipped inputs included) count even when the
/// actor overrides its own output hooks.
#[must_use]
pub fn has_pending_output(actor: &dyn Actor) -> bool {
    !actor.base().is_stopped() && (actor.base().has_pending_output() || actor.has_pending_output())
}

/// Takes the next output token of `actor`. A stopped actor drops its
/// pending output and returns `None`.
///
/// The base queue is drained before the actor's output hook runs.
pub fn output(actor: &mut dyn Actor, ctx: &FlowContext) -> Option<Token> {
    if actor.base().is_stopped() {
        actor.base_mut().clear_pending();
        return None;
    }
    let token = match actor.base_mut().pop_output() {
        Some(token) => token,
        None => actor.output(ctx)?,
    };
    ctx.try_emit(
        FlowEventType::ActorOutput,
        Some(actor.base().full_name()),
        Some(serde_json::json!({ "type": token.payload_type() })),
    );
    Some(token)
}

/// Wraps up `actor`. Safe to call whether or not set-up ran or succeeded.
pub fn wrap_up(actor: &mut dyn Actor, ctx: &FlowContext) {
    let path = actor.base().full_name().to_string();
    release_watcher(actor, ctx);

    if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| actor.wrap_up(ctx))) {
        warn!(actor = %path, "{}", handle_panic(&path, "Wrap-up ", panic.as_ref()));
    }

    actor.base_mut().clear_pending();
    actor.base_mut().set_state(ActorState::Unconfigured);
    debug!(actor = %path, "Actor wrapped up");
    ctx.try_emit(FlowEventType::ActorWrappedUp, Some(&path), None);
}

/// Resolves bound options and runs the set-up hook.
fn configure(actor: &mut dyn Actor, ctx: &FlowContext) -> Result<(), String> {
    let path = actor.base().full_name().to_string();
    for (option, variable) in actor.base().bindings() {
        let value = ctx
            .variables()
            .get(&variable)
            .map_err(|e| format!("{path}: Option '{option}': {e}"))?;
        apply_value(actor, &option, &value).map_err(|e| error_message(&path, &e))?;
    }

    match std::panic::catch_unwind(AssertUnwindSafe(|| actor.set_up(ctx))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(error_message(&path, &e)),
        Err(panic) => Err(handle_panic(&path, "Set-up ", panic.as_ref())),
    }
}

/// Applies recorded variable changes while preserving derived state.
fn reconfigure(
    actor: &mut dyn Actor,
    ctx: &FlowContext,
    events: &[VariableChangeEvent],
) -> Result<(), String> {
    debug!(
        actor = %actor.base().full_name(),
        variables = ?events.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        "Re-configuring after variable change"
    );
    let mut backup = actor.backup_state();
    configure(actor, ctx)?;
    actor.restore_state(&mut backup);
    actor.variable_changed(events);

    // The referenced variables may differ under the new configuration.
    release_watcher(actor, ctx);
    attach_watcher(actor, ctx);
    Ok(())
}

fn attach_watcher(actor: &mut dyn Actor, ctx: &FlowContext) {
    let mut names: BTreeSet<String> = actor
        .base()
        .bindings()
        .into_iter()
        .map(|(_, variable)| variable)
        .collect();
    names.extend(actor.referenced_variables());
    names.extend(actor.base().watched().iter().cloned());
    if names.is_empty() {
        return;
    }

    let watcher = Arc::new(VariableWatcher::new(names));
    let id = ctx.variables().subscribe(watcher.clone());
    actor.base_mut().attach_watcher(watcher, id);
}

fn release_watcher(actor: &mut dyn Actor, ctx: &FlowContext) {
    if let Some(id) = actor.base_mut().detach_watcher() {
        ctx.variables().unsubscribe(id);
    }
}

fn fail(actor: &mut dyn Actor, ctx: &FlowContext, message: String) -> String {
    actor.base_mut().set_state(ActorState::Failed);
    actor.base_mut().set_last_error(Some(message.clone()));
    ctx.try_emit(
        FlowEventType::ActorFailed,
        Some(actor.base().full_name()),
        Some(serde_json::json!({ "error": &message })),
    );
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::options::set_option;
    use crate::actors::{MapVariableIterator, MathExpression, ScaleFilter};
    use crate::config::FlowConfig;
    use crate::core::{Payload, Value};
    use crate::events::CollectingEventSink;
    use crate::testing::FailingActor;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn context() -> FlowContext {
        FlowContext::new("Flow", FlowConfig::default())
    }

    async fn run_once(actor: &mut dyn Actor, ctx: &FlowContext, input: Token) -> Vec<Token> {
        execute(actor, Some(input), ctx).await.unwrap();
        let mut outputs = Vec::new();
        while has_pending_output(actor) {
            outputs.extend(output(actor, ctx));
        }
        outputs
    }

    #[tokio::test]
    async fn test_variable_driven_reconfiguration() {
        let ctx = context();
        ctx.variables().set("exp", "2").unwrap();
        let mut math = MathExpression::new("Math", "pow(X,@{exp})");
        math.set_parent("Flow");

        set_up(&mut math, &ctx).unwrap();
        let first = run_once(&mut math, &ctx, Token::new(3_i64)).await;
        assert_eq!(first[0].payload(), &Payload::from(9.0));

        ctx.variables().set("exp", "3").unwrap();
        let second = run_once(&mut math, &ctx, Token::new(3_i64)).await;
        assert_eq!(second[0].payload(), &Payload::from(27.0));

        wrap_up(&mut math, &ctx);
        assert_eq!(ctx.variables().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_bound_option_resolved_at_set_up() {
        let ctx = context();
        ctx.variables().set("formula", "X*2").unwrap();
        let mut math = MathExpression::new("Math", "X");
        set_option(&mut math, "expression", "@{formula}").unwrap();

        set_up(&mut math, &ctx).unwrap();
        let out = run_once(&mut math, &ctx, Token::new(4_i64)).await;
        assert_eq!(out[0].payload(), &Payload::from(8.0));
    }

    #[tokio::test]
    async fn test_unset_bound_variable_fails_set_up() {
        let ctx = context();
        let mut math = MathExpression::new("Math", "X");
        math.set_parent("Flow");
        set_option(&mut math, "expression", "@{formula}").unwrap();

        let err = set_up(&mut math, &ctx).unwrap_err();
        assert!(err.starts_with("Flow.Math: "));
        assert!(err.contains("Variable not set: formula"));
        assert_eq!(math.base().state(), ActorState::Failed);
        assert_eq!(math.base().last_error(), Some(err.as_str()));
    }

    #[tokio::test]
    async fn test_skip_forwards_input() {
        let ctx = context();
        let mut math = MathExpression::new("Math", "X*10");
        math.base_mut().set_skip(true);
        set_up(&mut math, &ctx).unwrap();

        let out = run_once(&mut math, &ctx, Token::new(5_i64)).await;
        assert_eq!(out[0].payload(), &Payload::from(5_i64));
    }

    #[tokio::test]
    async fn test_skip_forwards_input_past_output_override() {
        let ctx = context();
        let mut iter = MapVariableIterator::new("Iter", "key", "value");
        iter.base_mut().set_skip(true);
        set_up(&mut iter, &ctx).unwrap();

        let mut map = IndexMap::new();
        map.insert("a".to_string(), Value::Integer(1));
        let input = Token::new(map);
        let out = run_once(&mut iter, &ctx, input.clone()).await;

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload(), input.payload());
        assert!(!ctx.variables().has("key"));
    }

    #[tokio::test]
    async fn test_execute_error_becomes_message() {
        let ctx = context();
        let mut actor = FailingActor::at_execute("Bad", "boom");
        actor.set_parent("Flow");
        set_up(&mut actor, &ctx).unwrap();

        let err = execute(&mut actor, Some(Token::new(1_i64)), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err, "Flow.Bad: boom");
        assert_eq!(actor.base().state(), ActorState::Failed);
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let ctx = context();
        let mut actor = FailingActor::panicking("Wild", "kaboom");
        set_up(&mut actor, &ctx).unwrap();

        let err = execute(&mut actor, Some(Token::new(1_i64)), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err, "Wild: panicked: kaboom");
    }

    #[tokio::test]
    async fn test_rejects_unaccepted_payload() {
        let ctx = context();
        let mut filter = ScaleFilter::new("Scale", "1");
        set_up(&mut filter, &ctx).unwrap();

        let err = execute(&mut filter, Some(Token::new("text")), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err, "Scale: Input type string not accepted");
    }

    #[tokio::test]
    async fn test_flow_stop_reaches_actor() {
        let ctx = context();
        let mut math = MathExpression::new("Math", "X");
        set_up(&mut math, &ctx).unwrap();

        execute(&mut math, Some(Token::new(1_i64)), &ctx).await.unwrap();
        ctx.stop_flow("halt");

        assert!(math.base().is_stopped());
        assert_eq!(math.base().stop_message().as_deref(), Some("halt"));
        assert!(!has_pending_output(&math));
        assert!(output(&mut math, &ctx).is_none());
    }

    #[tokio::test]
    async fn test_set_up_resets_previous_stop() {
        let ctx = context();
        let mut math = MathExpression::new("Math", "X");
        math.base().stop_execution("old run");

        set_up(&mut math, &ctx).unwrap();
        assert!(!math.base().is_stopped());
    }

    #[tokio::test]
    async fn test_wrap_up_without_set_up() {
        let ctx = context();
        let mut math = MathExpression::new("Math", "X");
        wrap_up(&mut math, &ctx);
        assert_eq!(math.base().state(), ActorState::Unconfigured);
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let ctx = FlowContext::new("Flow", FlowConfig::default()).with_event_sink(sink.clone());
        let mut math = MathExpression::new("Math", "X+1");

        set_up(&mut math, &ctx).unwrap();
        run_once(&mut math, &ctx, Token::new(1_i64)).await;
        wrap_up(&mut math, &ctx);

        assert_eq!(
            sink.event_types(),
            vec!["actor.setup", "actor.executed", "actor.output", "actor.wrapped_up"]
        );
    }

    #[test]
    fn test_error_message_formats() {
        let err = ActorflowError::execution("ignored", "bad input");
        assert_eq!(error_message("Flow.A", &err), "Flow.A: bad input");

        let err = ActorflowError::configuration("Flow.Sub", "Flow.Sub.Inner: unset");
        assert_eq!(error_message("Flow.Sub", &err), "Flow.Sub.Inner: unset");

        let err = ActorflowError::execution("Flow.Double", "Flow.Double: boom");
        assert_eq!(error_message("Flow.Call", &err), "Flow.Double: boom");

        let err = ActorflowError::Resource("disk full".to_string());
        assert_eq!(error_message("Flow.A", &err), "Flow.A: Resource error: disk full");
    }
}
