//! End-to-end tests for flow execution.

#[cfg(test)]
mod tests {
    use crate::actor::options::set_option;
    use crate::actor::{Actor, ActorBase};
    use crate::actors::{
        CallableTransformer, EnterValue, ForLoop, GetStorageValue, InitStorageCache, LogSink,
        MapVariableIterator, MathExpression, PassThrough, SetStorageValue, SetVariable,
    };
    use crate::config::{ErrorHandling, FlowConfig};
    use crate::context::FlowContext;
    use crate::core::{Payload, Token};
    use crate::errors::ActorflowError;
    use crate::events::CollectingEventSink;
    use crate::interactive::{ChannelInteraction, HeadlessInteraction};
    use crate::pipeline::{FlowStatus, PipelineBuilder, SubFlow};
    use crate::testing::{
        assert_completed, assert_failed, assert_output_payloads, assert_stopped, ConstantSource,
        FailingActor, LifecycleLog, RecordingActor,
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    /// Records `key=value` from two variables whenever a token passes.
    #[derive(Debug)]
    struct VariableReader {
        base: ActorBase,
        key: String,
        value: String,
        seen: LifecycleLog,
    }

    impl VariableReader {
        fn new(name: &str, key: &str, value: &str, seen: LifecycleLog) -> Self {
            Self {
                base: ActorBase::new(name),
                key: key.to_string(),
                value: value.to_string(),
                seen,
            }
        }
    }

    #[async_trait]
    impl Actor for VariableReader {
        fn base(&self) -> &ActorBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ActorBase {
            &mut self.base
        }

        async fn do_execute(
            &mut self,
            input: Option<Token>,
            ctx: &FlowContext,
        ) -> Result<(), ActorflowError> {
            let key = ctx.variables().get(&self.key)?;
            let value = ctx.variables().get(&self.value)?;
            self.seen.lock().push(format!("{key}={value}"));
            if let Some(token) = input {
                self.base.emit(token);
            }
            Ok(())
        }
    }

    fn doubles(values: &[f64]) -> Vec<Payload> {
        values.iter().map(|v| Payload::from(*v)).collect()
    }

    fn integers(values: &[i64]) -> Vec<Payload> {
        values.iter().map(|v| Payload::from(*v)).collect()
    }

    #[tokio::test]
    async fn test_variable_change_reconfigures_downstream() {
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 3, 1))
            .actor(SetVariable::new("SetExp", "exp"))
            .actor(MathExpression::new("Pow", "pow(X, @{exp})"))
            .variable("exp", "1")
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_completed(&result);
        assert_output_payloads(&result, &doubles(&[1.0, 4.0, 27.0]));
        assert_eq!(flow.context().variables().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_map_iterator_sets_variables_per_entry() {
        let seen = RecordingActor::shared_log();
        let map = Payload::from(crate::db::row([("a", 1_i64), ("b", 2_i64)]));
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ConstantSource::new("Const", vec![map]))
            .actor(MapVariableIterator::new("Iter", "key", "value"))
            .actor(VariableReader::new("Reader", "key", "value", seen.clone()))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_completed(&result);
        assert_eq!(result.outputs.len(), 2);
        assert_eq!(*seen.lock(), vec!["a=1", "b=2"]);
    }

    #[tokio::test]
    async fn test_skipped_map_iterator_forwards_token() {
        let map = Payload::from(crate::db::row([("a", 1_i64)]));
        let mut iter = MapVariableIterator::new("Iter", "key", "value");
        set_option(&mut iter, "skip", "true").unwrap();
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ConstantSource::new("Const", vec![map.clone()]))
            .actor(PassThrough::new("In"))
            .actor(iter)
            .actor(PassThrough::new("Out"))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_completed(&result);
        assert!(result.errors.is_empty());
        assert_output_payloads(&result, &[map]);
        assert!(!flow.context().variables().has("key"));
    }

    #[tokio::test]
    async fn test_pending_output_resumes_depth_first() {
        let log = RecordingActor::shared_log();
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 2, 1))
            .actor(RecordingActor::with_log("A", log.clone()))
            .actor(RecordingActor::with_log("B", log.clone()))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_output_payloads(&result, &integers(&[1, 2]));
        assert_eq!(
            *log.lock(),
            vec![
                "A.set_up",
                "B.set_up",
                "A.execute",
                "B.execute",
                "A.execute",
                "B.execute",
                "B.wrap_up",
                "A.wrap_up",
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_flow_on_error_prevents_downstream() {
        let log = RecordingActor::shared_log();
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 3, 1))
            .actor(FailingActor::at_execute("Bad", "boom").stopping_flow())
            .actor(RecordingActor::with_log("After", log.clone()))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_failed(&result, "Flow.Bad: boom");
        assert_eq!(result.errors, vec!["Flow.Bad: boom".to_string()]);
        assert_eq!(result.stop_message.as_deref(), Some("Flow.Bad: boom"));
        assert_eq!(*log.lock(), vec!["After.set_up", "After.wrap_up"]);
    }

    #[tokio::test]
    async fn test_non_fatal_errors_end_only_their_branch() {
        let log = RecordingActor::shared_log();
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 3, 1))
            .actor(FailingActor::at_execute("Bad", "boom"))
            .actor(RecordingActor::with_log("After", log.clone()))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_eq!(result.status, FlowStatus::Completed);
        assert!(!result.is_success());
        assert_eq!(result.errors.len(), 3);
        assert!(result.outputs.is_empty());
        assert!(!log.lock().iter().any(|e| e == "After.execute"));

        // Errors are per run.
        let again = flow.run(None).await;
        assert_eq!(again.errors.len(), 3);
    }

    #[tokio::test]
    async fn test_always_stop_on_error_mode() {
        let mut flow = PipelineBuilder::new("Flow")
            .with_config(
                FlowConfig::default().with_error_handling(ErrorHandling::ActorsAlwaysStopOnError),
            )
            .actor(ForLoop::new("Loop", 1, 3, 1))
            .actor(FailingActor::at_execute("Bad", "boom"))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_failed(&result, "boom");
        assert_eq!(result.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_set_up_failure_still_wraps_up_every_actor_once() {
        let log = RecordingActor::shared_log();
        let mut flow = PipelineBuilder::new("Flow")
            .actor(RecordingActor::with_log("A", log.clone()))
            .actor(FailingActor::at_set_up("Bad", "no config"))
            .actor(RecordingActor::with_log("C", log.clone()))
            .build()
            .unwrap();

        let result = flow.run(Some(Token::new(1_i64))).await;

        assert_failed(&result, "Flow.Bad: no config");
        assert_eq!(*log.lock(), vec!["A.set_up", "C.wrap_up", "A.wrap_up"]);
    }

    #[tokio::test]
    async fn test_panicking_actor_fails_flow_cleanly() {
        let mut flow = PipelineBuilder::new("Flow")
            .actor(FailingActor::panicking("Wild", "kaboom").stopping_flow())
            .build()
            .unwrap();

        let result = flow.run(Some(Token::new(1_i64))).await;

        assert_failed(&result, "Flow.Wild: panicked: kaboom");
    }

    #[tokio::test]
    async fn test_stop_handle_releases_waiting_interaction() {
        let ui = ChannelInteraction::new();
        let mut flow = PipelineBuilder::new("Flow")
            .actor(EnterValue::new("Ask", "Value?"))
            .actor(PassThrough::new("Next"))
            .with_interaction(Arc::new(ui.clone()))
            .build()
            .unwrap();
        let handle = flow.stop_handle();

        let stopper = tokio::spawn({
            let ui = ui.clone();
            async move {
                for _ in 0..200 {
                    if ui.pending_count() > 0 {
                        handle.stop("user abort");
                        return;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
        });
        let result = flow.run(Some(Token::new(true))).await;
        stopper.await.unwrap();

        assert_stopped(&result);
        assert_eq!(result.stop_message.as_deref(), Some("user abort"));
        assert!(result.errors.is_empty());
        assert!(result.outputs.is_empty());
        assert_eq!(ui.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_before_run_is_discarded() {
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 2, 1))
            .build()
            .unwrap();
        flow.stop_handle().stop("too early");

        let result = flow.run(None).await;

        assert_completed(&result);
        assert_eq!(result.outputs.len(), 2);
    }

    #[tokio::test]
    async fn test_interactive_cancel_stops_flow() {
        let log = RecordingActor::shared_log();
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 3, 1))
            .actor(EnterValue::new("Ask", "Continue?").stop_flow_if_canceled(""))
            .actor(RecordingActor::with_log("After", log.clone()))
            .with_interaction(Arc::new(HeadlessInteraction::cancelling()))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_stopped(&result);
        assert_eq!(result.stop_message.as_deref(), Some("Flow canceled: Flow.Ask"));
        assert!(result.errors.is_empty());
        assert!(!log.lock().iter().any(|e| e == "After.execute"));
    }

    #[tokio::test]
    async fn test_headless_run_never_prompts() {
        let ui = ChannelInteraction::new();
        let mut flow = PipelineBuilder::new("Flow")
            .with_config(FlowConfig::default().with_headless(true))
            .actor(EnterValue::new("Ask", "Value?").with_initial_value("yes"))
            .with_interaction(Arc::new(ui.clone()))
            .build()
            .unwrap();

        let result = flow.run(Some(Token::new(true))).await;

        assert_output_payloads(&result, &[Payload::from("yes")]);
        assert_eq!(ui.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_callable_actor_shared_lifecycle() {
        let log = RecordingActor::shared_log();
        let mut flow = PipelineBuilder::new("Flow")
            .callable(RecordingActor::with_log("Rec", log.clone()))
            .callable(MathExpression::new("Double", "X*2"))
            .actor(ForLoop::new("Loop", 1, 3, 1))
            .actor(CallableTransformer::new("Call", "Rec"))
            .actor(CallableTransformer::new("Twice", "Double"))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_completed(&result);
        assert_output_payloads(&result, &doubles(&[2.0, 4.0, 6.0]));
        assert_eq!(
            *log.lock(),
            vec![
                "Rec.set_up",
                "Rec.execute",
                "Rec.execute",
                "Rec.execute",
                "Rec.wrap_up",
            ]
        );
        assert_eq!(flow.callables(), &["Rec".to_string(), "Double".to_string()]);
    }

    #[test]
    fn test_unknown_callable_rejected_at_build() {
        let err = PipelineBuilder::new("Flow")
            .actor(CallableTransformer::new("Call", "Missing"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("FLOW-005-UNKNOWN_CALLABLE"));
    }

    #[tokio::test]
    async fn test_provenance_follows_tokens() {
        let mut flow = PipelineBuilder::new("Flow")
            .with_config(FlowConfig::default().with_provenance(true))
            .actor(ForLoop::new("Loop", 1, 1, 1))
            .actor(MathExpression::new("Inc", "X+1"))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        let chain = result.outputs[0].provenance().unwrap();
        assert_eq!(chain.actors(), vec!["Flow.Loop", "Flow.Inc"]);
    }

    #[tokio::test]
    async fn test_provenance_disabled_by_default() {
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 1, 1))
            .actor(MathExpression::new("Inc", "X+1"))
            .build()
            .unwrap();

        let result = flow.run(None).await;
        assert!(!result.outputs[0].has_provenance());
    }

    #[tokio::test]
    async fn test_storage_cache_between_actors() {
        let mut flow = PipelineBuilder::new("Flow")
            .actor(InitStorageCache::new("Init", "lookup", 4))
            .actor(ForLoop::new("Loop", 1, 3, 1))
            .actor(SetStorageValue::new("Store", "last").in_cache("lookup"))
            .actor(GetStorageValue::new("Load", "last").in_cache("lookup"))
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_completed(&result);
        assert_output_payloads(&result, &integers(&[1, 2, 3]));
        assert!(flow.context().storage().has_in("lookup", "last"));
    }

    #[tokio::test]
    async fn test_subflow_in_flow() {
        let sub = SubFlow::new(
            "Sub",
            vec![
                Box::new(MathExpression::new("Inc", "X+1")),
                Box::new(MathExpression::new("Double", "X*2")),
            ],
        )
        .unwrap();
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 2, 1))
            .actor(sub)
            .build()
            .unwrap();

        let result = flow.run(None).await;

        assert_completed(&result);
        assert_output_payloads(&result, &doubles(&[4.0, 6.0]));
    }

    #[tokio::test]
    async fn test_skipped_actor_forwards_tokens() {
        let mut math = MathExpression::new("Math", "X*100");
        set_option(&mut math, "skip", "true").unwrap();
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 2, 1))
            .actor(math)
            .build()
            .unwrap();

        let result = flow.run(None).await;
        assert_output_payloads(&result, &integers(&[1, 2]));
    }

    #[tokio::test]
    async fn test_events_bracket_the_run() {
        let sink = Arc::new(CollectingEventSink::new());
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 1, 1))
            .actor(LogSink::new("Log"))
            .with_event_sink(sink.clone())
            .build()
            .unwrap();

        flow.run(None).await;

        let types = sink.event_types();
        assert_eq!(types.first(), Some(&"flow.started"));
        assert_eq!(types.last(), Some(&"flow.completed"));
        let log_events: Vec<&str> = sink
            .events_for_actor("Flow.Log")
            .iter()
            .map(|e| e.event_type.as_str())
            .collect();
        assert_eq!(log_events, vec!["actor.setup", "actor.executed", "actor.wrapped_up"]);
    }

    #[tokio::test]
    async fn test_clean_up_clears_shared_state() {
        let mut flow = PipelineBuilder::new("Flow")
            .actor(ForLoop::new("Loop", 1, 2, 1))
            .actor(SetStorageValue::new("Store", "last"))
            .variable("greeting", "hello")
            .build()
            .unwrap();

        flow.run(None).await;
        assert!(flow.context().storage().has("last"));

        flow.clean_up();

        assert!(!flow.context().storage().has("last"));
        assert!(!flow.context().variables().has("greeting"));
    }
}
