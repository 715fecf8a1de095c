//! Tests for the variable store.

#[cfg(test)]
mod tests {
    use crate::errors::VariableError;
    use crate::variables::{
        UnsetPolicy, VariableChangeEvent, VariableChangeListener, VariableChangeType,
        VariableStore,
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<VariableChangeEvent>>,
    }

    impl VariableChangeListener for Recorder {
        fn variable_changed(&self, event: &VariableChangeEvent) {
            self.events.lock().push(event.clone());
        }
    }

    #[test]
    fn test_get_unset_is_error() {
        let store = VariableStore::new();
        assert_eq!(store.get("exp"), Err(VariableError::NotSet("exp".to_string())));
        assert!(!store.has("exp"));
    }

    #[test]
    fn test_set_and_get() {
        let store = VariableStore::new();
        store.set("exp", "2").unwrap();
        assert_eq!(store.get("exp").unwrap(), "2");
        assert!(store.has("exp"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_invalid_name() {
        let store = VariableStore::new();
        assert_eq!(
            store.set("bad name", "x"),
            Err(VariableError::InvalidName("bad name".to_string()))
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_change_events_added_modified_removed() {
        let store = VariableStore::new();
        let recorder = Arc::new(Recorder::default());
        store.subscribe(recorder.clone());

        store.set("exp", "2").unwrap();
        store.set("exp", "3").unwrap();
        store.remove("exp");

        let events = recorder.events.lock().clone();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].change_type, VariableChangeType::Added);
        assert_eq!(events[0].old_value, None);
        assert_eq!(events[1].change_type, VariableChangeType::Modified);
        assert_eq!(events[1].old_value.as_deref(), Some("2"));
        assert_eq!(events[1].new_value.as_deref(), Some("3"));
        assert_eq!(events[2].change_type, VariableChangeType::Removed);
        assert_eq!(events[2].new_value, None);
    }

    #[test]
    fn test_remove_missing_fires_nothing() {
        let store = VariableStore::new();
        let recorder = Arc::new(Recorder::default());
        store.subscribe(recorder.clone());

        assert_eq!(store.remove("missing"), None);
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_listeners_notified_in_subscription_order() {
        let store = VariableStore::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            store.subscribe(Arc::new(move |_: &VariableChangeEvent| order.lock().push(i)));
        }

        store.set("x", "1").unwrap();
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_listener_observes_committed_value() {
        let store = Arc::new(VariableStore::new());
        let seen = Arc::new(Mutex::new(None));

        let store_clone = store.clone();
        let seen_clone = seen.clone();
        store.subscribe(Arc::new(move |event: &VariableChangeEvent| {
            *seen_clone.lock() = store_clone.get(&event.name).ok();
        }));

        store.set("x", "42").unwrap();
        assert_eq!(seen.lock().as_deref(), Some("42"));
    }

    #[test]
    fn test_unsubscribe() {
        let store = VariableStore::new();
        let recorder = Arc::new(Recorder::default());
        let id = store.subscribe(recorder.clone());

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.set("x", "1").unwrap();
        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_expand_keep_policy() {
        let store = VariableStore::new();
        store.set("exp", "2").unwrap();

        assert_eq!(store.expand("pow(X,@{exp})").unwrap(), "pow(X,2)");
        assert_eq!(store.expand("@{missing}+1").unwrap(), "@{missing}+1");
    }

    #[test]
    fn test_expand_empty_and_fail_policies() {
        let store = VariableStore::new();
        assert_eq!(
            store.expand_with("a@{missing}b", UnsetPolicy::Empty).unwrap(),
            "ab"
        );
        assert_eq!(
            store.expand_with("a@{missing}b", UnsetPolicy::Fail),
            Err(VariableError::NotSet("missing".to_string()))
        );

        let strict = VariableStore::new().with_unset_policy(UnsetPolicy::Fail);
        assert!(strict.expand("@{missing}").is_err());
    }

    #[test]
    fn test_expand_does_not_rescan_values() {
        let store = VariableStore::new();
        store.set("a", "@{b}").unwrap();
        store.set("b", "never").unwrap();

        assert_eq!(store.expand("@{a}").unwrap(), "@{b}");
    }

    #[test]
    fn test_expand_idempotent_without_placeholders_left() {
        let store = VariableStore::new();
        store.set("x", "1").unwrap();
        store.set("y", "two").unwrap();

        let once = store.expand("@{x} and @{y}").unwrap();
        let twice = store.expand(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_expand_nested_reference() {
        let store = VariableStore::new();
        store.set("which", "speed").unwrap();
        store.set("speed", "30").unwrap();

        assert_eq!(store.expand("v=@{@{which}}").unwrap(), "v=30");
    }

    #[test]
    fn test_expand_leaves_malformed_text() {
        let store = VariableStore::new();
        store.set("x", "1").unwrap();

        assert_eq!(store.expand("@{x").unwrap(), "@{x");
        assert_eq!(store.expand("@{a b}").unwrap(), "@{a b}");
        assert_eq!(store.expand("héllo @{x} wörld").unwrap(), "héllo 1 wörld");
    }

    #[test]
    fn test_env_variables_read_only() {
        let store = VariableStore::new();
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(store.get("env.PATH").unwrap(), path);
        }

        store.set("env.PATH", "overwritten").unwrap();
        assert!(!store.names().contains(&"env.PATH".to_string()));
    }

    #[test]
    fn test_env_variables_disabled() {
        let store = VariableStore::new().with_environment(false);
        assert!(store.get("env.PATH").is_err());
        store.set("env.custom", "1").unwrap();
        assert_eq!(store.get("env.custom").unwrap(), "1");
    }

    #[test]
    fn test_remove_matching() {
        let store = VariableStore::new();
        store.set("tmp.a", "1").unwrap();
        store.set("tmp.b", "2").unwrap();
        store.set("keep", "3").unwrap();

        let removed = store.remove_matching(&Regex::new(r"^tmp\.").unwrap());
        assert_eq!(removed, vec!["tmp.a".to_string(), "tmp.b".to_string()]);
        assert_eq!(store.names(), vec!["keep".to_string()]);
    }

    #[test]
    fn test_clear_fires_removed_and_clean_up_is_silent() {
        let store = VariableStore::new();
        let recorder = Arc::new(Recorder::default());
        store.subscribe(recorder.clone());
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();

        store.clear();
        assert!(store.is_empty());
        assert_eq!(recorder.events.lock().len(), 4);

        store.set("c", "3").unwrap();
        store.clean_up();
        assert!(store.is_empty());
        assert_eq!(store.listener_count(), 0);
        assert_eq!(recorder.events.lock().len(), 5);
    }

    #[test]
    fn test_get_clone_and_assign() {
        let store = VariableStore::new();
        store.set("a.1", "x").unwrap();
        store.set("b.1", "y").unwrap();
        store.subscribe(Arc::new(Recorder::default()));

        let filter = Regex::new(r"^a\.").unwrap();
        let copy = store.get_clone(Some(&filter));
        assert_eq!(copy.names(), vec!["a.1".to_string()]);
        assert_eq!(copy.listener_count(), 0);

        let target = VariableStore::new();
        let recorder = Arc::new(Recorder::default());
        target.subscribe(recorder.clone());
        target.assign(&store, None).unwrap();
        assert_eq!(target.len(), 2);
        assert_eq!(recorder.events.lock().len(), 2);
    }
}
