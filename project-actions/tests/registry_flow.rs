//! Dispatch and subscribe through the facade crate

use project_actions::prelude::*;
use project_actions::testing::ActionRecorder;
use project_actions::{assert_category_emitted, assert_emitted, assert_not_emitted, count_emitted};
use serde_json::{json, Value};

/// Answers every loadStats request with success, or error when the payload asks for it
fn spawn_stats_responder(registry: ActionRegistry<ProjectAction>) {
    let mut requests = registry.subscribe(ProjectAction::LoadStats);
    tokio::spawn(async move {
        while let Ok(event) = requests.recv().await {
            if event.payload["fail"] == json!(true) {
                registry.dispatch(ProjectAction::LoadStatsError, json!("stats unavailable"));
            } else {
                let project = event.payload["project"].clone();
                registry.dispatch(
                    ProjectAction::LoadStatsSuccess,
                    json!({ "project": project, "received": 10 }),
                );
            }
        }
    });
}

#[tokio::test]
async fn test_request_answered_by_success() {
    let registry: ActionRegistry<ProjectAction> = ActionRegistry::new();
    let mut outcomes = registry.subscribe(ProjectAction::LoadStatsSuccess);
    spawn_stats_responder(registry.clone());

    let delivered = registry
        .lookup("loadStats")
        .unwrap()
        .dispatch(json!({ "project": "api" }));
    assert_eq!(delivered, 1);

    let event = outcomes.recv().await.unwrap();
    assert_eq!(event.payload["project"], "api");
    assert_eq!(event.payload["received"], 10);
}

#[tokio::test]
async fn test_request_answered_by_error() {
    let registry: ActionRegistry<ProjectAction> = ActionRegistry::new();
    let mut all = registry.subscribe_all();
    spawn_stats_responder(registry.clone());

    registry.dispatch(ProjectAction::LoadStats, json!({ "fail": true }));

    let request = all.recv().await.unwrap();
    let outcome = all.recv().await.unwrap();
    assert_eq!(request.action, ProjectAction::LoadStats);
    assert_eq!(outcome.action, ProjectAction::LoadStatsError);
    assert_eq!(
        request.action.counterpart(Outcome::Error),
        Some(outcome.action)
    );
    assert!(outcome.sequence > request.sequence);
}

#[test]
fn test_recorder_sees_only_dispatches() {
    let registry: ActionRegistry<ProjectAction> = ActionRegistry::new();
    let mut recorder = ActionRecorder::new(&registry);

    // resolving handles and subscribing is not a dispatch
    let handle = registry.action(ProjectAction::SetActive);
    let _listener = handle.subscribe();
    assert!(!recorder.has_emitted());

    handle.dispatch(json!("p-1"));
    registry.dispatch(ProjectAction::ChangeSlug, json!({ "slug": "p-one" }));
    handle.dispatch(json!("p-2"));

    let actions = recorder.drain_actions();
    assert_emitted!(actions, ProjectAction::ChangeSlug);
    assert_not_emitted!(actions, ProjectAction::Update);
    assert_eq!(count_emitted!(actions, ProjectAction::SetActive), 2);
    assert_category_emitted!(actions, "change_slug");
}

#[test]
fn test_custom_payload_type() {
    #[derive(Debug, Clone, PartialEq, Default)]
    struct SlugChange {
        from: String,
        to: String,
    }

    let registry: ActionRegistry<ProjectAction, SlugChange> = ActionRegistry::new();
    let mut listener = registry.subscribe(ProjectAction::ChangeSlug);

    registry.action(ProjectAction::ChangeSlug).dispatch(SlugChange {
        from: "old".into(),
        to: "new".into(),
    });
    registry.action(ProjectAction::ChangeSlug).trigger();

    let events = listener.drain();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].payload.from, "old");
    assert_eq!(events[0].payload.to, "new");
    assert_eq!(events[1].payload, SlugChange::default());
}

#[test]
fn test_composed_middleware_sees_every_dispatch() {
    #[derive(Default)]
    struct Counter {
        before: usize,
        after: usize,
    }

    impl Middleware<ProjectAction> for Counter {
        fn before(&mut self, _action: &ProjectAction) {
            self.before += 1;
        }

        fn after(&mut self, _action: &ProjectAction, _delivered: usize) {
            self.after += 1;
        }
    }

    let registry: ActionRegistry<ProjectAction, Value, Counter> =
        ActionRegistry::with_middleware(8, Counter::default());

    for &action in ProjectAction::all() {
        registry.dispatch(action, Value::Null);
    }

    registry.with_middleware_mut(|counter| {
        assert_eq!(counter.before, 12);
        assert_eq!(counter.after, 12);
    });
}
