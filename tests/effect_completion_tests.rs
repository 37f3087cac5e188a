// Copyright 2025 Cowboy AI, LLC.

mod common;

use cim_model::wiring::bind_action_creators;
use cim_model::{
    Action, BlockingEffectApi, CancelReason, ConnectOptions, Dispatch, EffectApi, EffectError,
    EffectTasks, Model, ModelError, ModelOptions, TakePolicy, Value,
};
use common::{eventually, TestStore};
use mockall::mock;
use mockall::predicate::function;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Sink {}

    impl Dispatch for Sink {
        fn dispatch(&self, action: Action);
    }
}

fn todos() -> Model {
    ModelOptions::new("todos")
        .state(json!({"items": []}))
        .reducer("add", |draft, payload| {
            draft.child("items").push(payload.get("text").cloned().unwrap_or_default());
        })
        .effect("fetch", |payload: Value, api, actions| async move {
            let text = payload.get("text").cloned().unwrap_or(Value::from("fetched"));
            api.put(actions.create("add", json!({ "text": text }))?);
            let count = api
                .select_namespace()
                .get("items")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or_default();
            Ok(Value::from(count))
        })
        .effect("explode", |_, _, _| async { Err(anyhow::anyhow!("remote unavailable")) })
        .effect("search", |payload: Value, api, _| async move {
            let wait = payload.get("wait").and_then(Value::as_i64).unwrap_or(0);
            api.delay(Duration::from_millis(wait as u64)).await;
            Ok(payload.get("query").cloned().unwrap_or_default())
        })
        .blocking_effect("search", TakePolicy::Latest)
        .build()
        .unwrap()
}

/// `jobs.run` waits `wait` ms, records `n` and returns it, or fails when `fail` is set
fn jobs(finished: Arc<Mutex<Vec<Value>>>) -> ModelOptions {
    ModelOptions::new("jobs").effect("run", move |payload: Value, api: EffectApi, _| {
        let finished = Arc::clone(&finished);
        async move {
            let wait = payload.get("wait").and_then(Value::as_i64).unwrap_or(0);
            api.delay(Duration::from_millis(wait as u64)).await;
            if payload.get("fail").is_some() {
                return Err(anyhow::anyhow!("job failed"));
            }
            let n = payload.get("n").cloned().unwrap_or_default();
            finished.lock().push(n.clone());
            Ok(n)
        }
    })
}

fn cancel_reason(outcome: Result<Value, EffectError>) -> Option<CancelReason> {
    match outcome.err()?.model_error() {
        Some(ModelError::CancelledEffect { reason, .. }) => Some(*reason),
        _ => None,
    }
}

#[tokio::test]
async fn effect_completion_carries_the_return_value() {
    let model = todos();
    let store = TestStore::new(&[model.clone()]);
    let supervisor = store.start_effects(&[model.clone()]);
    let bound = bind_action_creators(&model.action_creators(), store.dispatcher());

    let count = bound.call("fetch", json!({"text": "milk"})).unwrap().await.unwrap();

    assert_eq!(count, Value::from(1));
    assert_eq!(
        store.snapshot().get_dotted("todos.items").unwrap().to_json(),
        json!(["milk"])
    );
    assert_eq!(store.dispatched(), vec!["todos.fetch", "todos.add"]);
    supervisor.abort();
}

#[tokio::test]
async fn effect_failure_rejects_and_watcher_restarts() {
    let model = todos();
    let store = TestStore::new(&[model.clone()]);
    let supervisor = store.start_effects(&[model.clone()]);
    let bound = bind_action_creators(&model.action_creators(), store.dispatcher());

    let err = bound.call("explode", Value::Null).unwrap().await.unwrap_err();
    assert_eq!(err.to_string(), "remote unavailable");

    assert!(eventually(|| supervisor.restart_count() == 1).await);
    let err = bound.call("explode", Value::Null).unwrap().await.unwrap_err();
    assert_eq!(err.to_string(), "remote unavailable");
    supervisor.abort();
}

#[tokio::test(start_paused = true)]
async fn take_latest_cancels_the_superseded_trigger() {
    let model = todos();
    let store = TestStore::new(&[model.clone()]);
    let supervisor = store.start_effects(&[model.clone()]);
    let bound = bind_action_creators(&model.action_creators(), store.dispatcher());

    let first = bound
        .call("search", json!({"query": "ru", "wait": 50}))
        .unwrap();
    tokio::task::yield_now().await;
    let second = bound
        .call("search", json!({"query": "rust", "wait": 50}))
        .unwrap();

    let err = first.await.unwrap_err();
    assert_eq!(
        err.model_error(),
        Some(&ModelError::CancelledEffect {
            action_type: "todos.search".into(),
            reason: CancelReason::Superseded,
        })
    );
    assert_eq!(second.await.unwrap(), Value::from("rust"));
    supervisor.abort();
}

#[tokio::test]
async fn stopping_the_supervisor_abandons_pending_completions() {
    let model = ModelOptions::new("slow")
        .effect("wait", |_, api: cim_model::EffectApi, _| async move {
            api.delay(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        })
        .build()
        .unwrap();
    let store = TestStore::new(&[model.clone()]);
    let supervisor = store.start_effects(&[model.clone()]);
    let bound = bind_action_creators(&model.action_creators(), store.dispatcher());

    let pending = bound.call("wait", Value::Null).unwrap();
    tokio::task::yield_now().await;
    supervisor.abort();

    let err = pending.await.unwrap_err();
    assert!(matches!(
        err.model_error(),
        Some(ModelError::CancelledEffect {
            reason: CancelReason::Abandoned,
            ..
        })
    ));
}

#[test]
fn bound_reducer_creator_dispatches_once() {
    let model = todos();
    model.mark_store_initialized();

    let mut sink = MockSink::new();
    sink.expect_dispatch()
        .with(function(|action: &Action| {
            action.action_type == "todos.add" && action.field("text") == Some(&Value::from("eggs"))
        }))
        .times(1)
        .return_const(());

    let bound = bind_action_creators(&model.action_creators(), Arc::new(sink));
    let completion = bound.call("add", json!({"text": "eggs"})).unwrap();
    assert_eq!(tokio_test::block_on(completion).unwrap(), Value::Null);
}

#[test]
fn unregistered_effect_creator_fails_before_dispatching() {
    let model = todos();
    model.mark_store_initialized();

    let mut sink = MockSink::new();
    sink.expect_dispatch().never();

    let bound = bind_action_creators(&model.action_creators(), Arc::new(sink));
    assert_eq!(
        bound.call("fetch", Value::Null).unwrap_err(),
        ModelError::NotSchedulerInitialized {
            namespace: "todos".into()
        }
    );
}

#[tokio::test]
async fn connector_dispatch_props_reach_effects() {
    let model = todos();
    let store = TestStore::new(&[model.clone()]);
    let supervisor = store.start_effects(&[model.clone()]);
    let connector = cim_model::connect_to_store(
        &[model],
        ConnectOptions::new().map_dispatch(|tree, _| {
            let mut props = cim_model::Props::new();
            if let Some(fetch) = tree.get("todos", "fetch")? {
                props.insert("fetch".into(), fetch.clone().into());
            }
            Ok(props)
        }),
    )
    .unwrap();

    let props = connector
        .props(&store.snapshot(), store.dispatcher(), cim_model::Props::new())
        .unwrap();
    let fetch = props["fetch"].as_action().unwrap();
    assert_eq!(fetch.call(Value::Null).unwrap().await.unwrap(), Value::from(1));
    supervisor.abort();
}

#[tokio::test(start_paused = true)]
async fn failed_trigger_leaves_sibling_triggers_running() {
    let finished = Arc::new(Mutex::new(Vec::new()));
    let model = jobs(Arc::clone(&finished)).build().unwrap();
    let store = TestStore::new(&[model.clone()]);
    let supervisor = store.start_effects(&[model.clone()]);
    let bound = bind_action_creators(&model.action_creators(), store.dispatcher());

    let slow = bound.call("run", json!({"n": 1, "wait": 50})).unwrap();
    tokio::task::yield_now().await;
    let failing = bound.call("run", json!({"fail": true, "wait": 5})).unwrap();

    assert_eq!(failing.await.unwrap_err().to_string(), "job failed");
    assert_eq!(slow.await.unwrap(), Value::from(1));
    assert!(eventually(|| supervisor.restart_count() == 1).await);
    assert_eq!(*finished.lock(), vec![Value::from(1)]);

    let again = bound.call("run", json!({"n": 2})).unwrap();
    assert_eq!(again.await.unwrap(), Value::from(2));
    supervisor.abort();
}

#[tokio::test(start_paused = true)]
async fn custom_blocking_loop_runs_triggers_one_at_a_time() {
    let finished = Arc::new(Mutex::new(Vec::new()));
    let model = jobs(Arc::clone(&finished))
        .blocking_effect_fn(
            "run",
            |action_type: String, mut api: BlockingEffectApi, effects: EffectTasks| async move {
                let task = effects.get("run")?.clone();
                while let Some(action) = api.take(&action_type).await {
                    task.run(action).await?;
                }
                Ok(())
            },
        )
        .build()
        .unwrap();
    let store = TestStore::new(&[model.clone()]);
    let supervisor = store.start_effects(&[model.clone()]);
    let bound = bind_action_creators(&model.action_creators(), store.dispatcher());

    let first = bound.call("run", json!({"n": 1, "wait": 50})).unwrap();
    let second = bound.call("run", json!({"n": 2, "wait": 5})).unwrap();

    assert_eq!(second.await.unwrap(), Value::from(2));
    assert_eq!(first.await.unwrap(), Value::from(1));
    assert_eq!(*finished.lock(), vec![Value::from(1), Value::from(2)]);
    supervisor.abort();
}

#[tokio::test(start_paused = true)]
async fn debounce_and_throttle_settle_every_trigger() {
    let model = ModelOptions::new("search")
        .effect("query", |payload: Value, _, _| async move {
            Ok(payload.get("q").cloned().unwrap_or_default())
        })
        .effect("save", |payload: Value, _, _| async move {
            Ok(payload.get("q").cloned().unwrap_or_default())
        })
        .blocking_effect("query", TakePolicy::Debounce(Duration::from_millis(100)))
        .blocking_effect("save", TakePolicy::Throttle(Duration::from_millis(100)))
        .build()
        .unwrap();
    let store = TestStore::new(&[model.clone()]);
    let supervisor = store.start_effects(&[model.clone()]);
    let bound = bind_action_creators(&model.action_creators(), store.dispatcher());

    let typed = bound.call("query", json!({"q": "ru"})).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let settled = bound.call("query", json!({"q": "rust"})).unwrap();
    assert_eq!(cancel_reason(typed.await), Some(CancelReason::Debounced));
    assert_eq!(settled.await.unwrap(), Value::from("rust"));

    let first = bound.call("save", json!({"q": 1})).unwrap();
    let skipped = bound.call("save", json!({"q": 2})).unwrap();
    let last = bound.call("save", json!({"q": 3})).unwrap();
    assert_eq!(first.await.unwrap(), Value::from(1));
    assert_eq!(cancel_reason(skipped.await), Some(CancelReason::Throttled));
    assert_eq!(last.await.unwrap(), Value::from(3));
    supervisor.abort();
}
