// Copyright 2025 Cowboy AI, LLC.

#![allow(dead_code)]

use cim_model::{
    combine_reducers, root_supervisor, Action, ActionBus, CombinedReducer, Dispatch, Model,
    RuntimeConfig, SagaRuntime, StateSource, SupervisorHandle, Value,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Minimal store: reduce, then hand the action to effect watchers
pub struct TestStore {
    reducer: CombinedReducer,
    state: RwLock<Value>,
    bus: ActionBus,
    dispatched: RwLock<Vec<String>>,
}

impl TestStore {
    pub fn new(models: &[Model]) -> Arc<Self> {
        let reducer = combine_reducers(models).expect("models combine");
        let state = reducer.initial_state();
        Arc::new(Self {
            reducer,
            state: RwLock::new(state),
            bus: ActionBus::new(64),
            dispatched: RwLock::new(Vec::new()),
        })
    }

    pub fn snapshot(&self) -> Value {
        self.state.read().clone()
    }

    pub fn dispatched(&self) -> Vec<String> {
        self.dispatched.read().clone()
    }

    pub fn runtime(self: &Arc<Self>, config: RuntimeConfig) -> SagaRuntime {
        SagaRuntime::new(self.bus.clone(), self.clone(), self.clone(), config)
    }

    pub fn start_effects(self: &Arc<Self>, models: &[Model]) -> SupervisorHandle {
        root_supervisor(models, &self.runtime(RuntimeConfig::default()))
    }

    pub fn dispatcher(self: &Arc<Self>) -> Arc<dyn Dispatch> {
        self.clone()
    }
}

impl Dispatch for TestStore {
    fn dispatch(&self, action: Action) {
        {
            let mut state = self.state.write();
            let next = self.reducer.reduce(&state, &action);
            *state = next;
        }
        self.dispatched.write().push(action.action_type.clone());
        self.bus.publish(action);
    }
}

impl StateSource for TestStore {
    fn state(&self) -> Value {
        self.snapshot()
    }
}

/// Yield until `condition` holds or the attempts run out
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::task::yield_now().await;
    }
    condition()
}
