// Copyright 2025 Cowboy AI, LLC.

//! Capability-restricted scheduler APIs

use super::bridge::EffectTask;
use super::capability::{
    lookup_capability, Capability, BLOCKING_EFFECT_CAPABILITIES, EFFECT_CAPABILITIES,
};
use super::policy::{self, Survivors, TakePolicy};
use super::EffectEnv;
use crate::action::Action;
use crate::config::RuntimeConfig;
use crate::errors::{EffectError, ModelResult};
use crate::saga::ActionStream;
use crate::state::Value;
use futures::future::{self, Either};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Scheduler API handed to effects: may read and change state
#[derive(Clone)]
pub struct EffectApi {
    namespace: String,
    env: EffectEnv,
}

impl EffectApi {
    pub(crate) fn new(namespace: impl Into<String>, env: EffectEnv) -> Self {
        Self {
            namespace: namespace.into(),
            env,
        }
    }

    /// Namespace of the model that owns the running effect
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolve a capability by name; fails for names outside the effect set
    pub fn capability(&self, name: &str) -> ModelResult<Capability> {
        lookup_capability(EFFECT_CAPABILITIES, "effects", name)
    }

    /// Dispatch an action to the store
    pub fn put(&self, action: Action) {
        debug!(
            namespace = %self.namespace,
            action_type = %action.action_type,
            "effect put"
        );
        self.env.dispatch.dispatch(action);
    }

    /// Entire store state
    pub fn select(&self) -> Value {
        self.env.state.state()
    }

    /// State of the owning model's namespace
    pub fn select_namespace(&self) -> Value {
        self.select()
            .get_dotted(&self.namespace)
            .cloned()
            .unwrap_or_default()
    }

    /// Project the entire store state through `selector`
    pub fn select_with<T, F>(&self, selector: F) -> T
    where
        F: FnOnce(&Value) -> T,
    {
        selector(&self.select())
    }

    /// Await a future
    pub async fn call<F: Future>(&self, future: F) -> F::Output {
        future.await
    }

    /// Sleep for `duration`
    pub async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Run a task alongside the effect; the handle can be joined or cancelled
    pub fn fork<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(future)
    }

    /// Run a detached task whose failure is only logged
    pub fn spawn<F, T, E>(&self, future: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display,
    {
        spawn_detached(self.namespace.clone(), future);
    }

    /// Await every future; the first failure wins
    pub async fn all<I, F, T, E>(&self, futures: I) -> Result<Vec<T>, E>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T, E>>,
    {
        future::try_join_all(futures).await
    }

    /// First of two futures to finish; the loser is dropped
    pub async fn race<A, B>(&self, left: A, right: B) -> Either<A::Output, B::Output>
    where
        A: Future,
        B: Future,
    {
        race(left, right).await
    }

    /// Abort a forked task
    pub fn cancel<T>(&self, handle: &JoinHandle<T>) {
        handle.abort();
    }
}

impl fmt::Debug for EffectApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectApi")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Scheduler API handed to blocking effects: consumes the action stream
pub struct BlockingEffectApi {
    namespace: String,
    actions: ActionStream,
    env: EffectEnv,
    survivors: Survivors,
}

impl BlockingEffectApi {
    pub(crate) fn new(
        namespace: impl Into<String>,
        actions: ActionStream,
        env: EffectEnv,
        survivors: Survivors,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            actions,
            env,
            survivors,
        }
    }

    /// Namespace of the model that owns the watcher
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolve a capability by name; fails for names outside the blocking set
    pub fn capability(&self, name: &str) -> ModelResult<Capability> {
        lookup_capability(BLOCKING_EFFECT_CAPABILITIES, "blocking effects", name)
    }

    /// Wait for the next action of `action_type`; `None` once the stream ends
    pub async fn take(&mut self, action_type: &str) -> Option<Action> {
        self.actions.next_matching(action_type).await
    }

    /// Run `task` for every action of `action_type`
    pub async fn take_every(
        &mut self,
        action_type: &str,
        task: EffectTask,
    ) -> Result<(), EffectError> {
        policy::take_every(&mut self.actions, action_type, task, &self.survivors).await
    }

    /// Run `task` for the newest action, cancelling the one in flight
    pub async fn take_latest(
        &mut self,
        action_type: &str,
        task: EffectTask,
    ) -> Result<(), EffectError> {
        policy::take_latest(&mut self.actions, action_type, task, &self.survivors).await
    }

    /// Run `task` unless an earlier instance is still running
    pub async fn take_leading(
        &mut self,
        action_type: &str,
        task: EffectTask,
    ) -> Result<(), EffectError> {
        policy::take_leading(&mut self.actions, action_type, task, &self.survivors).await
    }

    /// Run `task` once `window` passes without a new action
    pub async fn debounce(
        &mut self,
        window: Duration,
        action_type: &str,
        task: EffectTask,
    ) -> Result<(), EffectError> {
        policy::debounce(&mut self.actions, action_type, window, task, &self.survivors).await
    }

    /// Run `task` at most once per `window`, keeping the newest action in between
    pub async fn throttle(
        &mut self,
        window: Duration,
        action_type: &str,
        task: EffectTask,
    ) -> Result<(), EffectError> {
        policy::throttle(&mut self.actions, action_type, window, task, &self.survivors).await
    }

    /// Run `task` under `policy`
    pub async fn run_policy(
        &mut self,
        policy: TakePolicy,
        action_type: &str,
        task: EffectTask,
    ) -> Result<(), EffectError> {
        match policy {
            TakePolicy::Every => self.take_every(action_type, task).await,
            TakePolicy::Latest => self.take_latest(action_type, task).await,
            TakePolicy::Leading => self.take_leading(action_type, task).await,
            TakePolicy::Debounce(window) => self.debounce(window, action_type, task).await,
            TakePolicy::Throttle(window) => self.throttle(window, action_type, task).await,
        }
    }

    /// Await a future
    pub async fn call<F: Future>(&self, future: F) -> F::Output {
        future.await
    }

    /// Sleep for `duration`
    pub async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Run a task alongside the watcher
    pub fn fork<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tokio::spawn(future)
    }

    /// Run a detached task whose failure is only logged
    pub fn spawn<F, T, E>(&self, future: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display,
    {
        spawn_detached(self.namespace.clone(), future);
    }

    /// Await every future; the first failure wins
    pub async fn all<I, F, T, E>(&self, futures: I) -> Result<Vec<T>, E>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T, E>>,
    {
        future::try_join_all(futures).await
    }

    /// First of two futures to finish; the loser is dropped
    pub async fn race<A, B>(&self, left: A, right: B) -> Either<A::Output, B::Output>
    where
        A: Future,
        B: Future,
    {
        race(left, right).await
    }

    /// Abort a forked task
    pub fn cancel<T>(&self, handle: &JoinHandle<T>) {
        handle.abort();
    }

    /// Runtime configuration of the owning runtime
    pub fn config(&self) -> &RuntimeConfig {
        &self.env.config
    }
}

impl fmt::Debug for BlockingEffectApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingEffectApi")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

fn spawn_detached<F, T, E>(namespace: String, future: F)
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    E: fmt::Display,
{
    tokio::spawn(async move {
        if let Err(err) = future.await {
            warn!(namespace = %namespace, error = %err, "detached effect task failed");
        }
    });
}

async fn race<A, B>(left: A, right: B) -> Either<A::Output, B::Output>
where
    A: Future,
    B: Future,
{
    futures::pin_mut!(left);
    futures::pin_mut!(right);
    match future::select(left, right).await {
        Either::Left((value, _)) => Either::Left(value),
        Either::Right((value, _)) => Either::Right(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ModelError;
    use crate::saga::ActionBus;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn env(log: Arc<Mutex<Vec<Action>>>) -> EffectEnv {
        let sink = move |action: Action| log.lock().push(action);
        let state = || Value::from(json!({"app": {"todos": {"count": 2}}}));
        EffectEnv::new(Arc::new(sink), Arc::new(state), RuntimeConfig::default())
    }

    #[tokio::test]
    async fn test_effect_api_puts_and_selects() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let api = EffectApi::new("app.todos", env(Arc::clone(&log)));

        api.put(Action::new("app.todos.add", Value::Null).unwrap());
        assert_eq!(log.lock().len(), 1);
        assert_eq!(api.select_namespace().get("count"), Some(&Value::from(2)));
        assert_eq!(
            api.select_with(|state| state.get_dotted("app.todos.count").cloned()),
            Some(Value::from(2))
        );
    }

    #[tokio::test]
    async fn test_effect_api_rejects_take_family() {
        let api = EffectApi::new("todos", env(Arc::new(Mutex::new(Vec::new()))));
        assert!(matches!(
            api.capability("take"),
            Err(ModelError::UndefinedEffectCapability { .. })
        ));
        assert_eq!(api.capability("put").unwrap(), Capability::Put);
    }

    #[tokio::test]
    async fn test_blocking_api_rejects_put() {
        let bus = ActionBus::new(4);
        let api = BlockingEffectApi::new(
            "todos",
            bus.subscribe(),
            env(Arc::new(Mutex::new(Vec::new()))),
            Survivors::default(),
        );
        assert!(api.capability("put").is_err());
        assert!(api.capability("select").is_err());
        assert_eq!(api.capability("take_latest").unwrap(), Capability::TakeLatest);
    }

    #[tokio::test]
    async fn test_race_and_all() {
        let api = EffectApi::new("todos", env(Arc::new(Mutex::new(Vec::new()))));
        let winner = api
            .race(async { 1 }, async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                2
            })
            .await;
        assert!(matches!(winner, Either::Left(1)));

        let results: Result<Vec<i32>, String> = api
            .all(vec![future::ready(Ok(1)), future::ready(Ok(2))])
            .await;
        assert_eq!(results.unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fork_and_cancel() {
        let api = EffectApi::new("todos", env(Arc::new(Mutex::new(Vec::new()))));
        let handle = api.fork(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        api.cancel(&handle);
        assert!(handle.await.unwrap_err().is_cancelled());
    }
}
