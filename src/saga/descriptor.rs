// Copyright 2025 Cowboy AI, LLC.

//! Scheduler-ready effect watchers

use super::bus::ActionStream;
use crate::effects::{
    take_every, BlockingEffectApi, BlockingEffectHandler, EffectBody, EffectEnv, EffectTasks,
    Survivors,
};
use crate::errors::EffectError;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// How an effect's triggers are consumed
#[derive(Clone)]
pub enum Watcher {
    /// Run every matching action concurrently
    Every,
    /// A blocking-effect override owns the loop
    Blocking(Arc<dyn BlockingEffectHandler>),
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Watcher::Every => f.write_str("Watcher::Every"),
            Watcher::Blocking(_) => f.write_str("Watcher::Blocking"),
        }
    }
}

/// One effect watcher, not yet bound to a runtime
#[derive(Clone, Debug)]
pub struct EffectDescriptor {
    namespace: String,
    name: String,
    action_type: String,
    watcher: Watcher,
    bodies: Arc<IndexMap<String, EffectBody>>,
}

impl EffectDescriptor {
    pub(crate) fn new(
        namespace: &str,
        name: &str,
        action_type: String,
        watcher: Watcher,
        bodies: Arc<IndexMap<String, EffectBody>>,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            action_type,
            watcher,
            bodies,
        }
    }

    /// Namespace of the owning model
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Declared effect name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Action type the watcher reacts to
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// True when a blocking effect overrides the default watcher
    pub fn is_blocking(&self) -> bool {
        matches!(self.watcher, Watcher::Blocking(_))
    }

    /// Watcher loop over `actions`, bound to `env`.
    ///
    /// Resolves when the stream ends; an `Err` means the watcher crashed.
    /// Tasks still running when it crashes move to `survivors`.
    pub fn run(
        &self,
        actions: ActionStream,
        env: &EffectEnv,
        survivors: &Survivors,
    ) -> BoxFuture<'static, Result<(), EffectError>> {
        let tasks = EffectTasks::bind(&self.namespace, &self.bodies, env);
        let action_type = self.action_type.clone();
        let survivors = survivors.clone();
        match &self.watcher {
            Watcher::Every => {
                let name = self.name.clone();
                async move {
                    let task = tasks.get(&name)?.clone();
                    let mut actions = actions;
                    take_every(&mut actions, &action_type, task, &survivors).await
                }
                .boxed()
            }
            Watcher::Blocking(handler) => {
                let handler = Arc::clone(handler);
                let api = BlockingEffectApi::new(
                    self.namespace.clone(),
                    actions,
                    env.clone(),
                    survivors,
                );
                async move { handler.run(action_type, api, tasks).await }.boxed()
            }
        }
    }
}
