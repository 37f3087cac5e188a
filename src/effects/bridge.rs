// Copyright 2025 Cowboy AI, LLC.

//! Effect completion bridge
//!
//! Wraps an effect body so that its outcome settles the completion carried by
//! the triggering action: the return value resolves it, a failure rejects it
//! and is then propagated to the watcher.

use super::api::EffectApi;
use super::{EffectEnv, EffectHandler};
use crate::action::Action;
use crate::errors::{EffectError, ModelError, ModelResult};
use crate::model::ActionCreators;
use crate::name_check::{wrap_with_name_check, LookupKind};
use crate::state::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// An effect body not yet bound to a runtime
#[derive(Clone)]
pub struct EffectBody {
    pub(crate) namespace: String,
    pub(crate) name: String,
    pub(crate) action_type: String,
    pub(crate) handler: Arc<dyn EffectHandler>,
    pub(crate) actions: ActionCreators,
}

impl EffectBody {
    /// Declared effect name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Action type that triggers the effect
    pub fn action_type(&self) -> &str {
        &self.action_type
    }
}

impl fmt::Debug for EffectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectBody")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("action_type", &self.action_type)
            .finish_non_exhaustive()
    }
}

/// An effect body bound to a runtime, runnable once per triggering action
#[derive(Clone)]
pub struct EffectTask {
    body: EffectBody,
    env: EffectEnv,
}

/// Bind `body` to `env`
pub fn wrap_effect(body: EffectBody, env: EffectEnv) -> EffectTask {
    EffectTask { body, env }
}

impl EffectTask {
    /// Declared effect name
    pub fn name(&self) -> &str {
        &self.body.name
    }

    /// Action type that triggers the effect
    pub fn action_type(&self) -> &str {
        &self.body.action_type
    }

    /// Run the effect for `action` and settle its completion.
    ///
    /// Actions without internals are rejected with
    /// [`ModelError::NonCompatibleAction`] before the body runs.
    pub async fn run(&self, action: Action) -> Result<Value, EffectError> {
        let internals = match action.internals {
            Some(internals) if !internals.is_empty() => internals,
            _ => {
                return Err(ModelError::NonCompatibleAction {
                    action_type: action.action_type,
                }
                .into())
            }
        };

        trace!(
            namespace = %self.body.namespace,
            effect = %self.body.name,
            "running effect"
        );
        let api = EffectApi::new(self.body.namespace.clone(), self.env.clone());
        match self
            .body
            .handler
            .run(action.payload, api, self.body.actions.clone())
            .await
        {
            Ok(value) => {
                internals.resolve(value.clone());
                Ok(value)
            }
            Err(err) => {
                let err = EffectError::from(err);
                debug!(
                    namespace = %self.body.namespace,
                    effect = %self.body.name,
                    error = %err,
                    "effect failed"
                );
                internals.reject(err.clone());
                Err(err)
            }
        }
    }
}

impl fmt::Debug for EffectTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectTask")
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// A model's effects bound to a runtime, keyed by declared name
#[derive(Clone, Debug)]
pub struct EffectTasks {
    namespace: String,
    tasks: Arc<IndexMap<String, EffectTask>>,
}

impl EffectTasks {
    pub(crate) fn bind(
        namespace: &str,
        bodies: &IndexMap<String, EffectBody>,
        env: &EffectEnv,
    ) -> Self {
        let tasks = bodies
            .iter()
            .map(|(name, body)| (name.clone(), wrap_effect(body.clone(), env.clone())))
            .collect();
        Self {
            namespace: namespace.to_string(),
            tasks: Arc::new(tasks),
        }
    }

    /// Task for the effect declared as `name`
    pub fn get(&self, name: &str) -> ModelResult<&EffectTask> {
        wrap_with_name_check(
            &self.tasks,
            LookupKind::ReducerOrEffect,
            &self.namespace,
            true,
        )
        .require(name)
    }

    /// Task triggered by `action_type`
    pub fn for_action_type(&self, action_type: &str) -> Option<&EffectTask> {
        self.tasks
            .values()
            .find(|task| task.action_type() == action_type)
    }

    /// Declared effect names
    pub fn names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }
}
