// Copyright 2025 Cowboy AI, LLC.

//! Effects and blocking effects
//!
//! An effect is an async function triggered by its action type. It receives
//! the payload, an [`EffectApi`] restricted to the effect capability set and
//! the model's action creators. A blocking effect replaces the default
//! every-action watcher of an effect with its own loop over the action stream,
//! using [`BlockingEffectApi`] and the model's [`EffectTasks`].

mod api;
mod bridge;
mod capability;
mod policy;

pub use api::{BlockingEffectApi, EffectApi};
pub use bridge::{wrap_effect, EffectBody, EffectTask, EffectTasks};
pub use capability::{Capability, BLOCKING_EFFECT_CAPABILITIES, EFFECT_CAPABILITIES};
pub use policy::{
    debounce, take_every, take_latest, take_leading, throttle, Survivors, TakePolicy,
};

use crate::config::RuntimeConfig;
use crate::dispatch::{Dispatch, StateSource};
use crate::errors::EffectError;
use crate::model::ActionCreators;
use crate::state::Value;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Body of an effect
#[async_trait]
pub trait EffectHandler: Send + Sync + 'static {
    /// Run once for a triggering action's payload
    async fn run(
        &self,
        payload: Value,
        api: EffectApi,
        actions: ActionCreators,
    ) -> anyhow::Result<Value>;
}

#[async_trait]
impl<F, Fut> EffectHandler for F
where
    F: Fn(Value, EffectApi, ActionCreators) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    async fn run(
        &self,
        payload: Value,
        api: EffectApi,
        actions: ActionCreators,
    ) -> anyhow::Result<Value> {
        self(payload, api, actions).await
    }
}

/// Custom watcher loop replacing an effect's default `take_every`
#[async_trait]
pub trait BlockingEffectHandler: Send + Sync + 'static {
    /// Watch `action_type` until the stream ends; an `Err` crashes the watcher
    async fn run(
        &self,
        action_type: String,
        api: BlockingEffectApi,
        effects: EffectTasks,
    ) -> Result<(), EffectError>;
}

#[async_trait]
impl<F, Fut> BlockingEffectHandler for F
where
    F: Fn(String, BlockingEffectApi, EffectTasks) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EffectError>> + Send + 'static,
{
    async fn run(
        &self,
        action_type: String,
        api: BlockingEffectApi,
        effects: EffectTasks,
    ) -> Result<(), EffectError> {
        self(action_type, api, effects).await
    }
}

/// What a running effect talks to: the store and the runtime configuration
#[derive(Clone)]
pub struct EffectEnv {
    /// Sink for `put`
    pub dispatch: Arc<dyn Dispatch>,
    /// Source for `select`
    pub state: Arc<dyn StateSource>,
    /// Runtime configuration
    pub config: RuntimeConfig,
}

impl EffectEnv {
    /// Environment over a dispatcher and a state source
    pub fn new(
        dispatch: Arc<dyn Dispatch>,
        state: Arc<dyn StateSource>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            dispatch,
            state,
            config,
        }
    }
}

impl fmt::Debug for EffectEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectEnv")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
