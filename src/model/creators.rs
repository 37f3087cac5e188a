// Copyright 2025 Cowboy AI, LLC.

//! Action creators derived from a model's reducer and effect names

use super::ModelFlags;
use crate::action::{build_action, Action, Internals};
use crate::config::ModelSettings;
use crate::errors::{ModelError, ModelResult};
use crate::name_check::{wrap_with_name_check, LookupKind};
use crate::state::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Builds actions of one type
#[derive(Clone)]
pub struct ActionCreator {
    namespace: String,
    name: String,
    action_type: String,
    is_effect: bool,
    flags: Arc<ModelFlags>,
    settings: ModelSettings,
}

impl ActionCreator {
    pub(crate) fn new(
        namespace: &str,
        name: &str,
        action_type: String,
        is_effect: bool,
        flags: Arc<ModelFlags>,
        settings: ModelSettings,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            action_type,
            is_effect,
            flags,
            settings,
        }
    }

    /// Declared reducer or effect name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fully-qualified action type
    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// True when the action triggers an effect
    pub fn is_effect(&self) -> bool {
        self.is_effect
    }

    /// Build an action with optional completion internals.
    ///
    /// Fails when the owning model was not registered with a store, or, for
    /// effects, with the root supervisor.
    pub fn create(
        &self,
        payload: impl Into<Value>,
        internals: Option<Internals>,
    ) -> ModelResult<Action> {
        self.check_initialized()?;
        build_action(self.action_type.clone(), payload.into(), internals)
    }

    fn check_initialized(&self) -> ModelResult<()> {
        if !self.settings.check_initialization {
            return Ok(());
        }
        if !self.flags.is_store_initialized() {
            return Err(ModelError::NotStoreInitialized {
                namespace: self.namespace.clone(),
            });
        }
        if self.is_effect && !self.flags.is_scheduler_initialized() {
            return Err(ModelError::NotSchedulerInitialized {
                namespace: self.namespace.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCreator")
            .field("action_type", &self.action_type)
            .field("is_effect", &self.is_effect)
            .finish()
    }
}

/// A model's action creators keyed by local name
#[derive(Clone, Debug)]
pub struct ActionCreators {
    namespace: String,
    creators: Arc<IndexMap<String, ActionCreator>>,
}

impl ActionCreators {
    pub(crate) fn new(namespace: &str, creators: IndexMap<String, ActionCreator>) -> Self {
        Self {
            namespace: namespace.to_string(),
            creators: Arc::new(creators),
        }
    }

    /// Namespace of the owning model
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Creator for `name`; unknown names always fail
    pub fn get(&self, name: &str) -> ModelResult<&ActionCreator> {
        wrap_with_name_check(
            &self.creators,
            LookupKind::ReducerOrEffect,
            &self.namespace,
            true,
        )
        .require(name)
    }

    /// Build a raw action for `name`
    pub fn create(&self, name: &str, payload: impl Into<Value>) -> ModelResult<Action> {
        self.get(name)?.create(payload, None)
    }

    /// True if `name` has a creator
    pub fn contains(&self, name: &str) -> bool {
        self.creators.contains_key(name)
    }

    /// Local names with creators, in declaration order
    pub fn names(&self) -> Vec<String> {
        self.creators.keys().cloned().collect()
    }

    /// Number of creators
    pub fn len(&self) -> usize {
        self.creators.len()
    }

    /// True when the model declares no local reducers or effects
    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    /// Creators in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ActionCreator)> {
        self.creators.iter()
    }
}
