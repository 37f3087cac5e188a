// Copyright 2025 Cowboy AI, LLC.

//! Action creators bound to a dispatcher

use crate::action::{Completion, Internals};
use crate::dispatch::Dispatch;
use crate::errors::ModelResult;
use crate::model::{ActionCreator, ActionCreators};
use crate::name_check::{wrap_with_name_check, LookupKind};
use crate::state::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// An action creator that dispatches what it creates
#[derive(Clone)]
pub struct BoundActionCreator {
    creator: ActionCreator,
    dispatch: Arc<dyn Dispatch>,
}

impl BoundActionCreator {
    /// Declared name
    pub fn name(&self) -> &str {
        self.creator.name()
    }

    /// Fully-qualified action type
    pub fn action_type(&self) -> &str {
        self.creator.action_type()
    }

    /// True when the action triggers an effect
    pub fn is_effect(&self) -> bool {
        self.creator.is_effect()
    }

    /// Create and dispatch the action.
    ///
    /// For effects the returned completion settles with the effect's outcome;
    /// for reducers it is already resolved.
    pub fn call(&self, payload: impl Into<Value>) -> ModelResult<Completion> {
        if self.creator.is_effect() {
            let (internals, completion) = Internals::pending(self.creator.action_type());
            let action = self.creator.create(payload, Some(internals))?;
            trace!(action_type = %action.action_type, "dispatching effect action");
            self.dispatch.dispatch(action);
            Ok(completion)
        } else {
            let action = self.creator.create(payload, Some(Internals::noop()))?;
            trace!(action_type = %action.action_type, "dispatching reducer action");
            self.dispatch.dispatch(action);
            Ok(Completion::resolved())
        }
    }
}

impl fmt::Debug for BoundActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoundActionCreator")
            .field(&self.creator.action_type())
            .finish()
    }
}

/// A model's bound action creators keyed by local name
#[derive(Clone, Debug)]
pub struct BoundActionCreators {
    namespace: String,
    bound: Arc<IndexMap<String, BoundActionCreator>>,
}

/// Bind every creator in `creators` to `dispatch`
pub fn bind_action_creators(
    creators: &ActionCreators,
    dispatch: Arc<dyn Dispatch>,
) -> BoundActionCreators {
    let bound = creators
        .iter()
        .map(|(name, creator)| {
            let bound = BoundActionCreator {
                creator: creator.clone(),
                dispatch: Arc::clone(&dispatch),
            };
            (name.clone(), bound)
        })
        .collect();
    BoundActionCreators {
        namespace: creators.namespace().to_string(),
        bound: Arc::new(bound),
    }
}

impl BoundActionCreators {
    /// Namespace of the owning model
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Bound creator for `name`; unknown names always fail
    pub fn get(&self, name: &str) -> ModelResult<&BoundActionCreator> {
        self.checked(true).require(name)
    }

    /// Create and dispatch `name`
    pub fn call(&self, name: &str, payload: impl Into<Value>) -> ModelResult<Completion> {
        self.get(name)?.call(payload)
    }

    /// Local names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.bound.keys().cloned().collect()
    }

    /// Bound creators in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BoundActionCreator)> {
        self.bound.iter()
    }

    pub(crate) fn lookup(
        &self,
        name: &str,
        check_names: bool,
    ) -> ModelResult<Option<&BoundActionCreator>> {
        self.checked(check_names).lookup(name)
    }

    fn checked(&self, enabled: bool) -> crate::name_check::NameCheck<'_, BoundActionCreator> {
        wrap_with_name_check(&self.bound, LookupKind::ReducerOrEffect, &self.namespace, enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::config::ModelSettings;
    use crate::errors::ModelError;
    use crate::model::ModelOptions;
    use parking_lot::Mutex;

    #[tokio::test]
    async fn test_reducer_actions_resolve_immediately() {
        let model = ModelOptions::new("todos")
            .reducer("add", |draft, payload| draft.push(payload.clone()))
            .effect("fetch", |_, _, _| async { Ok(Value::Null) })
            .settings(ModelSettings::unchecked())
            .build()
            .unwrap();
        let seen = Arc::new(Mutex::new(Vec::<Action>::new()));
        let sink = Arc::clone(&seen);
        let bound = bind_action_creators(
            &model.action_creators(),
            Arc::new(move |action: Action| sink.lock().push(action)),
        );

        assert_eq!(bound.call("add", Value::Null).unwrap().await.unwrap(), Value::Null);
        let dispatched = seen.lock();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].action_type, "todos.add");
        assert!(dispatched[0].internals.is_some());
    }

    #[tokio::test]
    async fn test_effect_action_carries_pending_internals() {
        let model = ModelOptions::new("todos")
            .effect("fetch", |_, _, _| async { Ok(Value::Null) })
            .settings(ModelSettings::unchecked())
            .build()
            .unwrap();
        let bound = bind_action_creators(
            &model.action_creators(),
            Arc::new(|action: Action| {
                if let Some(internals) = action.internals {
                    internals.resolve(Value::from("done"));
                }
            }),
        );

        let completion = bound.get("fetch").unwrap().call(Value::Null).unwrap();
        assert_eq!(completion.await.unwrap(), Value::from("done"));
    }

    #[test]
    fn test_unknown_name_lists_valid_ones() {
        let model = ModelOptions::new("todos")
            .reducer("add", |_, _| {})
            .settings(ModelSettings::unchecked())
            .build()
            .unwrap();
        let bound = bind_action_creators(&model.action_creators(), Arc::new(|_: Action| {}));
        assert_eq!(
            bound.call("ad", Value::Null).unwrap_err(),
            ModelError::UndefinedReducerOrEffect {
                namespace: "todos".into(),
                name: "ad".into(),
                valid: vec!["add".into()],
            }
        );
        assert!(bound.lookup("ad", false).unwrap().is_none());
    }
}
