// Copyright 2025 Cowboy AI, LLC.

//! Nested reducer tree over dotted namespaces

use crate::action::Action;
use crate::errors::{ModelError, ModelResult};
use crate::model::{Model, ReducerFunction};
use crate::state::{Map, Value};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

enum Node {
    Leaf { reducer: ReducerFunction, initial: Value },
    Branch(IndexMap<String, Node>),
}

impl Node {
    fn reduce(&self, state: Option<&Value>, action: &Action) -> Value {
        match self {
            Node::Leaf { reducer, initial } => reducer(state.unwrap_or(initial), action),
            Node::Branch(children) => {
                let previous = state.filter(|s| s.is_object());
                let mut changed = previous.is_none();
                let mut next = Map::with_capacity(children.len());
                for (key, child) in children {
                    let before = previous.and_then(|p| p.get(key));
                    let after = child.reduce(before, action);
                    changed |= before.map_or(true, |b| !after.ptr_eq(b));
                    next.insert(key.clone(), after);
                }
                let same_keys =
                    previous.and_then(Value::as_object).map(Map::len) == Some(next.len());
                match previous {
                    Some(prev) if !changed && same_keys => prev.clone(),
                    _ => Value::from(next),
                }
            }
        }
    }

    fn initial_state(&self) -> Value {
        match self {
            Node::Leaf { initial, .. } => initial.clone(),
            Node::Branch(children) => children
                .iter()
                .map(|(key, child)| (key.clone(), child.initial_state()))
                .collect::<Map>()
                .into(),
        }
    }

    fn insert(&mut self, path: &[&str], model: &Model) {
        let Node::Branch(children) = self else {
            return;
        };
        match path {
            [] => {}
            [leaf] => {
                children.insert(
                    leaf.to_string(),
                    Node::Leaf {
                        reducer: model.reducer_function(),
                        initial: model.state().clone(),
                    },
                );
            }
            [head, rest @ ..] => children
                .entry(head.to_string())
                .or_insert_with(|| Node::Branch(IndexMap::new()))
                .insert(rest, model),
        }
    }
}

/// The store's root reducer, combining every model at its namespace path
#[derive(Clone)]
pub struct CombinedReducer {
    root: Arc<Node>,
    namespaces: Vec<String>,
}

/// Combine `models` into one reducer tree and mark them store-initialized.
///
/// `app.todos` and `app.users` become siblings under `app`. Fails when two
/// models share a namespace, or when one namespace is a prefix of another.
pub fn combine_reducers(models: &[Model]) -> ModelResult<CombinedReducer> {
    let namespaces = validate_namespaces(models)?;

    let mut root = Node::Branch(IndexMap::new());
    for model in models {
        model.mark_store_initialized();
        let path: Vec<&str> = model.namespace().split('.').collect();
        root.insert(&path, model);
    }

    debug!(namespaces = ?namespaces, "reducers combined");
    Ok(CombinedReducer {
        root: Arc::new(root),
        namespaces,
    })
}

/// Namespaces of `models` in order, rejecting duplicates and leaf/parent clashes
pub(crate) fn validate_namespaces(models: &[Model]) -> ModelResult<Vec<String>> {
    let namespaces: Vec<String> = models.iter().map(|m| m.namespace().to_string()).collect();

    let mut seen = HashSet::new();
    if !namespaces.iter().all(|ns| seen.insert(ns.as_str())) {
        return Err(ModelError::DuplicateNamespace { namespaces });
    }

    for namespace in &namespaces {
        let prefix = format!("{namespace}.");
        if let Some(nested) = namespaces.iter().find(|other| other.starts_with(&prefix)) {
            return Err(ModelError::NamespaceConflict {
                namespace: namespace.clone(),
                nested: nested.clone(),
            });
        }
    }
    Ok(namespaces)
}

impl CombinedReducer {
    /// Apply `action` to the entire state
    pub fn reduce(&self, state: &Value, action: &Action) -> Value {
        self.root.reduce(Some(state), action)
    }

    /// State made of every model's initial state
    pub fn initial_state(&self) -> Value {
        self.root.initial_state()
    }

    /// Combined namespaces in the order given
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// The reducer as a plain function
    pub fn into_fn(self) -> Arc<dyn Fn(&Value, &Action) -> Value + Send + Sync> {
        Arc::new(move |state: &Value, action: &Action| self.reduce(state, action))
    }
}

impl fmt::Debug for CombinedReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedReducer")
            .field("namespaces", &self.namespaces)
            .finish()
    }
}
