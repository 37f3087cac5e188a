// Copyright 2025 Cowboy AI, LLC.

//! Prop mapping for view bindings
//!
//! A [`Connector`] turns store state and a dispatcher into one prop map. The
//! map-state step sees a [`SelectorTree`], the map-dispatch step a
//! [`DispatcherTree`]; both reject typo'd namespaces, selectors and action
//! names with the list of valid ones unless name checks are disabled.

use super::bind::{bind_action_creators, BoundActionCreator, BoundActionCreators};
use super::combine::validate_namespaces;
use crate::action::Completion;
use crate::config::ModelSettings;
use crate::dispatch::Dispatch;
use crate::errors::{ModelError, ModelResult};
use crate::model::Model;
use crate::name_check::{wrap_with_name_check, LookupKind};
use crate::state::Value;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// A prop handed to a view
#[derive(Clone, Debug)]
pub enum PropValue {
    /// Plain data
    Value(Value),
    /// Callable action
    Action(BoundActionCreator),
}

impl PropValue {
    /// Data, if this prop is not an action
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            PropValue::Value(value) => Some(value),
            PropValue::Action(_) => None,
        }
    }

    /// Action, if this prop is one
    pub fn as_action(&self) -> Option<&BoundActionCreator> {
        match self {
            PropValue::Action(action) => Some(action),
            PropValue::Value(_) => None,
        }
    }
}

impl From<Value> for PropValue {
    fn from(value: Value) -> Self {
        PropValue::Value(value)
    }
}

impl From<BoundActionCreator> for PropValue {
    fn from(action: BoundActionCreator) -> Self {
        PropValue::Action(action)
    }
}

/// Props keyed by name, in insertion order
pub type Props = IndexMap<String, PropValue>;

type MapStateFn = Arc<dyn Fn(&SelectorTree, &Props) -> ModelResult<Props> + Send + Sync>;
type MapDispatchFn = Arc<dyn Fn(&DispatcherTree, &Props) -> ModelResult<Props> + Send + Sync>;
type MergePropsFn = Arc<dyn Fn(Props, Props, Props) -> Props + Send + Sync>;

/// Namespaced selectors over one state snapshot
pub struct SelectorTree {
    models: Arc<IndexMap<String, Model>>,
    state: Value,
    settings: ModelSettings,
}

impl SelectorTree {
    /// Entire state the selectors run against
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Connected namespaces
    pub fn namespaces(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Run selector `name` of `namespace` with `props`.
    ///
    /// With name checks disabled an unknown namespace or selector yields `Null`.
    pub fn select(&self, namespace: &str, name: &str, props: &Value) -> ModelResult<Value> {
        let models = wrap_with_name_check(
            &self.models,
            LookupKind::Namespace,
            "store",
            self.settings.check_names,
        );
        let Some(model) = models.lookup(namespace)? else {
            return Ok(Value::Null);
        };
        let selectors = wrap_with_name_check(
            model.selectors(),
            LookupKind::Selector,
            namespace,
            self.settings.check_names,
        );
        let Some(selector) = selectors.lookup(name)? else {
            return Ok(Value::Null);
        };
        let namespaced = self.state.get_dotted(namespace).cloned().unwrap_or_default();
        Ok(selector.select(&namespaced, props, &self.state))
    }
}

impl fmt::Debug for SelectorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorTree")
            .field("namespaces", &self.namespaces())
            .finish_non_exhaustive()
    }
}

/// Namespaced bound action creators
#[derive(Clone, Debug)]
pub struct DispatcherTree {
    bound: Arc<IndexMap<String, BoundActionCreators>>,
    settings: ModelSettings,
}

impl DispatcherTree {
    /// Bound creator `name` of `namespace`; `None` only when name checks are disabled
    pub fn get(&self, namespace: &str, name: &str) -> ModelResult<Option<&BoundActionCreator>> {
        let namespaces = wrap_with_name_check(
            &self.bound,
            LookupKind::Namespace,
            "store",
            self.settings.check_names,
        );
        match namespaces.lookup(namespace)? {
            Some(creators) => creators.lookup(name, self.settings.check_names),
            None => Ok(None),
        }
    }

    /// Dispatch `name` of `namespace`; unknown names are a resolved no-op when unchecked
    pub fn call(
        &self,
        namespace: &str,
        name: &str,
        payload: impl Into<Value>,
    ) -> ModelResult<Completion> {
        match self.get(namespace, name)? {
            Some(creator) => creator.call(payload),
            None => Ok(Completion::resolved()),
        }
    }

    /// Every bound creator of `namespace`
    pub fn namespace(&self, namespace: &str) -> ModelResult<Option<&BoundActionCreators>> {
        wrap_with_name_check(
            &self.bound,
            LookupKind::Namespace,
            "store",
            self.settings.check_names,
        )
        .lookup(namespace)
    }
}

/// Optional steps of a [`Connector`]
pub struct ConnectOptions {
    map_state: Option<MapStateFn>,
    map_dispatch: Option<MapDispatchFn>,
    merge_props: Option<MergePropsFn>,
    settings: ModelSettings,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            map_state: None,
            map_dispatch: None,
            merge_props: None,
            settings: ModelSettings::default(),
        }
    }
}

impl ConnectOptions {
    /// No mapping steps, default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive state props from the selector tree and own props
    pub fn map_state<F>(mut self, f: F) -> Self
    where
        F: Fn(&SelectorTree, &Props) -> ModelResult<Props> + Send + Sync + 'static,
    {
        self.map_state = Some(Arc::new(f));
        self
    }

    /// Derive dispatch props from the dispatcher tree and own props
    pub fn map_dispatch<F>(mut self, f: F) -> Self
    where
        F: Fn(&DispatcherTree, &Props) -> ModelResult<Props> + Send + Sync + 'static,
    {
        self.map_dispatch = Some(Arc::new(f));
        self
    }

    /// Replace the default merge, `(state_props, dispatch_props, own_props)`.
    ///
    /// A custom merge skips the key-conflict check.
    pub fn merge_props<F>(mut self, f: F) -> Self
    where
        F: Fn(Props, Props, Props) -> Props + Send + Sync + 'static,
    {
        self.merge_props = Some(Arc::new(f));
        self
    }

    /// Name-check settings for both trees
    pub fn settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("map_state", &self.map_state.is_some())
            .field("map_dispatch", &self.map_dispatch.is_some())
            .field("merge_props", &self.merge_props.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Binding from store state and dispatch to view props
pub struct Connector {
    models: Arc<IndexMap<String, Model>>,
    options: ConnectOptions,
}

/// Build a connector over `models`
pub fn connect_to_store(models: &[Model], options: ConnectOptions) -> ModelResult<Connector> {
    validate_namespaces(models)?;
    let models = models
        .iter()
        .map(|model| (model.namespace().to_string(), model.clone()))
        .collect();
    Ok(Connector {
        models: Arc::new(models),
        options,
    })
}

impl Connector {
    /// Selector tree over `state`
    pub fn selector_tree(&self, state: &Value) -> SelectorTree {
        SelectorTree {
            models: Arc::clone(&self.models),
            state: state.clone(),
            settings: self.options.settings,
        }
    }

    /// Every model's action creators bound to `dispatch`
    pub fn dispatcher_tree(&self, dispatch: Arc<dyn Dispatch>) -> DispatcherTree {
        let bound = self
            .models
            .iter()
            .map(|(namespace, model)| {
                (
                    namespace.clone(),
                    bind_action_creators(&model.action_creators(), Arc::clone(&dispatch)),
                )
            })
            .collect();
        DispatcherTree {
            bound: Arc::new(bound),
            settings: self.options.settings,
        }
    }

    /// Run the map-state step; empty without one
    pub fn map_state_to_props(&self, state: &Value, own: &Props) -> ModelResult<Props> {
        match &self.options.map_state {
            Some(map_state) => map_state(&self.selector_tree(state), own),
            None => Ok(Props::new()),
        }
    }

    /// Run the map-dispatch step; empty without one
    pub fn map_dispatch_to_props(
        &self,
        dispatch: Arc<dyn Dispatch>,
        own: &Props,
    ) -> ModelResult<Props> {
        match &self.options.map_dispatch {
            Some(map_dispatch) => map_dispatch(&self.dispatcher_tree(dispatch), own),
            None => Ok(Props::new()),
        }
    }

    /// Merge the three prop sources
    pub fn merge_props(
        &self,
        state_props: Props,
        dispatch_props: Props,
        own: Props,
    ) -> ModelResult<Props> {
        match &self.options.merge_props {
            Some(merge) => Ok(merge(state_props, dispatch_props, own)),
            None => default_merge(own, state_props, dispatch_props),
        }
    }

    /// Map and merge in one go
    pub fn props(
        &self,
        state: &Value,
        dispatch: Arc<dyn Dispatch>,
        own: Props,
    ) -> ModelResult<Props> {
        let state_props = self.map_state_to_props(state, &own)?;
        let dispatch_props = self.map_dispatch_to_props(dispatch, &own)?;
        self.merge_props(state_props, dispatch_props, own)
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("namespaces", &self.models.keys().collect::<Vec<_>>())
            .field("options", &self.options)
            .finish()
    }
}

/// Own, then state, then dispatch props; any shared key is a conflict
fn default_merge(own: Props, state: Props, dispatch: Props) -> ModelResult<Props> {
    let shared = |source: &Props, others: [&Props; 2]| -> Vec<String> {
        source
            .keys()
            .filter(|key| others.iter().any(|other| other.contains_key(*key)))
            .cloned()
            .collect()
    };
    let own_conflicts = shared(&own, [&state, &dispatch]);
    let state_conflicts = shared(&state, [&own, &dispatch]);
    let dispatch_conflicts = shared(&dispatch, [&own, &state]);

    if !own_conflicts.is_empty() || !state_conflicts.is_empty() || !dispatch_conflicts.is_empty() {
        return Err(ModelError::KeyConflict {
            own: own_conflicts,
            state: state_conflicts,
            dispatch: dispatch_conflicts,
        });
    }

    let mut merged = own;
    merged.extend(state);
    merged.extend(dispatch);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::model::ModelOptions;
    use parking_lot::Mutex;
    use serde_json::json;

    fn todos() -> Model {
        ModelOptions::new("app.todos")
            .state(json!({"items": ["a", "b"]}))
            .selector_fn("count", |state, _, _| {
                Value::from(state.get("items").and_then(Value::as_array).map_or(0, Vec::len))
            })
            .reducer("add", |draft, payload| {
                draft.child("items").push(payload.get("title").cloned().unwrap_or_default());
            })
            .settings(ModelSettings::unchecked())
            .build()
            .unwrap()
    }

    fn sink() -> (Arc<dyn Dispatch>, Arc<Mutex<Vec<Action>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::clone(&log);
        (Arc::new(move |action: Action| writer.lock().push(action)), log)
    }

    fn connector(settings: ModelSettings) -> Connector {
        let options = ConnectOptions::new()
            .settings(settings)
            .map_state(|tree, _own| {
                let mut props = Props::new();
                let count = tree.select("app.todos", "count", &Value::Null)?;
                props.insert("count".into(), count.into());
                Ok(props)
            })
            .map_dispatch(|tree, _own| {
                let mut props = Props::new();
                if let Some(add) = tree.get("app.todos", "add")? {
                    props.insert("add".into(), add.clone().into());
                }
                Ok(props)
            });
        connect_to_store(&[todos()], options).unwrap()
    }

    #[tokio::test]
    async fn test_props_combine_state_dispatch_and_own() {
        let connector = connector(ModelSettings::default());
        let state = Value::from(json!({"app": {"todos": {"items": ["a", "b"]}}}));
        let (dispatch, log) = sink();
        let mut own = Props::new();
        own.insert("title".into(), Value::from("Todos").into());

        let props = connector.props(&state, dispatch, own).unwrap();
        let keys: Vec<&String> = props.keys().collect();
        assert_eq!(keys, vec!["title", "count", "add"]);
        assert_eq!(props["count"].as_value(), Some(&Value::from(2usize)));

        let add = props["add"].as_action().unwrap();
        add.call(Value::from(json!({"title": "c"}))).unwrap().await.unwrap();
        assert_eq!(log.lock()[0].action_type, "app.todos.add");
    }

    #[test]
    fn test_default_merge_reports_conflicts_per_source() {
        let connector = connector(ModelSettings::default());
        let state = Value::from(json!({"app": {"todos": {"items": []}}}));
        let (dispatch, _) = sink();
        let mut own = Props::new();
        own.insert("count".into(), Value::from(0).into());

        let err = connector.props(&state, dispatch, own).unwrap_err();
        assert_eq!(
            err,
            ModelError::KeyConflict {
                own: vec!["count".into()],
                state: vec!["count".into()],
                dispatch: vec![],
            }
        );
    }

    #[test]
    fn test_custom_merge_bypasses_conflict_check() {
        let options = ConnectOptions::new()
            .map_state(|_, _| {
                let mut props = Props::new();
                props.insert("count".into(), Value::from(1).into());
                Ok(props)
            })
            .merge_props(|state, _dispatch, mut own| {
                own.extend(state);
                own
            });
        let connector = connect_to_store(&[todos()], options).unwrap();
        let (dispatch, _) = sink();
        let mut own = Props::new();
        own.insert("count".into(), Value::from(0).into());

        let props = connector.props(&Value::Null, dispatch, own).unwrap();
        assert_eq!(props["count"].as_value(), Some(&Value::from(1)));
    }

    #[test]
    fn test_trees_reject_typos_with_valid_names() {
        let connector = connector(ModelSettings::default());
        let tree = connector.selector_tree(&Value::Null);
        let err = tree.select("app.todo", "count", &Value::Null).unwrap_err();
        assert_eq!(
            err,
            ModelError::UndefinedNamespace {
                name: "app.todo".into(),
                valid: vec!["app.todos".into()],
            }
        );
        assert!(matches!(
            tree.select("app.todos", "cnt", &Value::Null),
            Err(ModelError::UndefinedSelector { .. })
        ));

        let (dispatch, _) = sink();
        let dispatcher = connector.dispatcher_tree(dispatch);
        assert!(matches!(
            dispatcher.get("app.todos", "ad"),
            Err(ModelError::UndefinedReducerOrEffect { .. })
        ));
    }

    #[tokio::test]
    async fn test_unchecked_trees_fall_back_to_noops() {
        let connector = connector(ModelSettings::unchecked());
        let tree = connector.selector_tree(&Value::Null);
        assert_eq!(tree.select("nope", "count", &Value::Null).unwrap(), Value::Null);

        let (dispatch, log) = sink();
        let dispatcher = connector.dispatcher_tree(dispatch);
        assert_eq!(
            dispatcher.call("app.todos", "ad", Value::Null).unwrap().await.unwrap(),
            Value::Null
        );
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_duplicate_models_rejected() {
        let err = connect_to_store(&[todos(), todos()], ConnectOptions::new()).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateNamespace { .. }));
    }
}
