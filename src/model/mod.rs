// Copyright 2025 Cowboy AI, LLC.

//! Model: the declarative unit of state, reducers, selectors and effects
//!
//! A [`Model`] is built from [`ModelOptions`] and derives everything the store
//! and the effect runtime need: namespaced action types, action creators, one
//! reducer function and the effect descriptors run by the root supervisor.
//!
//! ```rust
//! use cim_model::{ModelOptions, ModelSettings, Value};
//! use serde_json::json;
//!
//! let counter = ModelOptions::new("app.counter")
//!     .state(json!({"count": 0}))
//!     .reducer("increment", |draft, _payload| {
//!         draft.update("count", |c| Value::from(c.as_i64().unwrap_or(0) + 1));
//!     })
//!     .settings(ModelSettings::unchecked())
//!     .build()
//!     .unwrap();
//!
//! let action = counter.action_creators().create("increment", Value::Null).unwrap();
//! let next = (counter.reducer_function())(counter.state(), &action);
//! assert_eq!(next.get("count"), Some(&Value::from(1)));
//! ```

mod creators;

pub use creators::{ActionCreator, ActionCreators};

use crate::action::Action;
use crate::config::ModelSettings;
use crate::effects::{
    BlockingEffectApi, BlockingEffectHandler, EffectApi, EffectBody, EffectHandler, EffectTasks,
};
use crate::errors::{EffectError, ModelResult};
use crate::name_check::{wrap_with_name_check, LookupKind};
use crate::namespace::{
    is_qualified_action_type, qualify_action_type, validate_action_name,
    validate_blocking_effect_coverage, validate_namespace, validate_unique_action_names,
    validate_unique_action_types,
};
use crate::saga::{EffectDescriptor, Watcher};
use crate::selector::Selector;
use crate::state::{produce, Draft, Value};
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Reducer body: mutates a draft of the namespaced state with the action payload
pub type ReducerBody = Arc<dyn Fn(&mut Draft<'_>, &Value) + Send + Sync>;

/// `(namespaced_state, action) -> next_namespaced_state`
pub type ReducerFunction = Arc<dyn Fn(&Value, &Action) -> Value + Send + Sync>;

/// Registration flags, each set once and never reset
#[derive(Debug, Default)]
pub(crate) struct ModelFlags {
    store: AtomicBool,
    scheduler: AtomicBool,
}

impl ModelFlags {
    pub(crate) fn is_store_initialized(&self) -> bool {
        self.store.load(Ordering::Acquire)
    }

    pub(crate) fn is_scheduler_initialized(&self) -> bool {
        self.scheduler.load(Ordering::Acquire)
    }
}

/// Declarative options a [`Model`] is built from
pub struct ModelOptions {
    namespace: String,
    state: Value,
    selectors: IndexMap<String, Selector>,
    reducers: IndexMap<String, ReducerBody>,
    effects: IndexMap<String, Arc<dyn EffectHandler>>,
    blocking_effects: IndexMap<String, Arc<dyn BlockingEffectHandler>>,
    settings: ModelSettings,
}

impl ModelOptions {
    /// Options for a model living at `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            state: Value::object(),
            selectors: IndexMap::new(),
            reducers: IndexMap::new(),
            effects: IndexMap::new(),
            blocking_effects: IndexMap::new(),
            settings: ModelSettings::default(),
        }
    }

    /// Initial state
    pub fn state(mut self, state: impl Into<Value>) -> Self {
        self.state = state.into();
        self
    }

    /// Add a selector
    pub fn selector(mut self, name: impl Into<String>, selector: Selector) -> Self {
        self.selectors.insert(name.into(), selector);
        self
    }

    /// Add a plain selector from a function
    pub fn selector_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value, &Value, &Value) -> Value + Send + Sync + 'static,
    {
        self.selector(name, Selector::new(f))
    }

    /// Add a reducer. A dotted name reacts to another model's action type.
    pub fn reducer<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut Draft<'_>, &Value) + Send + Sync + 'static,
    {
        self.reducers.insert(name.into(), Arc::new(body));
        self
    }

    /// Add an effect from an async closure
    pub fn effect<F, Fut>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Value, EffectApi, ActionCreators) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.effect_handler(name, body)
    }

    /// Add an effect from any [`EffectHandler`]
    pub fn effect_handler(mut self, name: impl Into<String>, handler: impl EffectHandler) -> Self {
        self.effects.insert(name.into(), Arc::new(handler));
        self
    }

    /// Override the watcher of an existing effect, e.g. with a
    /// [`TakePolicy`](crate::effects::TakePolicy)
    pub fn blocking_effect(
        mut self,
        name: impl Into<String>,
        handler: impl BlockingEffectHandler,
    ) -> Self {
        self.blocking_effects.insert(name.into(), Arc::new(handler));
        self
    }

    /// Override the watcher of an existing effect with a custom loop
    pub fn blocking_effect_fn<F, Fut>(self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(String, BlockingEffectApi, EffectTasks) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EffectError>> + Send + 'static,
    {
        self.blocking_effect(name, body)
    }

    /// Usage checks for this model
    pub fn settings(mut self, settings: ModelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate and build
    pub fn build(self) -> ModelResult<Model> {
        validate_namespace(&self.namespace)?;
        for name in self
            .reducers
            .keys()
            .chain(self.effects.keys())
            .chain(self.blocking_effects.keys())
        {
            validate_action_name(&self.namespace, name)?;
        }

        let reducer_names: Vec<&str> = self.reducers.keys().map(String::as_str).collect();
        let effect_names: Vec<&str> = self.effects.keys().map(String::as_str).collect();
        let blocking_names: Vec<&str> = self.blocking_effects.keys().map(String::as_str).collect();
        validate_unique_action_names(&reducer_names, &effect_names)?;
        validate_unique_action_types(&self.namespace, &reducer_names, &effect_names)?;
        validate_blocking_effect_coverage(&effect_names, &blocking_names)?;

        let action_types = reducer_names
            .iter()
            .chain(effect_names.iter())
            .map(|name| (name.to_string(), qualify_action_type(&self.namespace, name)))
            .collect();

        debug!(
            namespace = %self.namespace,
            reducers = ?reducer_names,
            effects = ?effect_names,
            blocking_effects = ?blocking_names,
            "model built"
        );

        Ok(Model {
            inner: Arc::new(ModelInner {
                namespace: self.namespace,
                state: self.state,
                selectors: self.selectors,
                reducers: self.reducers,
                effects: self.effects,
                blocking_effects: self.blocking_effects,
                settings: self.settings,
                action_types,
                flags: Arc::new(ModelFlags::default()),
                reducer_function: OnceCell::new(),
                action_creators: OnceCell::new(),
                effect_bodies: OnceCell::new(),
                effect_descriptors: OnceCell::new(),
            }),
        })
    }
}

impl fmt::Debug for ModelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelOptions")
            .field("namespace", &self.namespace)
            .field("reducers", &self.reducers.keys().collect::<Vec<_>>())
            .field("effects", &self.effects.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

struct ModelInner {
    namespace: String,
    state: Value,
    selectors: IndexMap<String, Selector>,
    reducers: IndexMap<String, ReducerBody>,
    effects: IndexMap<String, Arc<dyn EffectHandler>>,
    blocking_effects: IndexMap<String, Arc<dyn BlockingEffectHandler>>,
    settings: ModelSettings,
    action_types: IndexMap<String, String>,
    flags: Arc<ModelFlags>,
    reducer_function: OnceCell<ReducerFunction>,
    action_creators: OnceCell<ActionCreators>,
    effect_bodies: OnceCell<Arc<IndexMap<String, EffectBody>>>,
    effect_descriptors: OnceCell<Arc<Vec<EffectDescriptor>>>,
}

/// A built model; clones share derived artifacts and registration flags
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

impl Model {
    /// Namespace, also the model's path in the state tree
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Initial state
    pub fn state(&self) -> &Value {
        &self.inner.state
    }

    /// Selectors as declared
    pub fn selectors(&self) -> &IndexMap<String, Selector> {
        &self.inner.selectors
    }

    /// Reducer bodies as declared
    pub fn reducers(&self) -> &IndexMap<String, ReducerBody> {
        &self.inner.reducers
    }

    /// Effect handlers as declared
    pub fn effects(&self) -> &IndexMap<String, Arc<dyn EffectHandler>> {
        &self.inner.effects
    }

    /// Blocking-effect handlers as declared
    pub fn blocking_effects(&self) -> &IndexMap<String, Arc<dyn BlockingEffectHandler>> {
        &self.inner.blocking_effects
    }

    /// Usage checks
    pub fn settings(&self) -> ModelSettings {
        self.inner.settings
    }

    /// Qualified action type for `name`; already-qualified names are returned unchanged
    pub fn action_type(&self, name: &str) -> String {
        qualify_action_type(&self.inner.namespace, name)
    }

    /// Every reducer and effect name mapped to its action type
    pub fn action_types(&self) -> &IndexMap<String, String> {
        &self.inner.action_types
    }

    /// Run the selector `name`
    pub fn select(
        &self,
        name: &str,
        namespaced: &Value,
        props: &Value,
        entire: &Value,
    ) -> ModelResult<Value> {
        let check = wrap_with_name_check(
            &self.inner.selectors,
            LookupKind::Selector,
            &self.inner.namespace,
            self.inner.settings.check_names,
        );
        Ok(check
            .lookup(name)?
            .map(|selector| selector.select(namespaced, props, entire))
            .unwrap_or_default())
    }

    /// Action creators for every local reducer and effect name (memoized)
    pub fn action_creators(&self) -> ActionCreators {
        self.inner
            .action_creators
            .get_or_init(|| {
                let inner = &self.inner;
                let creators = inner
                    .action_types
                    .iter()
                    .filter(|(name, _)| !is_qualified_action_type(name))
                    .map(|(name, action_type)| {
                        let creator = ActionCreator::new(
                            &inner.namespace,
                            name,
                            action_type.clone(),
                            inner.effects.contains_key(name),
                            Arc::clone(&inner.flags),
                            inner.settings,
                        );
                        (name.clone(), creator)
                    })
                    .collect();
                ActionCreators::new(&inner.namespace, creators)
            })
            .clone()
    }

    /// The reducer over this model's namespaced state (memoized).
    ///
    /// Unknown action types return the input state itself.
    pub fn reducer_function(&self) -> ReducerFunction {
        Arc::clone(self.inner.reducer_function.get_or_init(|| {
            let table: HashMap<String, ReducerBody> = self
                .inner
                .reducers
                .iter()
                .map(|(name, body)| (self.action_type(name), Arc::clone(body)))
                .collect();
            let namespace = self.inner.namespace.clone();
            let reducer: ReducerFunction = Arc::new(move |state: &Value, action: &Action| {
                match table.get(&action.action_type) {
                    Some(body) => {
                        trace!(%namespace, action_type = %action.action_type, "reducing");
                        produce(state, |draft| body(draft, &action.payload))
                    }
                    None => state.clone(),
                }
            });
            reducer
        }))
    }

    /// Effect bodies keyed by declared name (memoized)
    pub fn effect_bodies(&self) -> Arc<IndexMap<String, EffectBody>> {
        Arc::clone(self.inner.effect_bodies.get_or_init(|| {
            let actions = self.action_creators();
            let bodies = self
                .inner
                .effects
                .iter()
                .map(|(name, handler)| {
                    let body = EffectBody {
                        namespace: self.inner.namespace.clone(),
                        name: name.clone(),
                        action_type: self.action_type(name),
                        handler: Arc::clone(handler),
                        actions: actions.clone(),
                    };
                    (name.clone(), body)
                })
                .collect();
            Arc::new(bodies)
        }))
    }

    /// One watcher descriptor per effect, in declaration order (memoized).
    ///
    /// Effects with a blocking override are watched by that override;
    /// the rest run for every matching action.
    pub fn effect_descriptors(&self) -> Arc<Vec<EffectDescriptor>> {
        Arc::clone(self.inner.effect_descriptors.get_or_init(|| {
            let bodies = self.effect_bodies();
            let descriptors = self
                .inner
                .effects
                .keys()
                .map(|name| {
                    let watcher = match self.inner.blocking_effects.get(name) {
                        Some(handler) => Watcher::Blocking(Arc::clone(handler)),
                        None => Watcher::Every,
                    };
                    EffectDescriptor::new(
                        &self.inner.namespace,
                        name,
                        self.action_type(name),
                        watcher,
                        Arc::clone(&bodies),
                    )
                })
                .collect();
            Arc::new(descriptors)
        }))
    }

    /// True once the model was combined into a store
    pub fn is_store_initialized(&self) -> bool {
        self.inner.flags.is_store_initialized()
    }

    /// True once the model was handed to the root supervisor
    pub fn is_scheduler_initialized(&self) -> bool {
        self.inner.flags.is_scheduler_initialized()
    }

    /// Record registration with a store; idempotent
    pub fn mark_store_initialized(&self) {
        if !self.inner.flags.store.swap(true, Ordering::AcqRel) {
            debug!(namespace = %self.inner.namespace, "model registered with store");
        }
    }

    /// Record registration with the effect scheduler; idempotent
    pub fn mark_scheduler_initialized(&self) {
        if !self.inner.flags.scheduler.swap(true, Ordering::AcqRel) {
            debug!(namespace = %self.inner.namespace, "model registered with effect scheduler");
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("namespace", &self.inner.namespace)
            .field("action_types", &self.inner.action_types)
            .field("selectors", &self.inner.selectors.keys().collect::<Vec<_>>())
            .field("store_initialized", &self.is_store_initialized())
            .field("scheduler_initialized", &self.is_scheduler_initialized())
            .finish()
    }
}
