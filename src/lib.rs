// Copyright 2025 Cowboy AI, LLC.

//! # CIM Model
//!
//! Declarative models for CIM stores.
//!
//! A [`Model`] groups a namespace, its initial state, reducers, selectors and
//! effects. From that declaration the crate derives everything a store needs:
//! - **Actions**: namespaced action types and action creators that carry
//!   completion internals for effects
//! - **Reducers**: copy-on-write reducer functions over persistent [`Value`]s,
//!   combined into one tree by [`combine_reducers`]
//! - **Effects**: async handlers restricted to a capability set, watched by
//!   per-model loops under a restarting [`root_supervisor`]
//! - **Wiring**: bound action creators, selector and dispatcher trees and
//!   prop merging for view connectors
//! - **Entities**: normalization of nested payloads into id-keyed tables
//!
//! ## Design Principles
//!
//! 1. **Names are checked**: every lookup of a selector, reducer, effect,
//!    namespace or capability fails with the list of valid names
//! 2. **Untouched state is shared**: reducers copy only the path they write
//! 3. **Completions always settle**: an effect trigger resolves, rejects or is
//!    cancelled with a reason
//! 4. **Settings are values**: usage checks travel with models and connectors

#![warn(missing_docs)]

pub mod action;
pub mod config;
pub mod dispatch;
pub mod effects;
pub mod entity;
pub mod errors;
pub mod model;
pub mod name_check;
pub mod namespace;
pub mod saga;
pub mod selector;
pub mod state;
pub mod wiring;

pub use action::{build_action, Action, Completion, Internals};
pub use config::{ModelSettings, RuntimeConfig};
pub use dispatch::{Dispatch, StateSource};
pub use effects::{
    BlockingEffectApi, BlockingEffectHandler, Capability, EffectApi, EffectEnv, EffectHandler,
    EffectTasks, TakePolicy,
};
pub use entity::{EntityModel, EntitySchema, Field, DEFAULT_SCOPE};
pub use errors::{CancelReason, EffectError, ModelError, ModelResult};
pub use model::{ActionCreator, ActionCreators, Model, ModelOptions, ReducerBody, ReducerFunction};
pub use saga::{root_supervisor, ActionBus, ActionStream, SagaRuntime, SupervisorHandle};
pub use selector::Selector;
pub use state::{produce, Draft, Map, Value};
pub use wiring::{
    bind_action_creators, combine_reducers, connect_to_store, BoundActionCreators,
    CombinedReducer, ConnectOptions, Connector, PropValue, Props,
};
