// Copyright 2025 Cowboy AI, LLC.

//! Entity normalization
//!
//! Nested payloads are flattened into per-entity tables keyed by id, with
//! relations replaced by ids. Secondary scopes keep ordered id lists (pages,
//! search results) that point into those tables. [`EntitySchema::into_model`]
//! turns a schema into a regular [`Model`](crate::Model) with `set`, `remove`
//! and `clear` reducers and a memoized `select` selector.

mod model;
mod normalize;
mod schema;
mod selectors;
mod store;

pub use model::EntityCommand;
pub use normalize::Normalized;
pub use schema::{EntityModel, EntitySchema, Field};
pub use selectors::EntitySelectors;

/// Scope holding the entities themselves, keyed by id
pub const DEFAULT_SCOPE: &str = "byId";
