// Copyright 2025 Cowboy AI, LLC.

//! Memoized entity reads

use super::schema::EntitySchema;
use crate::errors::ModelResult;
use crate::state::Value;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::trace;

type SelectKey = (String, String, Option<String>);

/// [`EntitySchema::select`] with an LRU cache per `(entity, scope, scope_id)`.
///
/// A cached result is reused while the root state is the same allocation it
/// was computed from, so repeated reads of an unchanged store return the same
/// rebuilt value.
pub struct EntitySelectors {
    schema: Arc<EntitySchema>,
    cache: Mutex<LruCache<SelectKey, (Value, Value)>>,
}

impl EntitySelectors {
    /// Cache holding at most `capacity` results (at least one)
    pub fn new(schema: Arc<EntitySchema>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            schema,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Schema the reads go through
    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    /// Rebuilt entities, reusing the previous result for an unchanged root
    pub fn select(
        &self,
        root: &Value,
        entity: &str,
        scope: &str,
        scope_id: Option<&str>,
    ) -> ModelResult<Value> {
        let key = (
            entity.to_string(),
            scope.to_string(),
            scope_id.map(str::to_string),
        );
        if let Some((cached_root, result)) = self.cache.lock().get(&key) {
            if cached_root.ptr_eq(root) {
                trace!(entity, scope, "entity selector cache hit");
                return Ok(result.clone());
            }
        }

        let result = self.schema.select(root, entity, scope, scope_id)?;
        self.cache.lock().put(key, (root.clone(), result.clone()));
        Ok(result)
    }

    /// Number of cached results
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }
}

impl std::fmt::Debug for EntitySelectors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySelectors")
            .field("entities", &self.schema.namespaces())
            .field("cached", &self.cached())
            .finish()
    }
}
