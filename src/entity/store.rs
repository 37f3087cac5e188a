// Copyright 2025 Cowboy AI, LLC.

//! Writes and reads over the entity state shape
//!
//! `{ns: {byId: {id: flat_entity}, scope: {scope_id: [ids]}}}`: the default
//! scope holds the entities, every other scope only holds id lists.

use super::normalize::merge_shallow;
use super::schema::EntitySchema;
use super::DEFAULT_SCOPE;
use crate::errors::{ModelError, ModelResult};
use crate::state::{Draft, Map, Value};

impl EntitySchema {
    /// Empty default scope and empty secondary scopes for every entity
    pub fn initial_state(&self) -> Value {
        self.entities()
            .map(|entity| {
                let scopes: Map = entity
                    .all_scopes()
                    .into_iter()
                    .map(|scope| (scope, Value::object()))
                    .collect();
                (entity.namespace().to_string(), Value::from(scopes))
            })
            .collect::<Map>()
            .into()
    }

    /// Normalize `data` into the default tables and, for a secondary scope,
    /// record the top-level ids under `scope/scope_id`.
    ///
    /// Existing entities are merged shallowly. Returns the top-level ids.
    pub fn set(
        &self,
        draft: &mut Draft<'_>,
        entity: &str,
        scope: &str,
        scope_id: Option<&str>,
        data: &Value,
    ) -> ModelResult<Vec<Value>> {
        let model = self.entity(entity)?;
        self.check_scope(model, scope)?;
        let index_key = match (scope == DEFAULT_SCOPE, scope_id) {
            (true, _) => None,
            (false, Some(key)) => Some(key),
            (false, None) => return Err(needs_scope_id(entity, scope)),
        };

        let normalized = self.normalize(entity, data)?;
        for (namespace, table) in &normalized.tables {
            let mut scopes = draft.child(namespace);
            let mut by_id = scopes.child(DEFAULT_SCOPE);
            for (key, flat) in table {
                let merged = match by_id.get(key) {
                    Some(existing) => merge_shallow(existing, flat),
                    None => flat.clone(),
                };
                by_id.set(key.clone(), merged);
            }
        }

        if let Some(key) = index_key {
            draft
                .child(entity)
                .child(scope)
                .set(key, Value::from(normalized.ids.clone()));
        }
        Ok(normalized.ids)
    }

    /// Remove `scope_id` from `scope`.
    ///
    /// In the default scope `scope_id` is an entity id: the entity is deleted
    /// and the id is dropped from every secondary scope of its namespace. In a
    /// secondary scope only that scope's entry goes.
    pub fn remove(
        &self,
        draft: &mut Draft<'_>,
        entity: &str,
        scope: &str,
        scope_id: &str,
    ) -> ModelResult<()> {
        let model = self.entity(entity)?;
        self.check_scope(model, scope)?;
        let current = draft.get(entity).cloned().unwrap_or_default();

        if scope != DEFAULT_SCOPE {
            if current.get(scope).and_then(|index| index.get(scope_id)).is_some() {
                draft.child(entity).child(scope).remove(scope_id);
            }
            return Ok(());
        }

        if current
            .get(DEFAULT_SCOPE)
            .and_then(|table| table.get(scope_id))
            .is_some()
        {
            draft.child(entity).child(DEFAULT_SCOPE).remove(scope_id);
        }

        let references = |id: &Value| id.as_key().as_deref() == Some(scope_id);
        for secondary in model.scopes() {
            let Some(index) = current.get(secondary).and_then(Value::as_object) else {
                continue;
            };
            let stale: Vec<String> = index
                .iter()
                .filter(|(_, ids)| ids.as_array().is_some_and(|ids| ids.iter().any(references)))
                .map(|(key, _)| key.clone())
                .collect();
            if stale.is_empty() {
                continue;
            }
            let mut scopes = draft.child(entity);
            let mut index = scopes.child(secondary);
            for key in stale {
                index.child(&key).retain(|id| !references(id));
            }
        }
        Ok(())
    }

    /// Empty `scope`.
    ///
    /// Clearing the default scope empties the default table of every entity
    /// in the schema, not only `entity`'s, and leaves secondary scopes alone;
    /// clearing a secondary scope empties only that scope of `entity`.
    pub fn clear(&self, draft: &mut Draft<'_>, entity: &str, scope: &str) -> ModelResult<()> {
        let model = self.entity(entity)?;
        self.check_scope(model, scope)?;

        if scope != DEFAULT_SCOPE {
            if is_populated(draft.get(entity).and_then(|ns| ns.get(scope))) {
                draft.child(entity).child(scope).clear();
            }
            return Ok(());
        }

        for namespace in self.namespaces() {
            if is_populated(draft.get(&namespace).and_then(|ns| ns.get(DEFAULT_SCOPE))) {
                draft.child(&namespace).child(DEFAULT_SCOPE).clear();
            }
        }
        Ok(())
    }

    /// Rebuilt entities of `scope`.
    ///
    /// Default scope: the entity `scope_id`, or every entity without one.
    /// Secondary scope: the list under `scope_id`, or every list keyed by
    /// scope id without one.
    pub fn select(
        &self,
        root: &Value,
        entity: &str,
        scope: &str,
        scope_id: Option<&str>,
    ) -> ModelResult<Value> {
        let model = self.entity(entity)?;
        self.check_scope(model, scope)?;
        let tables = root.get(entity);

        match (scope == DEFAULT_SCOPE, scope_id) {
            (true, Some(id)) => self.denormalize(entity, &Value::from(id), root),
            (true, None) => {
                let ids: Vec<Value> = tables
                    .and_then(|ns| ns.get(DEFAULT_SCOPE))
                    .and_then(Value::as_object)
                    .map(|table| table.keys().map(|key| Value::from(key.as_str())).collect())
                    .unwrap_or_default();
                self.denormalize(entity, &Value::from(ids), root)
            }
            (false, Some(key)) => {
                let ids = tables
                    .and_then(|ns| ns.get(scope))
                    .and_then(|index| index.get(key))
                    .cloned()
                    .unwrap_or_else(Value::array);
                self.denormalize(entity, &ids, root)
            }
            (false, None) => {
                let mut lists = Map::new();
                let index = tables
                    .and_then(|ns| ns.get(scope))
                    .and_then(Value::as_object);
                for (key, ids) in index.into_iter().flat_map(|index| index.iter()) {
                    lists.insert(key.clone(), self.denormalize(entity, ids, root)?);
                }
                Ok(Value::from(lists))
            }
        }
    }
}

fn is_populated(table: Option<&Value>) -> bool {
    table
        .and_then(Value::as_object)
        .is_some_and(|entries| !entries.is_empty())
}

fn needs_scope_id(entity: &str, scope: &str) -> ModelError {
    ModelError::InvalidEntityCommand(format!(
        "scope \"{scope}\" of \"{entity}\" needs a scope id"
    ))
}
