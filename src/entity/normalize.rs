// Copyright 2025 Cowboy AI, LLC.

//! Graph flattening and reconstruction

use super::schema::{EntityModel, EntitySchema, Field};
use super::DEFAULT_SCOPE;
use crate::errors::{ModelError, ModelResult};
use crate::state::{Map, Value};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Result of flattening a payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Ids of the top-level entities, as they appeared in the payload
    pub ids: Vec<Value>,
    /// Flat entities per namespace, keyed by id
    pub tables: IndexMap<String, IndexMap<String, Value>>,
}

impl Normalized {
    /// Tables in the entity state shape, `{ns: {byId: {id: entity}}}`
    pub fn to_state(&self) -> Value {
        self.tables
            .iter()
            .map(|(namespace, table)| {
                let by_id: Map = table.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                let mut scopes = Map::new();
                scopes.insert(DEFAULT_SCOPE.to_string(), Value::from(by_id));
                (namespace.clone(), Value::from(scopes))
            })
            .collect::<Map>()
            .into()
    }

    /// Top-level ids as an array value
    pub fn id_values(&self) -> Value {
        Value::from(self.ids.clone())
    }
}

impl EntitySchema {
    /// Flatten `data` (one entity or a list) of type `entity`.
    ///
    /// Nested entities land in their own namespace's table and are replaced
    /// by their id. An entity seen twice is merged shallowly.
    pub fn normalize(&self, entity: &str, data: &Value) -> ModelResult<Normalized> {
        let model = self.entity(entity)?;
        let mut normalized = Normalized::default();
        for item in as_items(data) {
            let id = self.flatten(model, item, &mut normalized.tables)?;
            normalized.ids.push(id);
        }
        Ok(normalized)
    }

    fn flatten(
        &self,
        model: &EntityModel,
        item: &Value,
        tables: &mut IndexMap<String, IndexMap<String, Value>>,
    ) -> ModelResult<Value> {
        let Some(fields) = item.as_object() else {
            // already a reference
            return match item.as_key() {
                Some(_) => Ok(item.clone()),
                None => Err(missing_id(model)),
            };
        };

        let id = fields
            .get(model.id_attr())
            .filter(|id| id.as_key().is_some())
            .cloned()
            .ok_or_else(|| missing_id(model))?;

        let mut flat = Map::with_capacity(fields.len());
        for (name, value) in fields.iter() {
            let reference = match (model.fields().get(name), value) {
                (_, Value::Null) | (None, _) | (Some(Field::Scalar), _) => value.clone(),
                (Some(Field::OneToOne(target)), _) => {
                    self.flatten(self.entity(target)?, value, tables)?
                }
                (Some(Field::OneToMany(target)), _) => {
                    let target = self.entity(target)?;
                    as_items(value)
                        .map(|child| self.flatten(target, child, tables))
                        .collect::<ModelResult<Vec<Value>>>()?
                        .into()
                }
            };
            flat.insert(name.clone(), reference);
        }

        let key = id.as_key().unwrap_or_default();
        let table = tables.entry(model.namespace().to_string()).or_default();
        let merged = match table.get(&key) {
            Some(existing) => merge_shallow(existing, &Value::from(flat)),
            None => Value::from(flat),
        };
        table.insert(key, merged);
        Ok(id)
    }

    /// Rebuild nested objects for `ids` (one id or a list) of type `entity`.
    ///
    /// `root` has the entity state shape. Unknown ids become `Null`; a
    /// reference back to an entity already being rebuilt stays an id.
    pub fn denormalize(&self, entity: &str, ids: &Value, root: &Value) -> ModelResult<Value> {
        let model = self.entity(entity)?;
        let mut path = HashSet::new();
        match ids {
            Value::Array(items) => items
                .iter()
                .map(|id| self.rebuild(model, id, root, &mut path))
                .collect::<ModelResult<Vec<Value>>>()
                .map(Value::from),
            single => self.rebuild(model, single, root, &mut path),
        }
    }

    fn rebuild(
        &self,
        model: &EntityModel,
        id: &Value,
        root: &Value,
        path: &mut HashSet<(String, String)>,
    ) -> ModelResult<Value> {
        let Some(key) = id.as_key() else {
            return Ok(Value::Null);
        };
        let Some(flat) = root
            .get(model.namespace())
            .and_then(|ns| ns.get(DEFAULT_SCOPE))
            .and_then(|table| table.get(&key))
        else {
            return Ok(Value::Null);
        };

        let visit = (model.namespace().to_string(), key);
        if !path.insert(visit.clone()) {
            return Ok(id.clone());
        }

        let mut rebuilt = Map::new();
        if let Some(fields) = flat.as_object() {
            for (name, value) in fields.iter() {
                let restored = match (model.fields().get(name), value) {
                    (_, Value::Null) | (None, _) | (Some(Field::Scalar), _) => value.clone(),
                    (Some(Field::OneToOne(target)), _) => {
                        self.rebuild(self.entity(target)?, value, root, path)?
                    }
                    (Some(Field::OneToMany(target)), _) => {
                        let target = self.entity(target)?;
                        as_items(value)
                            .map(|child| self.rebuild(target, child, root, path))
                            .collect::<ModelResult<Vec<Value>>>()?
                            .into()
                    }
                };
                rebuilt.insert(name.clone(), restored);
            }
        }

        path.remove(&visit);
        Ok(Value::from(rebuilt))
    }
}

/// `existing` with every field of `update` written over it
pub(crate) fn merge_shallow(existing: &Value, update: &Value) -> Value {
    match (existing.as_object(), update.as_object()) {
        (Some(old), Some(new)) => {
            let mut merged = old.clone();
            for (key, value) in new.iter() {
                merged.insert(key.clone(), value.clone());
            }
            Value::from(merged)
        }
        _ => update.clone(),
    }
}

/// Items of a payload coerced to a list; `Null` is empty
fn as_items(data: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match data {
        Value::Null => Box::new(std::iter::empty()),
        Value::Array(items) => Box::new(items.iter()),
        single => Box::new(std::iter::once(single)),
    }
}

fn missing_id(model: &EntityModel) -> ModelError {
    ModelError::MissingEntityId {
        entity: model.namespace().to_string(),
        attribute: model.id_attr().to_string(),
    }
}
