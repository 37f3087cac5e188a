// Copyright 2025 Cowboy AI, LLC.

//! Copy-on-write drafts
//!
//! [`produce`] hands a recipe a mutable [`Draft`] of the base value. Only the
//! containers on a path the recipe wrote through are copied; everything else
//! keeps its original allocation, and a recipe that writes nothing returns the
//! base itself.

use super::value::{Map, Value};
use std::sync::Arc;

/// Apply `recipe` to a draft of `base` and return the resulting value
pub fn produce<F>(base: &Value, recipe: F) -> Value
where
    F: FnOnce(&mut Draft<'_>),
{
    let mut working = base.clone();
    let mut touched = false;
    {
        let mut draft = Draft {
            value: &mut working,
            touched: &mut touched,
        };
        recipe(&mut draft);
    }
    if touched {
        working
    } else {
        base.clone()
    }
}

/// Mutable view over one node of a value being produced
pub struct Draft<'a> {
    value: &'a mut Value,
    touched: &'a mut bool,
}

impl<'a> Draft<'a> {
    /// Current value of this node
    pub fn value(&self) -> &Value {
        self.value
    }

    /// Field of this node
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// Keys of this node when it is an object
    pub fn keys(&self) -> Vec<String> {
        self.value
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of entries (object fields or array items)
    pub fn len(&self) -> usize {
        match &*self.value {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    /// True when [`len`](Self::len) is zero
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace this node entirely
    pub fn replace(&mut self, value: impl Into<Value>) {
        *self.value = value.into();
        *self.touched = true;
    }

    /// Set a field, turning this node into an object if needed
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        object_mut(self.value, self.touched).insert(key.into(), value.into());
    }

    /// Remove a field; untouched if the field is absent
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.value.get(key)?;
        object_mut(self.value, self.touched).shift_remove(key)
    }

    /// Replace a field with `f(current)`; `current` is `Null` when absent
    pub fn update<F>(&mut self, key: &str, f: F)
    where
        F: FnOnce(&Value) -> Value,
    {
        let next = f(self.value.get(key).unwrap_or(&Value::Null));
        self.set(key, next);
    }

    /// Empty this node, keeping its container kind
    pub fn clear(&mut self) {
        let empty = match &*self.value {
            Value::Array(items) => (!items.is_empty()).then(Value::array),
            Value::Object(map) => (!map.is_empty()).then(Value::object),
            _ => Some(Value::object()),
        };
        if let Some(empty) = empty {
            self.replace(empty);
        }
    }

    /// Draft of a field, created as an empty object when absent
    pub fn child(&mut self, key: &str) -> Draft<'_> {
        let Draft { value, touched } = self;
        let map = object_mut(value, touched);
        let slot = map
            .entry(key.to_string())
            .or_insert_with(Value::object);
        Draft {
            value: slot,
            touched: &mut **touched,
        }
    }

    /// Draft of an array element
    pub fn index(&mut self, index: usize) -> Option<Draft<'_>> {
        if self.value.at(index).is_none() {
            return None;
        }
        let Draft { value, touched } = self;
        let items = array_mut(value, touched);
        let slot = items.get_mut(index)?;
        Some(Draft {
            value: slot,
            touched: &mut **touched,
        })
    }

    /// Append to this node, turning it into an array if needed
    pub fn push(&mut self, value: impl Into<Value>) {
        array_mut(self.value, self.touched).push(value.into());
    }

    /// Keep only the array items matching `keep`; untouched if nothing is removed
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Value) -> bool,
    {
        let removes = match &*self.value {
            Value::Array(items) => items.iter().any(|item| !keep(item)),
            _ => false,
        };
        if removes {
            array_mut(self.value, self.touched).retain(|item| keep(item));
        }
    }
}

fn object_mut<'v>(value: &'v mut Value, touched: &mut bool) -> &'v mut Map {
    *touched = true;
    if !value.is_object() {
        *value = Value::object();
    }
    match value {
        Value::Object(map) => Arc::make_mut(map),
        _ => unreachable!("value was just made an object"),
    }
}

fn array_mut<'v>(value: &'v mut Value, touched: &mut bool) -> &'v mut Vec<Value> {
    *touched = true;
    if !matches!(value, Value::Array(_)) {
        *value = Value::array();
    }
    match value {
        Value::Array(items) => Arc::make_mut(items),
        _ => unreachable!("value was just made an array"),
    }
}
