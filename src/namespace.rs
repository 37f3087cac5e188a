// Copyright 2025 Cowboy AI, LLC.

//! Namespace and action-name validation

use crate::errors::{ModelError, ModelResult};
use crate::state::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NAMESPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(\.[A-Za-z0-9]+)*$").expect("namespace pattern is valid")
});

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid"));

static QUALIFIED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(\.[A-Za-z0-9]+)*\.[A-Za-z_$][A-Za-z0-9_$]*$")
        .expect("qualified action type pattern is valid")
});

/// Check that `namespace` is non-empty dot-separated alphanumeric segments
pub fn validate_namespace(namespace: &str) -> ModelResult<()> {
    if namespace.is_empty() {
        return Err(ModelError::EmptyNamespace);
    }
    if !NAMESPACE.is_match(namespace) {
        return Err(ModelError::InvalidNamespace {
            namespace: namespace.to_string(),
        });
    }
    Ok(())
}

/// Validate a namespace coming from data and return it as text
pub fn validate_namespace_value(value: &Value) -> ModelResult<String> {
    let namespace = value.as_str().ok_or_else(|| ModelError::NonStringNamespace {
        found: value.kind().to_string(),
    })?;
    validate_namespace(namespace)?;
    Ok(namespace.to_string())
}

/// True for `<namespace>.<identifier>` action types
pub fn is_qualified_action_type(name: &str) -> bool {
    QUALIFIED.is_match(name)
}

/// A local name must be an identifier; a dotted name must be a qualified action type
pub fn validate_action_name(namespace: &str, name: &str) -> ModelResult<()> {
    let valid = if name.contains('.') {
        is_qualified_action_type(name)
    } else {
        IDENTIFIER.is_match(name)
    };
    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidActionName {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

/// Reject names declared both as reducers and as effects.
///
/// The error lists reducer names followed by effect names, in declaration order.
pub fn validate_unique_action_names<R, E>(
    reducer_names: &[R],
    effect_names: &[E],
) -> ModelResult<()>
where
    R: AsRef<str>,
    E: AsRef<str>,
{
    let duplicates: Vec<String> = reducer_names
        .iter()
        .map(AsRef::as_ref)
        .filter(|name| effect_names.iter().any(|e| e.as_ref() == *name))
        .map(str::to_string)
        .collect();

    if duplicates.is_empty() {
        return Ok(());
    }

    let names = reducer_names
        .iter()
        .map(|n| n.as_ref().to_string())
        .chain(effect_names.iter().map(|n| n.as_ref().to_string()))
        .collect();
    Err(ModelError::DuplicateActionName { duplicates, names })
}

/// Action type of `name` in `namespace`; qualified names are kept as given
pub fn qualify_action_type(namespace: &str, name: &str) -> String {
    if is_qualified_action_type(name) {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Reject names that end up on the same action type once qualified, such as
/// `add` next to `todos.add` in namespace `todos`.
///
/// `duplicates` holds each name whose action type an earlier name already
/// claimed; `names` lists reducer names followed by effect names.
pub fn validate_unique_action_types<R, E>(
    namespace: &str,
    reducer_names: &[R],
    effect_names: &[E],
) -> ModelResult<()>
where
    R: AsRef<str>,
    E: AsRef<str>,
{
    let names: Vec<String> = reducer_names
        .iter()
        .map(|n| n.as_ref().to_string())
        .chain(effect_names.iter().map(|n| n.as_ref().to_string()))
        .collect();

    let mut claimed = HashSet::new();
    let duplicates: Vec<String> = names
        .iter()
        .filter(|name| !claimed.insert(qualify_action_type(namespace, name)))
        .cloned()
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ModelError::DuplicateActionName { duplicates, names })
    }
}

/// Every blocking-effect name must override an existing effect
pub fn validate_blocking_effect_coverage<E, B>(
    effect_names: &[E],
    blocking_names: &[B],
) -> ModelResult<()>
where
    E: AsRef<str>,
    B: AsRef<str>,
{
    match blocking_names
        .iter()
        .map(AsRef::as_ref)
        .find(|name| !effect_names.iter().any(|e| e.as_ref() == *name))
    {
        Some(orphan) => Err(ModelError::OrphanBlockingEffect {
            name: orphan.to_string(),
            effects: effect_names.iter().map(|e| e.as_ref().to_string()).collect(),
        }),
        None => Ok(()),
    }
}
