// Copyright 2025 Cowboy AI, LLC.

//! Name-checked lookups
//!
//! Lookups of selectors, reducers, effects, capabilities and namespaces go
//! through [`NameCheck`], which turns a miss into an error that names the bad
//! key and enumerates the valid ones.

use crate::errors::{ModelError, ModelResult};
use indexmap::IndexMap;

/// What kind of name is being looked up; decides the error raised on a miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Selector of a namespace
    Selector,
    /// Reducer or effect of a namespace
    ReducerOrEffect,
    /// Capability of an effect API
    EffectCapability,
    /// Connected namespace
    Namespace,
}

impl LookupKind {
    /// Error for a miss of `name` in `scope`
    pub fn error(self, scope: &str, name: &str, valid: Vec<String>) -> ModelError {
        let name = name.to_string();
        let scope = scope.to_string();
        match self {
            LookupKind::Selector => ModelError::UndefinedSelector {
                namespace: scope,
                name,
                valid,
            },
            LookupKind::ReducerOrEffect => ModelError::UndefinedReducerOrEffect {
                namespace: scope,
                name,
                valid,
            },
            LookupKind::EffectCapability => ModelError::UndefinedEffectCapability {
                scope,
                name,
                valid,
            },
            LookupKind::Namespace => ModelError::UndefinedNamespace { name, valid },
        }
    }
}

/// Accessor over a map that reports misses with the list of valid names
#[derive(Debug)]
pub struct NameCheck<'a, V> {
    entries: &'a IndexMap<String, V>,
    kind: LookupKind,
    scope: &'a str,
    enabled: bool,
}

/// Wrap `entries` so that lookups of unknown names fail with `kind`'s error.
///
/// With `enabled == false` a miss yields `Ok(None)` instead.
pub fn wrap_with_name_check<'a, V>(
    entries: &'a IndexMap<String, V>,
    kind: LookupKind,
    scope: &'a str,
    enabled: bool,
) -> NameCheck<'a, V> {
    NameCheck {
        entries,
        kind,
        scope,
        enabled,
    }
}

impl<'a, V> NameCheck<'a, V> {
    /// Look up `name`
    pub fn lookup(&self, name: &str) -> ModelResult<Option<&'a V>> {
        match self.entries.get(name) {
            Some(value) => Ok(Some(value)),
            None if self.enabled => Err(self.miss(name)),
            None => Ok(None),
        }
    }

    /// Look up `name`, failing on a miss regardless of the toggle
    pub fn require(&self, name: &str) -> ModelResult<&'a V> {
        self.entries.get(name).ok_or_else(|| self.miss(name))
    }

    /// Names that resolve
    pub fn valid_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn miss(&self, name: &str) -> ModelError {
        self.kind.error(self.scope, name, self.valid_names())
    }
}
