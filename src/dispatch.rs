// Copyright 2025 Cowboy AI, LLC.

//! Seams to the external store
//!
//! The store itself lives outside this crate. Models only need a way to hand
//! it actions ([`Dispatch`]) and, for effects, a way to read its current
//! state ([`StateSource`]).

use crate::action::Action;
use crate::state::Value;

/// Accepts actions for reduction and effect triggering
pub trait Dispatch: Send + Sync {
    /// Hand `action` to the store
    fn dispatch(&self, action: Action);
}

impl<F> Dispatch for F
where
    F: Fn(Action) + Send + Sync,
{
    fn dispatch(&self, action: Action) {
        self(action)
    }
}

/// Provides the store's current state
pub trait StateSource: Send + Sync {
    /// Snapshot of the entire state tree
    fn state(&self) -> Value;
}

impl<F> StateSource for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn state(&self) -> Value {
        self()
    }
}
