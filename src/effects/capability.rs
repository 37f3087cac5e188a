// Copyright 2025 Cowboy AI, LLC.

//! Capability sets granted to effects and blocking effects
//!
//! Effects may change state (`put`) and read it (`select`) but never consume
//! the action stream; blocking effects consume the stream (the take family)
//! but never touch state directly.

use crate::errors::ModelResult;
use crate::name_check::{wrap_with_name_check, LookupKind};
use indexmap::IndexMap;

/// A scheduler capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Run several futures to completion
    All,
    /// Await a future
    Call,
    /// Abort a forked task
    Cancel,
    /// Run a task after triggers stop arriving for a window
    Debounce,
    /// Sleep
    Delay,
    /// Spawn an attached task
    Fork,
    /// Dispatch an action
    Put,
    /// First future to finish wins
    Race,
    /// Read state
    Select,
    /// Spawn a detached task
    Spawn,
    /// Wait for one matching action
    Take,
    /// Run a task for every matching action
    TakeEvery,
    /// Run a task for the newest matching action, cancelling older ones
    TakeLatest,
    /// Run a task for a matching action unless one is already running
    TakeLeading,
    /// Run at most one task per window
    Throttle,
}

/// Capabilities available to effects
pub const EFFECT_CAPABILITIES: &[Capability] = &[
    Capability::All,
    Capability::Call,
    Capability::Cancel,
    Capability::Delay,
    Capability::Fork,
    Capability::Put,
    Capability::Race,
    Capability::Select,
    Capability::Spawn,
];

/// Capabilities available to blocking effects
pub const BLOCKING_EFFECT_CAPABILITIES: &[Capability] = &[
    Capability::All,
    Capability::Call,
    Capability::Cancel,
    Capability::Debounce,
    Capability::Delay,
    Capability::Fork,
    Capability::Race,
    Capability::Spawn,
    Capability::Take,
    Capability::TakeEvery,
    Capability::TakeLatest,
    Capability::TakeLeading,
    Capability::Throttle,
];

impl Capability {
    /// Name used in lookups and error messages
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::All => "all",
            Capability::Call => "call",
            Capability::Cancel => "cancel",
            Capability::Debounce => "debounce",
            Capability::Delay => "delay",
            Capability::Fork => "fork",
            Capability::Put => "put",
            Capability::Race => "race",
            Capability::Select => "select",
            Capability::Spawn => "spawn",
            Capability::Take => "take",
            Capability::TakeEvery => "take_every",
            Capability::TakeLatest => "take_latest",
            Capability::TakeLeading => "take_leading",
            Capability::Throttle => "throttle",
        }
    }
}

/// Resolve `name` within `set`, listing the set on a miss
pub(crate) fn lookup_capability(
    set: &[Capability],
    scope: &str,
    name: &str,
) -> ModelResult<Capability> {
    let entries: IndexMap<String, Capability> = set
        .iter()
        .map(|capability| (capability.as_str().to_string(), *capability))
        .collect();
    wrap_with_name_check(&entries, LookupKind::EffectCapability, scope, true)
        .require(name)
        .copied()
}
