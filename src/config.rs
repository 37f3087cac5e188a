// Copyright 2025 Cowboy AI, LLC.

//! Settings threaded through models, wiring and the effect runtime
//!
//! Checks that were historically global toggles are explicit values here:
//! pass [`ModelSettings`] to each model and connector that should relax them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Usage checks performed by models and connectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelSettings {
    /// Reject action creators on models that were never combined / supervised
    pub check_initialization: bool,
    /// Reject lookups of undeclared selectors, reducers, effects and namespaces
    pub check_names: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            check_initialization: true,
            check_names: true,
        }
    }
}

impl ModelSettings {
    /// Both checks disabled. Meant for test harnesses only.
    pub fn unchecked() -> Self {
        Self {
            check_initialization: false,
            check_names: false,
        }
    }

    /// Defaults overridden by `CIM_MODEL_CHECK_INITIALIZATION` and `CIM_MODEL_CHECK_NAMES`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            check_initialization: env_flag(
                "CIM_MODEL_CHECK_INITIALIZATION",
                defaults.check_initialization,
            ),
            check_names: env_flag("CIM_MODEL_CHECK_NAMES", defaults.check_names),
        }
    }

    /// Copy with initialization checks toggled
    pub fn with_initialization_check(mut self, enabled: bool) -> Self {
        self.check_initialization = enabled;
        self
    }

    /// Copy with name checks toggled
    pub fn with_name_check(mut self, enabled: bool) -> Self {
        self.check_names = enabled;
        self
    }
}

/// Configuration for the effect runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeConfig {
    /// Capacity of the action broadcast channel
    pub action_channel_capacity: usize,
    /// Pause before restarting a crashed effect watcher, in milliseconds
    pub restart_delay_ms: u64,
    /// Maximum restarts per watcher (None = restart forever)
    pub max_restarts: Option<u32>,
    /// Entries kept by memoized entity selectors
    pub selector_cache_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            action_channel_capacity: 256,
            restart_delay_ms: 0,
            max_restarts: None,
            selector_cache_size: 64,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `CIM_MODEL_ACTION_CHANNEL_CAPACITY`,
    /// `CIM_MODEL_RESTART_DELAY_MS`, `CIM_MODEL_MAX_RESTARTS` and
    /// `CIM_MODEL_SELECTOR_CACHE_SIZE`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            action_channel_capacity: env_parse(
                "CIM_MODEL_ACTION_CHANNEL_CAPACITY",
                defaults.action_channel_capacity,
            )
            .max(1),
            restart_delay_ms: env_parse("CIM_MODEL_RESTART_DELAY_MS", defaults.restart_delay_ms),
            max_restarts: env::var("CIM_MODEL_MAX_RESTARTS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .or(defaults.max_restarts),
            selector_cache_size: env_parse(
                "CIM_MODEL_SELECTOR_CACHE_SIZE",
                defaults.selector_cache_size,
            )
            .max(1),
        }
    }

    /// Restart delay as a duration
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// True once `restarts` reached the configured maximum
    pub fn restarts_exhausted(&self, restarts: u32) -> bool {
        self.max_restarts.is_some_and(|max| restarts >= max)
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
