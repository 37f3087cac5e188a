// Copyright 2025 Cowboy AI, LLC.

//! Saga assembly: action bus, effect watchers and the root supervisor

mod bus;
mod descriptor;
mod supervisor;

pub use bus::{ActionBus, ActionStream};
pub use descriptor::{EffectDescriptor, Watcher};
pub use supervisor::{root_supervisor, SagaRuntime, SupervisorHandle};
