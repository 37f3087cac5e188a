// Copyright 2025 Cowboy AI, LLC.

//! Root supervisor: runs every model's effect watchers and restarts crashed ones

use super::bus::{ActionBus, ActionStream};
use super::descriptor::EffectDescriptor;
use crate::config::RuntimeConfig;
use crate::dispatch::{Dispatch, StateSource};
use crate::effects::{EffectEnv, Survivors};
use crate::model::Model;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What effect watchers run against: the action bus and the store seams
#[derive(Clone)]
pub struct SagaRuntime {
    bus: ActionBus,
    env: EffectEnv,
}

impl SagaRuntime {
    /// Runtime over `bus`, putting through `dispatch` and selecting from `state`
    pub fn new(
        bus: ActionBus,
        dispatch: Arc<dyn Dispatch>,
        state: Arc<dyn StateSource>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            bus,
            env: EffectEnv::new(dispatch, state, config),
        }
    }

    /// Bus watchers subscribe to
    pub fn bus(&self) -> &ActionBus {
        &self.bus
    }

    /// Environment effects run in
    pub fn env(&self) -> &EffectEnv {
        &self.env
    }

    /// Runtime configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.env.config
    }
}

impl fmt::Debug for SagaRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SagaRuntime")
            .field("bus", &self.bus)
            .field("config", &self.env.config)
            .finish()
    }
}

struct SupervisedTask {
    id: Uuid,
    qualified_name: String,
    handle: JoinHandle<()>,
}

/// Handle over the supervised watchers started by [`root_supervisor`]
pub struct SupervisorHandle {
    tasks: Vec<SupervisedTask>,
    restarts: Arc<AtomicU32>,
}

/// Mark every model scheduler-initialized and spawn one supervised watcher
/// per effect, in model order then declaration order.
///
/// Watchers subscribe before this returns, so actions dispatched afterwards
/// are observed. A watcher that fails is logged and restarted; one that ends
/// cleanly (the bus closed) is not. Effect tasks started before a crash keep
/// running and settle their own completions.
pub fn root_supervisor(models: &[Model], runtime: &SagaRuntime) -> SupervisorHandle {
    for model in models {
        model.mark_scheduler_initialized();
    }

    let restarts = Arc::new(AtomicU32::new(0));
    let mut tasks = Vec::new();
    for model in models {
        for descriptor in model.effect_descriptors().iter() {
            let id = Uuid::new_v4();
            let qualified_name = format!("{}.{}", descriptor.namespace(), descriptor.name());
            let actions = runtime.bus().subscribe();
            debug!(
                task_id = %id,
                effect = %qualified_name,
                blocking = descriptor.is_blocking(),
                "spawning supervised effect watcher"
            );
            let handle = tokio::spawn(supervise(
                id,
                descriptor.clone(),
                runtime.clone(),
                actions,
                Arc::clone(&restarts),
            ));
            tasks.push(SupervisedTask {
                id,
                qualified_name,
                handle,
            });
        }
    }

    info!(watchers = tasks.len(), models = models.len(), "root supervisor started");
    SupervisorHandle { tasks, restarts }
}

async fn supervise(
    id: Uuid,
    descriptor: EffectDescriptor,
    runtime: SagaRuntime,
    first: ActionStream,
    restarts: Arc<AtomicU32>,
) {
    let survivors = Survivors::default();
    let mut actions = Some(first);
    let mut own_restarts: u32 = 0;
    loop {
        let stream = actions.take().unwrap_or_else(|| runtime.bus().subscribe());
        match descriptor.run(stream, runtime.env(), &survivors).await {
            Ok(()) => {
                survivors.settle().await;
                debug!(task_id = %id, effect = descriptor.name(), "effect watcher finished");
                return;
            }
            Err(err) => {
                error!(
                    task_id = %id,
                    namespace = descriptor.namespace(),
                    effect = descriptor.name(),
                    error = %err,
                    "effect watcher crashed"
                );
                if runtime.config().restarts_exhausted(own_restarts) {
                    warn!(
                        task_id = %id,
                        effect = descriptor.name(),
                        restarts = own_restarts,
                        "restart limit reached; effect watcher stopped"
                    );
                    survivors.settle().await;
                    return;
                }
                own_restarts += 1;
                restarts.fetch_add(1, Ordering::Relaxed);
                let delay = runtime.config().restart_delay();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                debug!(
                    task_id = %id,
                    effect = descriptor.name(),
                    restart = own_restarts,
                    "restarting effect watcher"
                );
            }
        }
    }
}

impl SupervisorHandle {
    /// Number of supervised watchers
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when no model declared an effect
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Restarts performed across all watchers
    pub fn restart_count(&self) -> u32 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// `(task id, "<namespace>.<effect>")` of every watcher in spawn order
    pub fn task_ids(&self) -> Vec<(Uuid, String)> {
        self.tasks
            .iter()
            .map(|task| (task.id, task.qualified_name.clone()))
            .collect()
    }

    /// True once every watcher has stopped
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|task| task.handle.is_finished())
    }

    /// Stop every watcher; pending completions they own are rejected as abandoned
    pub fn abort(&self) {
        for task in &self.tasks {
            task.handle.abort();
        }
    }

    /// Wait for every watcher to stop
    pub async fn join(self) {
        for task in self.tasks {
            if let Err(err) = task.handle.await {
                if !err.is_cancelled() {
                    error!(
                        task_id = %task.id,
                        effect = %task.qualified_name,
                        error = %err,
                        "effect watcher panicked"
                    );
                }
            }
        }
    }
}

impl fmt::Debug for SupervisorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupervisorHandle")
            .field("tasks", &self.task_ids())
            .field("restarts", &self.restart_count())
            .finish()
    }
}
