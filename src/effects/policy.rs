// Copyright 2025 Cowboy AI, LLC.

//! Watcher loops over the action stream
//!
//! Every loop returns `Ok(())` when the stream ends, after in-flight tasks
//! finish, and `Err` as soon as a task fails. Tasks still in flight at that
//! point belong to unrelated triggers: they move to the watcher's
//! [`Survivors`] and settle their own completions. Any completion a loop gives
//! up on (superseded, dropped, debounced or throttled) is rejected with
//! [`ModelError::CancelledEffect`](crate::errors::ModelError::CancelledEffect)
//! so no dispatcher waits forever.

use super::bridge::{EffectTask, EffectTasks};
use super::{BlockingEffectApi, BlockingEffectHandler};
use crate::action::{Action, Internals};
use crate::errors::{CancelReason, EffectError, ModelError};
use crate::saga::ActionStream;
use crate::state::Value;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};
use tracing::{debug, error, trace, warn};

type TaskSet = JoinSet<(u64, Result<Value, EffectError>)>;

/// Built-in blocking-effect policies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakePolicy {
    /// Run for every action
    Every,
    /// Run for the newest action, cancelling the one in flight
    Latest,
    /// Ignore actions while an instance is running
    Leading,
    /// Run once the window passes without a new action
    Debounce(Duration),
    /// Run at most once per window, keeping the newest action in between
    Throttle(Duration),
}

#[async_trait]
impl BlockingEffectHandler for TakePolicy {
    async fn run(
        &self,
        action_type: String,
        mut api: BlockingEffectApi,
        effects: EffectTasks,
    ) -> Result<(), EffectError> {
        let task = effects
            .for_action_type(&action_type)
            .cloned()
            .ok_or_else(|| ModelError::UndefinedReducerOrEffect {
                namespace: api.namespace().to_string(),
                name: action_type.clone(),
                valid: effects.names(),
            })?;
        api.run_policy(*self, &action_type, task).await
    }
}

/// Effect tasks that outlive a crashed watcher loop.
///
/// The supervisor keeps one per watcher across restarts. Dropping the last
/// handle aborts whatever is still running, which abandons its completions.
#[derive(Clone, Default)]
pub struct Survivors {
    drains: Arc<Mutex<Drains>>,
}

#[derive(Default)]
struct Drains(Vec<JoinHandle<()>>);

impl Drop for Drains {
    fn drop(&mut self) {
        for drain in &self.0 {
            drain.abort();
        }
    }
}

impl Survivors {
    /// Number of task groups still being drained
    pub fn pending(&self) -> usize {
        self.drains
            .lock()
            .0
            .iter()
            .filter(|drain| !drain.is_finished())
            .count()
    }

    /// Wait until every adopted task has finished
    pub async fn settle(&self) {
        let mut drains = Drains(std::mem::take(&mut self.drains.lock().0));
        for drain in drains.0.iter_mut() {
            if let Err(err) = drain.await {
                if !err.is_cancelled() {
                    error!(error = %err, "survivor drain panicked");
                }
            }
        }
    }

    fn adopt(&self, mut orphans: Running) {
        debug!(
            action_type = %orphans.action_type,
            tasks = orphans.set.len(),
            "effect tasks outlive their watcher"
        );
        let drain = tokio::spawn(async move {
            while let Some(outcome) = orphans.next_finished().await {
                if let Err(err) = outcome {
                    warn!(
                        action_type = %orphans.action_type,
                        error = %err,
                        "surviving effect task failed"
                    );
                }
            }
        });
        let mut drains = self.drains.lock();
        drains.0.retain(|drain| !drain.is_finished());
        drains.0.push(drain);
    }
}

impl fmt::Debug for Survivors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Survivors")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Tasks spawned by one watcher, with the completions they still owe
struct Running {
    action_type: String,
    set: TaskSet,
    owed: HashMap<u64, Internals>,
    next_id: u64,
    survivors: Survivors,
}

impl Running {
    fn new(action_type: &str, survivors: &Survivors) -> Self {
        Self {
            action_type: action_type.to_string(),
            set: JoinSet::new(),
            owed: HashMap::new(),
            next_id: 0,
            survivors: survivors.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    fn spawn(&mut self, task: &EffectTask, action: Action) {
        let id = self.next_id;
        self.next_id += 1;
        if let Some(internals) = &action.internals {
            self.owed.insert(id, internals.clone());
        }
        trace!(action_type = %self.action_type, task = id, "spawning effect task");
        let task = task.clone();
        self.set.spawn(async move { (id, task.run(action).await) });
    }

    /// Outcome of the next task to finish; aborted tasks count as success
    async fn next_finished(&mut self) -> Option<Result<(), EffectError>> {
        match self.set.join_next().await? {
            Ok((id, outcome)) => {
                self.owed.remove(&id);
                Some(outcome.map(|_| ()))
            }
            Err(err) if err.is_cancelled() => Some(Ok(())),
            Err(err) => Some(Err(EffectError::new(anyhow::anyhow!(
                "effect task for \"{}\" panicked: {err}",
                self.action_type
            )))),
        }
    }

    /// Abort every task and reject what they owe with `reason`
    fn cancel_all(&mut self, reason: CancelReason) {
        self.set.abort_all();
        for (_, internals) in self.owed.drain() {
            internals.cancel(&self.action_type, reason);
        }
    }

    /// Hand the tasks still in flight, with what they owe, to the survivors
    fn release(&mut self) {
        if self.set.is_empty() {
            self.owed.clear();
            return;
        }
        let orphans = Running {
            action_type: self.action_type.clone(),
            set: std::mem::replace(&mut self.set, JoinSet::new()),
            owed: std::mem::take(&mut self.owed),
            next_id: self.next_id,
            survivors: Survivors::default(),
        };
        self.survivors.adopt(orphans);
    }

    /// Wait for every task; after the first failure the rest keep running
    async fn drain(&mut self) -> Result<(), EffectError> {
        while let Some(outcome) = self.next_finished().await {
            if let Err(err) = outcome {
                self.release();
                return Err(err);
            }
        }
        Ok(())
    }

    fn check(&mut self, outcome: Result<(), EffectError>) -> Result<(), EffectError> {
        if outcome.is_err() {
            self.release();
        }
        outcome
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.cancel_all(CancelReason::Abandoned);
    }
}

fn refuse(action: &Action, reason: CancelReason) {
    debug!(action_type = %action.action_type, %reason, "effect trigger refused");
    if let Some(internals) = &action.internals {
        internals.cancel(&action.action_type, reason);
    }
}

/// Run `task` for every action of `action_type`
pub async fn take_every(
    stream: &mut ActionStream,
    action_type: &str,
    task: EffectTask,
    survivors: &Survivors,
) -> Result<(), EffectError> {
    let mut running = Running::new(action_type, survivors);
    loop {
        tokio::select! {
            next = stream.next_matching(action_type) => match next {
                Some(action) => running.spawn(&task, action),
                None => break,
            },
            Some(outcome) = running.next_finished(), if !running.is_empty() => {
                running.check(outcome)?;
            }
        }
    }
    running.drain().await
}

/// Run `task` for the newest action of `action_type`, cancelling the one in flight
pub async fn take_latest(
    stream: &mut ActionStream,
    action_type: &str,
    task: EffectTask,
    survivors: &Survivors,
) -> Result<(), EffectError> {
    let mut running = Running::new(action_type, survivors);
    loop {
        tokio::select! {
            next = stream.next_matching(action_type) => match next {
                Some(action) => {
                    running.cancel_all(CancelReason::Superseded);
                    running.spawn(&task, action);
                }
                None => break,
            },
            Some(outcome) = running.next_finished(), if !running.is_empty() => {
                running.check(outcome)?;
            }
        }
    }
    running.drain().await
}

/// Run `task` for an action of `action_type` unless an instance is still running
pub async fn take_leading(
    stream: &mut ActionStream,
    action_type: &str,
    task: EffectTask,
    survivors: &Survivors,
) -> Result<(), EffectError> {
    let mut running = Running::new(action_type, survivors);
    loop {
        tokio::select! {
            next = stream.next_matching(action_type) => match next {
                Some(action) if running.is_empty() => running.spawn(&task, action),
                Some(action) => refuse(&action, CancelReason::Dropped),
                None => break,
            },
            Some(outcome) = running.next_finished(), if !running.is_empty() => {
                running.check(outcome)?;
            }
        }
    }
    running.drain().await
}

/// Run `task` once `window` passes without a new action of `action_type`.
///
/// A pending action still waiting when the stream ends is run before returning.
pub async fn debounce(
    stream: &mut ActionStream,
    action_type: &str,
    window: Duration,
    task: EffectTask,
    survivors: &Survivors,
) -> Result<(), EffectError> {
    let mut running = Running::new(action_type, survivors);
    let mut waiting: Option<Action> = None;
    let timer = time::sleep(window);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            next = stream.next_matching(action_type) => match next {
                Some(action) => {
                    if let Some(replaced) = waiting.replace(action) {
                        refuse(&replaced, CancelReason::Debounced);
                    }
                    timer.as_mut().reset(Instant::now() + window);
                }
                None => break,
            },
            () = &mut timer, if waiting.is_some() => {
                if let Some(action) = waiting.take() {
                    running.spawn(&task, action);
                }
            }
            Some(outcome) = running.next_finished(), if !running.is_empty() => {
                running.check(outcome)?;
            }
        }
    }

    if let Some(action) = waiting.take() {
        running.spawn(&task, action);
    }
    running.drain().await
}

/// Run `task` at most once per `window`.
///
/// The first action runs immediately; the newest action arriving inside the
/// window runs when it closes, replacing any older buffered one.
pub async fn throttle(
    stream: &mut ActionStream,
    action_type: &str,
    window: Duration,
    task: EffectTask,
    survivors: &Survivors,
) -> Result<(), EffectError> {
    let mut running = Running::new(action_type, survivors);
    let mut buffered: Option<Action> = None;
    let mut window_open = false;
    let timer = time::sleep(window);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            next = stream.next_matching(action_type) => match next {
                Some(action) if !window_open => {
                    running.spawn(&task, action);
                    window_open = true;
                    timer.as_mut().reset(Instant::now() + window);
                }
                Some(action) => {
                    if let Some(replaced) = buffered.replace(action) {
                        refuse(&replaced, CancelReason::Throttled);
                    }
                }
                None => break,
            },
            () = &mut timer, if window_open => match buffered.take() {
                Some(action) => {
                    running.spawn(&task, action);
                    timer.as_mut().reset(Instant::now() + window);
                }
                None => window_open = false,
            },
            Some(outcome) = running.next_finished(), if !running.is_empty() => {
                running.check(outcome)?;
            }
        }
    }

    if let Some(action) = buffered.take() {
        running.spawn(&task, action);
    }
    running.drain().await
}
