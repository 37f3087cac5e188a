// Copyright 2025 Cowboy AI, LLC.

//! Broadcast of dispatched actions to effect watchers

use crate::action::Action;
use crate::dispatch::Dispatch;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{trace, warn};

/// Fan-out of every dispatched action to every subscribed watcher
#[derive(Debug, Clone)]
pub struct ActionBus {
    sender: broadcast::Sender<Action>,
}

impl ActionBus {
    /// Bus buffering up to `capacity` actions per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Stream of actions published after this call
    pub fn subscribe(&self) -> ActionStream {
        ActionStream {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish to current subscribers; returns how many received it
    pub fn publish(&self, action: Action) -> usize {
        trace!(action_type = %action.action_type, "publishing action");
        self.sender.send(action).unwrap_or(0)
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::new(crate::config::RuntimeConfig::default().action_channel_capacity)
    }
}

impl Dispatch for ActionBus {
    fn dispatch(&self, action: Action) {
        self.publish(action);
    }
}

/// One watcher's view of the action bus
#[derive(Debug)]
pub struct ActionStream {
    receiver: broadcast::Receiver<Action>,
}

impl ActionStream {
    /// Next action, or `None` once every bus handle is gone.
    ///
    /// A subscriber that falls behind loses the oldest actions and keeps going.
    pub async fn next(&mut self) -> Option<Action> {
        loop {
            match self.receiver.recv().await {
                Ok(action) => return Some(action),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "action stream lagged; oldest actions were dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next action of `action_type`, skipping everything else.
    ///
    /// Cancel safe: an action is consumed only when it is returned or skipped.
    pub async fn next_matching(&mut self, action_type: &str) -> Option<Action> {
        loop {
            let action = self.next().await?;
            if action.action_type == action_type {
                return Some(action);
            }
        }
    }
}
