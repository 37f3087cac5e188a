// Copyright 2025 Cowboy AI, LLC.

//! Action codec
//!
//! An [`Action`] is `{type, payload, internals}`. The payload is always an
//! object. `internals` carries the resolve/reject pair that lets whoever
//! dispatched an effect action await its outcome through a [`Completion`].

use crate::errors::{CancelReason, EffectError, ModelError, ModelResult};
use crate::state::Value;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Callback settling a completion with the effect's return value
pub type ResolveFn = Arc<dyn Fn(Value) + Send + Sync>;

/// Callback settling a completion with the effect's failure
pub type RejectFn = Arc<dyn Fn(EffectError) + Send + Sync>;

/// Completion callbacks attached to an action
#[derive(Clone, Default)]
pub struct Internals {
    /// Called with the effect's return value
    pub resolve: Option<ResolveFn>,
    /// Called with the effect's failure
    pub reject: Option<RejectFn>,
}

impl Internals {
    /// Internals from explicit callbacks
    pub fn new(
        resolve: impl Fn(Value) + Send + Sync + 'static,
        reject: impl Fn(EffectError) + Send + Sync + 'static,
    ) -> Self {
        Self {
            resolve: Some(Arc::new(resolve)),
            reject: Some(Arc::new(reject)),
        }
    }

    /// Internals whose callbacks do nothing
    pub fn noop() -> Self {
        Self::new(|_| {}, |_| {})
    }

    /// Internals wired to a fresh pending [`Completion`].
    ///
    /// Only the first settle reaches the completion; later calls are ignored.
    pub fn pending(action_type: impl Into<String>) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Some(tx)));
        let resolve_slot = Arc::clone(&slot);
        let internals = Self {
            resolve: Some(Arc::new(move |value| {
                if let Some(tx) = resolve_slot.lock().take() {
                    let _ = tx.send(Ok(value));
                }
            })),
            reject: Some(Arc::new(move |err| {
                if let Some(tx) = slot.lock().take() {
                    let _ = tx.send(Err(err));
                }
            })),
        };
        let completion = Completion {
            state: CompletionState::Pending {
                action_type: action_type.into(),
                rx,
            },
        };
        (internals, completion)
    }

    /// True when neither callback is present
    pub fn is_empty(&self) -> bool {
        self.resolve.is_none() && self.reject.is_none()
    }

    /// Settle with a value, if a resolve callback is present
    pub fn resolve(&self, value: Value) {
        if let Some(resolve) = &self.resolve {
            resolve(value);
        }
    }

    /// Settle with a failure, if a reject callback is present
    pub fn reject(&self, err: EffectError) {
        if let Some(reject) = &self.reject {
            reject(err);
        }
    }

    /// Reject with [`ModelError::CancelledEffect`]
    pub fn cancel(&self, action_type: &str, reason: CancelReason) {
        self.reject(EffectError::from(ModelError::CancelledEffect {
            action_type: action_type.to_string(),
            reason,
        }));
    }
}

impl fmt::Debug for Internals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Internals")
            .field("resolve", &self.resolve.is_some())
            .field("reject", &self.reject.is_some())
            .finish()
    }
}

/// A dispatched intent: reducer input or effect trigger
#[derive(Clone, Serialize)]
pub struct Action {
    /// Fully-qualified action type, `<namespace>.<name>`
    #[serde(rename = "type")]
    pub action_type: String,
    /// Key-value payload
    pub payload: Value,
    /// Completion callbacks; `None` for raw fire-and-forget actions
    #[serde(skip)]
    pub internals: Option<Internals>,
}

impl Action {
    /// Raw action without internals
    pub fn new(action_type: impl Into<String>, payload: impl Into<Value>) -> ModelResult<Self> {
        build_action(action_type, payload.into(), None)
    }

    /// Payload field
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("type", &self.action_type)
            .field("payload", &self.payload.to_json())
            .field("internals", &self.internals)
            .finish()
    }
}

/// Build an action, rejecting payloads that are not key-value records.
///
/// A `Null` payload becomes an empty object.
pub fn build_action(
    action_type: impl Into<String>,
    payload: Value,
    internals: Option<Internals>,
) -> ModelResult<Action> {
    let action_type = action_type.into();
    let payload = match payload {
        Value::Null => Value::object(),
        Value::Object(_) => payload,
        other => {
            return Err(ModelError::InvalidPayload {
                action_type,
                found: other.kind().to_string(),
            })
        }
    };
    Ok(Action {
        action_type,
        payload,
        internals,
    })
}

/// Outcome of a dispatched action, awaitable by the dispatcher
pub struct Completion {
    state: CompletionState,
}

enum CompletionState {
    Pending {
        action_type: String,
        rx: oneshot::Receiver<Result<Value, EffectError>>,
    },
    Ready(Option<Result<Value, EffectError>>),
}

impl Completion {
    /// Completion that is already settled
    pub fn ready(outcome: Result<Value, EffectError>) -> Self {
        Self {
            state: CompletionState::Ready(Some(outcome)),
        }
    }

    /// Completion already resolved with `Null`
    pub fn resolved() -> Self {
        Self::ready(Ok(Value::Null))
    }
}

impl Future for Completion {
    type Output = Result<Value, EffectError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            CompletionState::Pending { action_type, rx } => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
                Poll::Ready(Err(_)) => Poll::Ready(Err(EffectError::from(
                    ModelError::CancelledEffect {
                        action_type: action_type.clone(),
                        reason: CancelReason::Abandoned,
                    },
                ))),
                Poll::Pending => Poll::Pending,
            },
            CompletionState::Ready(outcome) => {
                Poll::Ready(outcome.take().unwrap_or(Ok(Value::Null)))
            }
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            CompletionState::Pending { action_type, .. } => {
                f.debug_tuple("Completion::Pending").field(action_type).finish()
            }
            CompletionState::Ready(_) => f.write_str("Completion::Ready"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_build_action_defaults_payload_to_object() {
        let action = build_action("todos.add", Value::Null, None).unwrap();
        assert_eq!(action.action_type, "todos.add");
        assert_eq!(action.payload, Value::object());
        assert!(action.internals.is_none());
    }

    #[test]
    fn test_build_action_rejects_non_records() {
        for payload in [json!([1, 2]), json!(3), json!("text"), json!(true)] {
            let err = build_action("todos.add", Value::from(payload), None).unwrap_err();
            assert!(matches!(err, ModelError::InvalidPayload { .. }));
        }
    }

    #[test]
    fn test_action_serializes_without_internals() {
        let action = build_action(
            "todos.add",
            Value::from(json!({"title": "x"})),
            Some(Internals::noop()),
        )
        .unwrap();
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "todos.add", "payload": {"title": "x"}})
        );
    }

    #[test]
    fn test_pending_completion_settles_once() {
        let (internals, completion) = Internals::pending("todos.fetch");
        let mut completion = task::spawn(completion);
        assert_pending!(completion.poll());

        internals.resolve(Value::from("done"));
        internals.reject(EffectError::from(ModelError::EmptyNamespace));

        let outcome = assert_ready!(completion.poll());
        assert_eq!(outcome.unwrap(), Value::from("done"));
    }

    #[test]
    fn test_dropped_internals_abandon_completion() {
        let (internals, completion) = Internals::pending("todos.fetch");
        let mut completion = task::spawn(completion);
        drop(internals);

        let err = assert_ready!(completion.poll()).unwrap_err();
        assert!(matches!(
            err.model_error(),
            Some(ModelError::CancelledEffect {
                reason: CancelReason::Abandoned,
                ..
            })
        ));
    }
}
