// Copyright 2025 Cowboy AI, LLC.

//! Entity schema exposed as a regular [`Model`]

use super::schema::EntitySchema;
use super::selectors::EntitySelectors;
use super::DEFAULT_SCOPE;
use crate::config::{ModelSettings, RuntimeConfig};
use crate::errors::{ModelError, ModelResult};
use crate::model::{Model, ModelOptions};
use crate::state::{produce, Draft, Value};
use std::sync::Arc;
use tracing::warn;

/// Target of an entity reducer or selector, read from a payload or props
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCommand {
    /// Entity namespace
    pub entity: String,
    /// Scope, the default one when omitted
    pub scope: String,
    /// Entity id (default scope) or list key (secondary scope)
    pub scope_id: Option<String>,
}

impl EntityCommand {
    /// Parse `{entity, scope?, scopeId?}`
    pub fn parse(payload: &Value) -> ModelResult<Self> {
        let entity = payload
            .get("entity")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ModelError::InvalidEntityCommand("\"entity\" must name an entity".to_string())
            })?;
        let scope = match payload.get("scope") {
            None | Some(Value::Null) => DEFAULT_SCOPE,
            Some(scope) => scope.as_str().ok_or_else(|| {
                ModelError::InvalidEntityCommand(format!(
                    "\"scope\" must be a string, got {}",
                    scope.kind()
                ))
            })?,
        };
        let scope_id = match payload.get("scopeId") {
            None | Some(Value::Null) => None,
            Some(id) => Some(id.as_key().ok_or_else(|| {
                ModelError::InvalidEntityCommand(format!(
                    "\"scopeId\" must be a string or number, got {}",
                    id.kind()
                ))
            })?),
        };
        Ok(Self {
            entity: entity.to_string(),
            scope: scope.to_string(),
            scope_id,
        })
    }

    fn required_scope_id(&self) -> ModelResult<&str> {
        self.scope_id.as_deref().ok_or_else(|| {
            ModelError::InvalidEntityCommand(format!(
                "removing from \"{}\" of \"{}\" needs a scopeId",
                self.scope, self.entity
            ))
        })
    }
}

impl EntitySchema {
    /// A model at `namespace` holding every entity's tables.
    ///
    /// Reducers `set`, `remove` and `clear` take `{entity, scope, scopeId, data}`;
    /// a payload they cannot apply is logged and leaves the state unchanged.
    /// Selector `select` takes the same fields as props.
    pub fn into_model(self, namespace: &str, settings: ModelSettings) -> ModelResult<Model> {
        let schema = Arc::new(self);
        let selectors = Arc::new(EntitySelectors::new(
            Arc::clone(&schema),
            RuntimeConfig::default().selector_cache_size,
        ));

        let set = Arc::clone(&schema);
        let remove = Arc::clone(&schema);
        let clear = Arc::clone(&schema);

        ModelOptions::new(namespace)
            .state(schema.initial_state())
            .reducer("set", move |draft, payload| {
                apply(draft, payload, "set", |draft, command| {
                    let data = payload.get("data").unwrap_or(&Value::Null);
                    set.set(
                        draft,
                        &command.entity,
                        &command.scope,
                        command.scope_id.as_deref(),
                        data,
                    )
                    .map(drop)
                })
            })
            .reducer("remove", move |draft, payload| {
                apply(draft, payload, "remove", |draft, command| {
                    let scope_id = command.required_scope_id()?;
                    remove.remove(draft, &command.entity, &command.scope, scope_id)
                })
            })
            .reducer("clear", move |draft, payload| {
                apply(draft, payload, "clear", |draft, command| {
                    clear.clear(draft, &command.entity, &command.scope)
                })
            })
            .selector_fn("select", move |state, props, _| {
                let selected = EntityCommand::parse(props).and_then(|command| {
                    selectors.select(
                        state,
                        &command.entity,
                        &command.scope,
                        command.scope_id.as_deref(),
                    )
                });
                selected.unwrap_or_else(|err| {
                    warn!(error = %err, "entity selection failed");
                    Value::Null
                })
            })
            .settings(settings)
            .build()
    }
}

/// Run `command` against a scratch draft and commit only on success
fn apply<F>(draft: &mut Draft<'_>, payload: &Value, reducer: &str, command: F)
where
    F: FnOnce(&mut Draft<'_>, &EntityCommand) -> ModelResult<()>,
{
    let parsed = match EntityCommand::parse(payload) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(reducer, error = %err, "entity command rejected");
            return;
        }
    };

    let mut failure = None;
    let next = produce(draft.value(), |scratch| {
        if let Err(err) = command(scratch, &parsed) {
            failure = Some(err);
        }
    });
    match failure {
        Some(err) => {
            warn!(reducer, entity = %parsed.entity, error = %err, "entity command rejected");
        }
        None if next.ptr_eq(draft.value()) => {}
        None => draft.replace(next),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::entity::EntityModel;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn model() -> Model {
        EntitySchema::new(vec![
            EntityModel::new("articles")
                .one_to_one("author", "users")
                .scope("byPage"),
            EntityModel::new("users"),
        ])
        .unwrap()
        .into_model("entities", ModelSettings::unchecked())
        .unwrap()
    }

    fn reduce(model: &Model, state: &Value, name: &str, payload: serde_json::Value) -> Value {
        let action = Action::new(model.action_type(name), Value::from(payload)).unwrap();
        (model.reducer_function())(state, &action)
    }

    #[test]
    fn test_command_parse() {
        let command =
            EntityCommand::parse(&Value::from(json!({"entity": "users", "scopeId": 4}))).unwrap();
        assert_eq!(
            command,
            EntityCommand {
                entity: "users".into(),
                scope: DEFAULT_SCOPE.into(),
                scope_id: Some("4".into()),
            }
        );
        assert!(matches!(
            EntityCommand::parse(&Value::from(json!({"scope": "byPage"}))),
            Err(ModelError::InvalidEntityCommand(_))
        ));
    }

    #[test]
    fn test_reducers_and_selector() {
        let model = model();
        let state = reduce(
            &model,
            model.state(),
            "set",
            json!({
                "entity": "articles",
                "scope": "byPage",
                "scopeId": 1,
                "data": [{"id": "a1", "author": {"id": "u1", "name": "Paul"}}]
            }),
        );

        let props = Value::from(json!({"entity": "articles", "scope": "byPage", "scopeId": "1"}));
        assert_eq!(
            model.select("select", &state, &props, &Value::Null).unwrap().to_json(),
            json!([{"id": "a1", "author": {"id": "u1", "name": "Paul"}}])
        );

        let state = reduce(
            &model,
            &state,
            "remove",
            json!({"entity": "users", "scopeId": "u1"}),
        );
        assert!(state.get_path(["users", "byId", "u1"]).is_none());

        let payload = json!({"entity": "articles", "scope": "byPage"});
        let state = reduce(&model, &state, "clear", payload);
        assert_eq!(state.get_path(["articles", "byPage"]).unwrap().to_json(), json!({}));
    }

    #[test]
    fn test_rejected_command_leaves_state_alone() {
        let model = model();
        let before = model.state().clone();
        let after = reduce(
            &model,
            &before,
            "set",
            json!({"entity": "articles", "scope": "byPage", "data": [{"id": "a1"}]}),
        );
        assert!(after.ptr_eq(&before));

        let after = reduce(&model, &before, "remove", json!({"entity": "ghosts", "scopeId": "1"}));
        assert!(after.ptr_eq(&before));
    }

    #[test]
    fn test_bad_selector_props_yield_null() {
        let model = model();
        let props = Value::from(json!({"entity": "articles", "scope": "byAuthor"}));
        assert_eq!(
            model.select("select", model.state(), &props, &Value::Null).unwrap(),
            Value::Null
        );
    }
}
