// Copyright 2025 Cowboy AI, LLC.

mod common;

use cim_model::{
    bind_action_creators, connect_to_store, ConnectOptions, EntityModel, EntitySchema,
    ModelSettings, Value, DEFAULT_SCOPE,
};
use common::TestStore;
use pretty_assertions::assert_eq;
use serde_json::json;

fn schema() -> EntitySchema {
    EntitySchema::from_descriptor(&Value::from(json!([
        {"namespace": "articles", "fields": {"author": "users", "comments": ["comments"]}, "scopes": ["byPage"]},
        {"namespace": "users"},
        {"namespace": "comments", "fields": {"commenter": "users"}}
    ])))
    .unwrap()
}

fn page() -> serde_json::Value {
    json!([
        {
            "id": "123",
            "author": {"id": "1", "name": "Paul"},
            "title": "My awesome blog post",
            "comments": [{"id": "324", "commenter": {"id": "2", "name": "Nicole"}}]
        },
        {
            "id": "124",
            "author": {"id": "2", "name": "Nicole"},
            "title": "A reply",
            "comments": []
        }
    ])
}

#[test]
fn entity_model_round_trips_through_a_store() {
    let model = schema().into_model("entities", ModelSettings::default()).unwrap();
    let store = TestStore::new(&[model.clone()]);
    let actions = bind_action_creators(&model.action_creators(), store.dispatcher());

    actions
        .call(
            "set",
            json!({"entity": "articles", "scope": "byPage", "scopeId": "1", "data": page()}),
        )
        .unwrap();

    let state = store.snapshot();
    assert_eq!(
        state.get_dotted("entities.articles.byPage.1").unwrap().to_json(),
        json!(["123", "124"])
    );
    assert_eq!(
        state.get_dotted("entities.users.byId").unwrap().to_json(),
        json!({"1": {"id": "1", "name": "Paul"}, "2": {"id": "2", "name": "Nicole"}})
    );

    let connector = connect_to_store(&[model], ConnectOptions::new()).unwrap();
    let selected = connector
        .selector_tree(&state)
        .select(
            "entities",
            "select",
            &Value::from(json!({"entity": "articles", "scope": "byPage", "scopeId": "1"})),
        )
        .unwrap();
    assert_eq!(selected.to_json(), page());
}

#[test]
fn clearing_a_secondary_scope_keeps_the_tables() {
    let model = schema().into_model("entities", ModelSettings::default()).unwrap();
    let store = TestStore::new(&[model.clone()]);
    let actions = bind_action_creators(&model.action_creators(), store.dispatcher());

    actions
        .call(
            "set",
            json!({"entity": "articles", "scope": "byPage", "scopeId": "1", "data": page()}),
        )
        .unwrap();
    let before = store.snapshot();
    actions
        .call("clear", json!({"entity": "articles", "scope": "byPage"}))
        .unwrap();
    let after = store.snapshot();

    assert_eq!(after.get_dotted("entities.articles.byPage").unwrap().to_json(), json!({}));
    assert!(after
        .get_dotted("entities.articles.byId")
        .unwrap()
        .ptr_eq(before.get_dotted("entities.articles.byId").unwrap()));
    assert!(after
        .get_dotted("entities.users")
        .unwrap()
        .ptr_eq(before.get_dotted("entities.users").unwrap()));
}

#[test]
fn removing_an_entity_drops_it_from_every_page() {
    let schema = EntitySchema::new(vec![
        EntityModel::new("users").scope("byTeam"),
    ])
    .unwrap();
    let model = schema.into_model("entities", ModelSettings::default()).unwrap();
    let store = TestStore::new(&[model.clone()]);
    let actions = bind_action_creators(&model.action_creators(), store.dispatcher());

    for (team, members) in [("red", json!([{"id": 1}, {"id": 2}])), ("blue", json!([{"id": 2}]))] {
        actions
            .call(
                "set",
                json!({"entity": "users", "scope": "byTeam", "scopeId": team, "data": members}),
            )
            .unwrap();
    }
    actions
        .call("remove", json!({"entity": "users", "scope": DEFAULT_SCOPE, "scopeId": 2}))
        .unwrap();

    let state = store.snapshot();
    assert_eq!(
        state.get_dotted("entities.users.byTeam").unwrap().to_json(),
        json!({"red": [1], "blue": []})
    );
    assert_eq!(
        state.get_dotted("entities.users.byId").unwrap().to_json(),
        json!({"1": {"id": 1}})
    );
}
