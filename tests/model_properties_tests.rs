// Copyright 2025 Cowboy AI, LLC.

use cim_model::namespace::{is_qualified_action_type, validate_namespace};
use cim_model::{Action, ModelError, ModelOptions, ModelSettings, Value};
use proptest::prelude::*;

const NAMESPACE: &str = "[A-Za-z0-9]{1,6}(\\.[A-Za-z0-9]{1,6}){0,3}";
const IDENTIFIER: &str = "[A-Za-z_][A-Za-z0-9_]{0,8}";

proptest! {
    #[test]
    fn well_formed_namespaces_build(namespace in NAMESPACE) {
        prop_assert!(validate_namespace(&namespace).is_ok());
        prop_assert!(ModelOptions::new(namespace.clone()).build().is_ok());
    }

    #[test]
    fn namespaces_with_other_characters_are_rejected(
        head in "[a-z]{1,4}",
        bad in "[-_ /:#]",
        tail in "[a-z]{0,4}"
    ) {
        let namespace = format!("{head}{bad}{tail}");
        prop_assert_eq!(
            validate_namespace(&namespace),
            Err(ModelError::InvalidNamespace { namespace })
        );
    }

    #[test]
    fn action_types_qualify_once(namespace in NAMESPACE, name in IDENTIFIER) {
        let model = ModelOptions::new(namespace.clone())
            .reducer(name.clone(), |_, _| {})
            .settings(ModelSettings::unchecked())
            .build()
            .unwrap();

        let action_type = model.action_type(&name);
        prop_assert_eq!(&action_type, &format!("{namespace}.{name}"));
        prop_assert!(is_qualified_action_type(&action_type));
        prop_assert_eq!(model.action_type(&action_type), action_type.clone());
        prop_assert_eq!(model.action_types().get(&name), Some(&action_type));
    }

    #[test]
    fn unrelated_actions_keep_state_identity(name in IDENTIFIER, count in 0i64..1000) {
        let model = ModelOptions::new("counter")
            .state(serde_json::json!({ "count": count }))
            .reducer("increment", |draft, _| {
                draft.update("count", |c| Value::from(c.as_i64().unwrap_or(0) + 1));
            })
            .settings(ModelSettings::unchecked())
            .build()
            .unwrap();

        let action = Action::new(format!("other.{name}"), Value::Null).unwrap();
        let next = (model.reducer_function())(model.state(), &action);
        prop_assert!(next.ptr_eq(model.state()));
    }
}
