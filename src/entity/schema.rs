// Copyright 2025 Cowboy AI, LLC.

//! Entity schema graph

use super::DEFAULT_SCOPE;
use crate::errors::{ModelError, ModelResult};
use crate::namespace::{validate_namespace, validate_namespace_value};
use crate::state::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How an entity field relates to other entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Field {
    /// Plain data, stored as-is
    Scalar,
    /// A single nested entity of the named namespace
    OneToOne(String),
    /// A list of nested entities of the named namespace
    OneToMany(String),
}

impl Field {
    /// Parse a declaration: `null`, `"ns"` or `["ns"]`
    pub fn parse(entity: &str, field: &str, declaration: &Value) -> ModelResult<Field> {
        let invalid = |reason: &str| ModelError::InvalidEntityField {
            entity: entity.to_string(),
            field: field.to_string(),
            reason: reason.to_string(),
        };
        match declaration {
            Value::Null => Ok(Field::Scalar),
            Value::String(_) => Ok(Field::OneToOne(validate_namespace_value(declaration)?)),
            Value::Array(items) => match items.as_slice() {
                [single @ Value::String(_)] => {
                    Ok(Field::OneToMany(validate_namespace_value(single)?))
                }
                [_] => Err(invalid("list element must be an entity namespace")),
                _ => Err(invalid("a relation list must hold exactly one entity namespace")),
            },
            other => Err(invalid(&format!(
                "expected null, an entity namespace or a one-element list, got {}",
                other.kind()
            ))),
        }
    }

    /// Namespace of the related entity
    pub fn target(&self) -> Option<&str> {
        match self {
            Field::Scalar => None,
            Field::OneToOne(ns) | Field::OneToMany(ns) => Some(ns),
        }
    }
}

/// One entity type: its namespace, id attribute, relations and secondary scopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityModel {
    namespace: String,
    id_attribute: String,
    fields: IndexMap<String, Field>,
    scopes: Vec<String>,
}

impl EntityModel {
    /// Entity identified by `"id"` with no relations or scopes
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            id_attribute: "id".to_string(),
            fields: IndexMap::new(),
            scopes: Vec::new(),
        }
    }

    /// Attribute holding the id
    pub fn id_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.id_attribute = attribute.into();
        self
    }

    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Declare a nested entity
    pub fn one_to_one(self, name: impl Into<String>, entity: impl Into<String>) -> Self {
        self.field(name, Field::OneToOne(entity.into()))
    }

    /// Declare a list of nested entities
    pub fn one_to_many(self, name: impl Into<String>, entity: impl Into<String>) -> Self {
        self.field(name, Field::OneToMany(entity.into()))
    }

    /// Declare a secondary scope
    pub fn scope(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if name != DEFAULT_SCOPE && !self.scopes.contains(&name) {
            self.scopes.push(name);
        }
        self
    }

    /// Namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Id attribute name
    pub fn id_attr(&self) -> &str {
        &self.id_attribute
    }

    /// Declared fields
    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.fields
    }

    /// Secondary scopes, excluding the default one
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Default scope followed by the secondary ones
    pub fn all_scopes(&self) -> Vec<String> {
        std::iter::once(DEFAULT_SCOPE.to_string())
            .chain(self.scopes.iter().cloned())
            .collect()
    }
}

/// Registry of entity types whose relations all resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySchema {
    entities: IndexMap<String, EntityModel>,
}

impl EntitySchema {
    /// Validate namespaces, uniqueness and relation targets
    pub fn new(entities: Vec<EntityModel>) -> ModelResult<Self> {
        let mut seen = HashSet::new();
        for entity in &entities {
            validate_namespace(&entity.namespace)?;
            if !seen.insert(entity.namespace.clone()) {
                return Err(ModelError::DuplicateNamespace {
                    namespaces: entities.iter().map(|e| e.namespace.clone()).collect(),
                });
            }
        }

        let entities: IndexMap<String, EntityModel> = entities
            .into_iter()
            .map(|entity| (entity.namespace.clone(), entity))
            .collect();

        for entity in entities.values() {
            for target in entity.fields.values().filter_map(Field::target) {
                if !entities.contains_key(target) {
                    return Err(ModelError::UnknownEntity {
                        name: target.to_string(),
                        valid: entities.keys().cloned().collect(),
                    });
                }
            }
        }

        Ok(Self { entities })
    }

    /// Build from a JSON-like declaration list:
    /// `[{"namespace": "articles", "idAttribute": "id", "fields": {"author": "users"}, "scopes": ["byPage"]}]`
    pub fn from_descriptor(descriptor: &Value) -> ModelResult<Self> {
        let items = descriptor.as_array().ok_or_else(|| {
            ModelError::InvalidEntityCommand(format!(
                "schema descriptor must be a list, got {}",
                descriptor.kind()
            ))
        })?;

        let mut entities = Vec::with_capacity(items.len());
        for item in items.iter() {
            let namespace =
                validate_namespace_value(item.get("namespace").unwrap_or(&Value::Null))?;
            let mut entity = EntityModel::new(namespace.clone());

            if let Some(attribute) = item.get("idAttribute").and_then(Value::as_str) {
                entity = entity.id_attribute(attribute);
            }
            if let Some(fields) = item.get("fields").and_then(Value::as_object) {
                for (name, declaration) in fields {
                    let field = Field::parse(&namespace, name, declaration)?;
                    entity = entity.field(name.clone(), field);
                }
            }
            if let Some(scopes) = item.get("scopes").and_then(Value::as_array) {
                for scope in scopes.iter().filter_map(Value::as_str) {
                    entity = entity.scope(scope);
                }
            }
            entities.push(entity);
        }
        Self::new(entities)
    }

    /// Entity declared at `namespace`
    pub fn entity(&self, namespace: &str) -> ModelResult<&EntityModel> {
        self.entities
            .get(namespace)
            .ok_or_else(|| ModelError::UnknownEntity {
                name: namespace.to_string(),
                valid: self.namespaces(),
            })
    }

    /// Fail unless `scope` is the default scope or one `entity` declares
    pub fn check_scope(&self, entity: &EntityModel, scope: &str) -> ModelResult<()> {
        if scope == DEFAULT_SCOPE || entity.scopes.iter().any(|s| s == scope) {
            Ok(())
        } else {
            Err(ModelError::UndefinedScope {
                entity: entity.namespace.clone(),
                scope: scope.to_string(),
                valid: entity.all_scopes(),
            })
        }
    }

    /// Declared entity namespaces
    pub fn namespaces(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }

    /// Declared entities
    pub fn entities(&self) -> impl Iterator<Item = &EntityModel> {
        self.entities.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(null), Field::Scalar ; "scalar")]
    #[test_case(json!("users"), Field::OneToOne("users".into()) ; "one to one")]
    #[test_case(json!(["comments"]), Field::OneToMany("comments".into()) ; "one to many")]
    fn test_field_parse(declaration: serde_json::Value, expected: Field) {
        assert_eq!(
            Field::parse("articles", "f", &Value::from(declaration)).unwrap(),
            expected
        );
    }

    #[test_case(json!(["users", "comments"]) ; "two element list")]
    #[test_case(json!([]) ; "empty list")]
    #[test_case(json!([1]) ; "list of number")]
    #[test_case(json!({"model": "users"}) ; "object")]
    #[test_case(json!(true) ; "boolean")]
    fn test_field_parse_rejects(declaration: serde_json::Value) {
        assert!(matches!(
            Field::parse("articles", "f", &Value::from(declaration)),
            Err(ModelError::InvalidEntityField { .. })
        ));
    }

    #[test]
    fn test_schema_rejects_unknown_targets() {
        let articles = EntityModel::new("articles").one_to_one("author", "users");
        let err = EntitySchema::new(vec![articles]).unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownEntity {
                name: "users".into(),
                valid: vec!["articles".into()],
            }
        );
    }

    #[test]
    fn test_descriptor_builds_schema() {
        let schema = EntitySchema::from_descriptor(&Value::from(json!([
            {"namespace": "articles", "fields": {"author": "users", "comments": ["comments"], "title": null}, "scopes": ["byPage"]},
            {"namespace": "users", "idAttribute": "uid"},
            {"namespace": "comments", "fields": {"commenter": "users"}}
        ])))
        .unwrap();

        let articles = schema.entity("articles").unwrap();
        assert_eq!(articles.scopes(), ["byPage".to_string()]);
        assert_eq!(articles.fields()["comments"], Field::OneToMany("comments".into()));
        assert_eq!(schema.entity("users").unwrap().id_attr(), "uid");
        assert!(schema.check_scope(articles, "byPage").is_ok());
        assert!(matches!(
            schema.check_scope(articles, "byAuthor"),
            Err(ModelError::UndefinedScope { .. })
        ));
    }

    #[test]
    fn test_descriptor_namespace_must_be_text() {
        let descriptor = Value::from(json!([{"namespace": 3}]));
        let err = EntitySchema::from_descriptor(&descriptor).unwrap_err();
        assert_eq!(
            err,
            ModelError::NonStringNamespace {
                found: "number".into()
            }
        );
    }
}
