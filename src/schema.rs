//! JSON schema validation of request payloads.
//!
//! A payload is checked in two stages. The structure (required fields, types and
//! unknown fields) is checked against the JSON schema generated from the payload type.
//! Field rules declared with [`validator`] (lengths, ranges) are checked on the
//! deserialized value afterwards. schemars copies those rules into the schema as
//! `minLength`, `minimum` and friends; they are stripped from the structural schema.

use anyhow::Context;
use jsonschema::{Draft, JSONSchema};
use schemars::{
    gen::SchemaSettings,
    schema::{RootSchema, SchemaObject},
    schema_for,
    visit::{visit_schema_object, Visitor},
    JsonSchema,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationErrors};

/// A request body that is validated against its own JSON schema.
pub trait Payload: DeserializeOwned + JsonSchema + Validate {
    /// Fields that must not be present at all.
    ///
    /// These are checked before the schema and rejected with a plain `Bad Request`.
    const FORBIDDEN_FIELDS: &'static [&'static str] = &[];

    /// Returns the first forbidden field present in `fields`.
    fn forbidden_field(fields: &serde_json::Map<String, Value>) -> Option<&'static str> {
        Self::FORBIDDEN_FIELDS
            .iter()
            .copied()
            .find(|field| fields.contains_key(*field))
    }
}

/// A compiled JSON schema.
pub struct SchemaValidator {
    schema: JSONSchema,
}

impl SchemaValidator {
    /// Compiles the structural schema of `T`.
    pub fn of<T: JsonSchema>() -> anyhow::Result<Self> {
        let root = structure_of::<T>();
        let value = serde_json::to_value(&root).context("Failed to serialize schema")?;

        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&value)
            .map_err(|err| anyhow::anyhow!("Failed to compile schema: {err}"))?;

        Ok(Self { schema })
    }

    /// Returns the violations of `instance` in the order they were found.
    ///
    /// An empty list means the instance is valid.
    pub fn violations(&self, instance: &Value) -> Vec<String> {
        match self.schema.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| {
                    let location = location(error.instance_path.clone().into_vec());

                    format!("{location}: {error}")
                })
                .collect(),
        }
    }
}

/// Removes string and number bounds from every schema object.
#[derive(Debug, Clone)]
struct WithoutFieldRules;

impl Visitor for WithoutFieldRules {
    fn visit_schema_object(&mut self, schema: &mut SchemaObject) {
        schema.string = None;
        schema.number = None;

        visit_schema_object(self, schema);
    }
}

fn structure_of<T: JsonSchema>() -> RootSchema {
    SchemaSettings::draft07()
        .with_visitor(WithoutFieldRules)
        .into_generator()
        .into_root_schema_for::<T>()
}

/// Formats the violations of field rules, sorted by field name.
pub fn field_violations(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|(a, _), (b, _)| a.cmp(b));

    fields
        .into_iter()
        .flat_map(|(field, errors)| {
            let location = location(vec![field.to_string()]);

            errors.iter().map(move |error| {
                let description = match &error.message {
                    Some(message) => message.to_string(),
                    None => error.code.to_string(),
                };

                format!("{location}: {description}")
            })
        })
        .collect()
}

/// Expected schema of `T` as YAML.
pub fn expected_schema<T: JsonSchema>() -> anyhow::Result<String> {
    serde_yaml::to_string(&schema_for!(T)).context("Failed to serialize schema")
}

fn location(path: Vec<String>) -> String {
    std::iter::once("instance".to_string())
        .chain(path)
        .collect::<Vec<_>>()
        .join(".")
}
