// SPDX-License-Identifier: MIT

use crate::adk::error::LatticeError;
use async_trait::async_trait;
use jsonschema::JSONSchema;
use schemars::JsonSchema;
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;

/// Trait for tools that can be called by agents.
///
/// # Optimization Notes
/// - `name()` and `description()` return `&str` to avoid allocation on every call
/// - `schema()` returns `&Value` to avoid cloning the schema on every access
/// - Implementations should store these values in struct fields
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (must be unique within an agent's tool set)
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's input parameters
    fn schema(&self) -> &Value;

    /// Check `input` against [`Tool::schema`] before execution
    fn validate(&self, input: &Value) -> Result<(), LatticeError> {
        validate_against(self.schema(), input).map_err(|message| LatticeError::InvalidArguments {
            tool: self.name().to_string(),
            message,
        })
    }

    /// Execute the tool with the given input and return the result
    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>>;
}

/// JSON schema for `T`, trimmed of the meta keys providers reject
pub fn schema_for<T: JsonSchema>() -> Value {
    let root = schemars::schema_for!(T);
    let mut schema = serde_json::to_value(root).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
    }
    schema
}

/// A JSON schema compiled once and checked many times
#[derive(Clone)]
pub struct SchemaValidator {
    compiled: Arc<Result<JSONSchema, String>>,
}

impl SchemaValidator {
    pub fn new(schema: &Value) -> Self {
        let compiled = JSONSchema::compile(schema).map_err(|e| format!("invalid schema: {}", e));
        Self {
            compiled: Arc::new(compiled),
        }
    }

    /// Check `instance`, joining every violation into one message
    pub fn validate(&self, instance: &Value) -> Result<(), String> {
        let compiled = self.compiled.as_ref().as_ref().map_err(Clone::clone)?;
        let result = compiled.validate(instance).map_err(|errors| {
            errors
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        });
        result
    }
}

/// One-off check of `instance` against `schema`
pub fn validate_against(schema: &Value, instance: &Value) -> Result<(), String> {
    SchemaValidator::new(schema).validate(instance)
}
