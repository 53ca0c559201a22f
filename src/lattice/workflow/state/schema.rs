// SPDX-License-Identifier: MIT

//! State schema definitions

use crate::adk::error::{LatticeError, StateError, WorkflowError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Schema defining the workflow state structure
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct StateSchema {
    /// Field definitions
    #[serde(flatten)]
    pub fields: HashMap<String, StateFieldDef>,
}

/// Definition of a single state field
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StateFieldDef {
    /// Type of the field
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Reducer for merging values
    #[serde(default)]
    pub reducer: ReducerType,
    /// Default value
    pub default: Option<Value>,
}

/// Supported field types
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
    Object,
    /// Accepts every JSON value
    Any,
}

impl FieldType {
    /// True when `value` may be stored in a field of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Any => true,
        }
    }

    /// Type name of an arbitrary JSON value
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
            FieldType::Object => "object",
            FieldType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Reducer types for merging values into state
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReducerType {
    /// Replace the value (default)
    #[default]
    Overwrite,
    /// Append to array
    Append,
    /// Keep maximum value
    Max,
    /// Keep minimum value
    Min,
    /// Shallow merge objects
    Merge,
}

impl ReducerType {
    /// Field types this reducer can ever apply to
    fn supports(&self, field_type: FieldType) -> bool {
        match (self, field_type) {
            (ReducerType::Overwrite, _) | (_, FieldType::Any) => true,
            (ReducerType::Append, FieldType::Array) => true,
            (ReducerType::Max | ReducerType::Min, FieldType::Number) => true,
            (ReducerType::Merge, FieldType::Object) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ReducerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReducerType::Overwrite => "overwrite",
            ReducerType::Append => "append",
            ReducerType::Max => "max",
            ReducerType::Min => "min",
            ReducerType::Merge => "merge",
        };
        f.write_str(name)
    }
}

impl StateSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema of a chat conversation: a single appended `messages` list
    pub fn messages() -> Self {
        Self::new().append("messages")
    }

    /// Declare an overwrite field of `field_type`
    pub fn field(self, name: &str, field_type: FieldType) -> Self {
        self.with_reducer(name, field_type, ReducerType::Overwrite)
    }

    /// Declare an array field whose updates are appended
    pub fn append(self, name: &str) -> Self {
        self.with_reducer(name, FieldType::Array, ReducerType::Append)
    }

    pub fn with_reducer(mut self, name: &str, field_type: FieldType, reducer: ReducerType) -> Self {
        let default = self.fields.remove(name).and_then(|def| def.default);
        self.fields.insert(
            name.to_string(),
            StateFieldDef {
                field_type,
                reducer,
                default,
            },
        );
        self
    }

    /// Set the initial value of `name`, declaring it as `any` if unknown
    pub fn with_default(mut self, name: &str, value: Value) -> Self {
        self.fields
            .entry(name.to_string())
            .or_insert(StateFieldDef {
                field_type: FieldType::Any,
                reducer: ReducerType::Overwrite,
                default: None,
            })
            .default = Some(value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&StateFieldDef> {
        self.fields.get(name)
    }

    /// Reject schemas no update could ever satisfy
    pub fn validate(&self) -> Result<(), LatticeError> {
        for (name, def) in &self.fields {
            if name.trim().is_empty() {
                return Err(WorkflowError::EmptySchemaField.into());
            }
            if !def.reducer.supports(def.field_type) {
                return Err(StateError::IncompatibleReducer {
                    field: name.clone(),
                    reducer: def.reducer.to_string(),
                    field_type: def.field_type.to_string(),
                }
                .into());
            }
            if let Some(default) = &def.default {
                if !default.is_null() && !def.field_type.accepts(default) {
                    return Err(StateError::TypeMismatch {
                        field: name.clone(),
                        expected: def.field_type.to_string(),
                        found: FieldType::describe(default).to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}
