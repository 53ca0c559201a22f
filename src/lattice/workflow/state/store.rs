// SPDX-License-Identifier: MIT

//! Runtime state storage for workflow execution

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::schema::{FieldType, ReducerType, StateSchema};
use crate::adk::error::{LatticeError, StateError};
use crate::adk::model::Message;

/// Partial state produced by a node.
///
/// Keys keep insertion order; setting a key twice replaces the first value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    entries: Vec<(String, Value)>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StateUpdate::insert`]
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Update appending `messages` to the `messages` field
    pub fn messages(messages: Vec<Message>) -> Self {
        Self::new().set("messages", json!(messages))
    }

    /// Build an update from a JSON object
    pub fn from_json(value: Value) -> Result<Self, LatticeError> {
        match value {
            Value::Object(map) => Ok(Self {
                entries: map.into_iter().collect(),
            }),
            other => Err(LatticeError::other(format!(
                "state update must be a JSON object, got {}",
                FieldType::describe(&other)
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.entries.iter().cloned().collect())
    }
}

impl IntoIterator for StateUpdate {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Runtime workflow state with reducer support
#[derive(Debug, Clone)]
pub struct WorkflowState {
    schema: Arc<StateSchema>,
    /// Current state values
    fields: HashMap<String, Value>,
}

impl WorkflowState {
    /// Create a new WorkflowState from a schema, filled with its defaults
    pub fn new(schema: Arc<StateSchema>) -> Self {
        let fields = schema
            .fields
            .iter()
            .filter_map(|(name, def)| def.default.clone().map(|d| (name.clone(), d)))
            .collect();
        Self { schema, fields }
    }

    /// Fresh state with `update` merged over the defaults
    pub fn from_update(schema: Arc<StateSchema>, update: StateUpdate) -> Result<Self, StateError> {
        let mut state = Self::new(schema);
        state.merge(update)?;
        Ok(state)
    }

    pub fn schema(&self) -> &Arc<StateSchema> {
        &self.schema
    }

    /// Merge `update` in place.
    ///
    /// Every field is reduced before any is written, so a failing field
    /// leaves the state untouched.
    pub fn merge(&mut self, update: StateUpdate) -> Result<(), StateError> {
        let mut reduced = Vec::with_capacity(update.len());
        for (key, value) in update {
            let next = self.reduce(&key, value)?;
            reduced.push((key, next));
        }
        for (key, value) in reduced {
            log::debug!("State field '{}' updated", key);
            self.fields.insert(key, value);
        }
        Ok(())
    }

    /// Copy of this state with `update` merged
    pub fn merged(&self, update: StateUpdate) -> Result<WorkflowState, StateError> {
        let mut next = self.clone();
        next.merge(update)?;
        Ok(next)
    }

    /// Worker state: schema defaults plus `update`, nothing of this state's values
    pub fn fork(&self, update: StateUpdate) -> Result<WorkflowState, StateError> {
        Self::from_update(self.schema.clone(), update)
    }

    fn reduce(&self, key: &str, value: Value) -> Result<Value, StateError> {
        let Some(def) = self.schema.get(key) else {
            return Ok(value);
        };
        let mismatch = |expected: &str, found: &Value| StateError::TypeMismatch {
            field: key.to_string(),
            expected: expected.to_string(),
            found: FieldType::describe(found).to_string(),
        };

        // Null unsets an overwrite field; accumulated values are never erased
        if value.is_null() {
            return match def.reducer {
                ReducerType::Overwrite => Ok(value),
                ReducerType::Append => Err(mismatch("array", &value)),
                ReducerType::Max | ReducerType::Min => Err(mismatch("number", &value)),
                ReducerType::Merge => Err(mismatch("object", &value)),
            };
        }
        let current = self.fields.get(key).filter(|v| !v.is_null());

        match def.reducer {
            ReducerType::Overwrite => {
                if def.field_type.accepts(&value) {
                    Ok(value)
                } else {
                    Err(mismatch(&def.field_type.to_string(), &value))
                }
            }
            ReducerType::Append => {
                let mut items = match current {
                    None => Vec::new(),
                    Some(Value::Array(items)) => items.clone(),
                    Some(other) => return Err(mismatch("array", other)),
                };
                match value {
                    Value::Array(new_items) => items.extend(new_items),
                    other => items.push(other),
                }
                Ok(Value::Array(items))
            }
            ReducerType::Max | ReducerType::Min => {
                let new = value.as_f64().ok_or_else(|| mismatch("number", &value))?;
                let keep_new = match current.and_then(|v| v.as_f64()) {
                    None => true,
                    Some(old) if def.reducer == ReducerType::Max => new > old,
                    Some(old) => new < old,
                };
                match current {
                    Some(old) if !keep_new => Ok(old.clone()),
                    _ => Ok(value),
                }
            }
            ReducerType::Merge => {
                let new_obj = match value {
                    Value::Object(obj) => obj,
                    other => return Err(mismatch("object", &other)),
                };
                let mut merged = match current {
                    None => Map::new(),
                    Some(Value::Object(obj)) => obj.clone(),
                    Some(other) => return Err(mismatch("object", other)),
                };
                for (k, v) in new_obj {
                    merged.insert(k, v);
                }
                Ok(Value::Object(merged))
            }
        }
    }

    /// Get a field value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Get a nested field value using dot notation (e.g., "decision.step")
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = match current {
                Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                other => other.get(part)?,
            };
        }
        Some(current)
    }

    /// Deserialize a field into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LatticeError> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
        }
    }

    /// The conversation stored under `messages`
    pub fn messages(&self) -> Result<Vec<Message>, LatticeError> {
        Ok(self.get_as("messages")?.unwrap_or_default())
    }

    /// Convert state to JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Get all field names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new(Arc::new(StateSchema::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(schema: StateSchema) -> WorkflowState {
        WorkflowState::new(Arc::new(schema))
    }

    fn update(key: &str, value: Value) -> StateUpdate {
        StateUpdate::new().set(key, value)
    }

    #[test]
    fn test_state_with_defaults() {
        let schema = StateSchema::new()
            .field("count", FieldType::Number)
            .with_default("count", json!(0))
            .with_default("name", json!("default"));
        let state = state(schema);

        assert_eq!(state.get("count"), Some(&json!(0)));
        assert_eq!(state.get_str("name"), Some("default"));
    }

    #[test]
    fn test_update_set_replaces_duplicate_keys() {
        let update = StateUpdate::new().set("a", 1).set("b", 2).set("a", 3);
        assert_eq!(update.len(), 2);
        assert_eq!(update.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(update.get("a"), Some(&json!(3)));
    }

    #[test]
    fn test_update_from_json_requires_object() {
        let update = StateUpdate::from_json(json!({"topic": "cats"})).unwrap();
        assert_eq!(update.get("topic"), Some(&json!("cats")));
        assert!(StateUpdate::from_json(json!(["cats"])).is_err());
    }

    #[test]
    fn test_overwrite_reducer_checks_type() {
        let mut state = state(StateSchema::new().field("joke", FieldType::String));

        state.merge(update("joke", json!("first"))).unwrap();
        state.merge(update("joke", json!("second"))).unwrap();
        assert_eq!(state.get_str("joke"), Some("second"));

        let err = state.merge(update("joke", json!(42))).unwrap_err();
        assert_eq!(
            err,
            StateError::TypeMismatch {
                field: "joke".to_string(),
                expected: "string".to_string(),
                found: "number".to_string(),
            }
        );
        assert_eq!(state.get_str("joke"), Some("second"));
    }

    #[test]
    fn test_append_reducer() {
        let mut state = state(StateSchema::new().append("items"));

        state.merge(update("items", json!("item1"))).unwrap();
        assert_eq!(state.get("items"), Some(&json!(["item1"])));

        state.merge(update("items", json!(["item2", "item3"]))).unwrap();
        assert_eq!(state.get("items"), Some(&json!(["item1", "item2", "item3"])));
    }

    #[test]
    fn test_append_never_drops_contributions() {
        let mut state = state(StateSchema::new().append("completed_sections"));
        let updates = [json!(["a1", "a2"]), json!(["b1"]), json!([]), json!(["c1", "c2"])];
        for u in updates {
            state.merge(update("completed_sections", u)).unwrap();
        }
        assert_eq!(
            state.get("completed_sections"),
            Some(&json!(["a1", "a2", "b1", "c1", "c2"]))
        );
    }

    #[test]
    fn test_max_and_min_reducers() {
        let schema = StateSchema::new()
            .with_reducer("score", FieldType::Number, ReducerType::Max)
            .with_reducer("cost", FieldType::Number, ReducerType::Min);
        let mut state = state(schema);

        for v in [5.0, 3.0, 8.0] {
            state
                .merge(StateUpdate::new().set("score", v).set("cost", v))
                .unwrap();
        }
        assert_eq!(state.get("score"), Some(&json!(8.0)));
        assert_eq!(state.get("cost"), Some(&json!(3.0)));

        assert!(state.merge(update("score", json!("ten"))).is_err());
    }

    #[test]
    fn test_merge_reducer() {
        let schema = StateSchema::new().with_reducer("meta", FieldType::Object, ReducerType::Merge);
        let mut state = state(schema);

        state.merge(update("meta", json!({"a": 1}))).unwrap();
        state.merge(update("meta", json!({"b": 2}))).unwrap();
        state.merge(update("meta", json!({"a": 10}))).unwrap();
        assert_eq!(state.get("meta"), Some(&json!({"a": 10, "b": 2})));

        assert!(state.merge(update("meta", json!([1]))).is_err());
    }

    #[test]
    fn test_failed_merge_is_atomic() {
        let schema = StateSchema::new()
            .field("topic", FieldType::String)
            .field("score", FieldType::Number);
        let mut state = state(schema);

        let bad = StateUpdate::new().set("topic", "dogs").set("score", "high");
        assert!(state.merge(bad).is_err());
        assert!(state.get("topic").is_none());
    }

    #[test]
    fn test_null_unsets_declared_field() {
        let mut state = state(StateSchema::new().field("feedback", FieldType::String));
        state.merge(update("feedback", json!("more puns"))).unwrap();
        state.merge(update("feedback", Value::Null)).unwrap();
        assert_eq!(state.get_str("feedback"), None);
        assert_eq!(state.get_as::<String>("feedback").unwrap(), None);
    }

    #[test]
    fn test_null_cannot_erase_accumulated_fields() {
        let schema = StateSchema::new()
            .append("items")
            .with_reducer("best", FieldType::Number, ReducerType::Max)
            .with_reducer("meta", FieldType::Object, ReducerType::Merge);
        let mut state = state(schema);
        state
            .merge(
                StateUpdate::new()
                    .set("items", json!(["a", "b"]))
                    .set("best", 4)
                    .set("meta", json!({"k": 1})),
            )
            .unwrap();

        let err = state.merge(update("items", Value::Null)).unwrap_err();
        assert_eq!(
            err,
            StateError::TypeMismatch {
                field: "items".to_string(),
                expected: "array".to_string(),
                found: "null".to_string(),
            }
        );
        assert!(state.merge(update("best", Value::Null)).is_err());
        assert!(state.merge(update("meta", Value::Null)).is_err());

        assert_eq!(state.get("items"), Some(&json!(["a", "b"])));
        assert_eq!(state.get("best"), Some(&json!(4)));
        assert_eq!(state.get("meta"), Some(&json!({"k": 1})));
    }

    #[test]
    fn test_merged_leaves_original_untouched() {
        let base = state(StateSchema::messages());
        let next = base.merged(StateUpdate::messages(vec![Message::user("hi")])).unwrap();

        assert!(base.get("messages").is_none());
        assert_eq!(next.messages().unwrap(), vec![Message::user("hi")]);
    }

    #[test]
    fn test_fork_starts_from_defaults() {
        let schema = StateSchema::new()
            .field("topic", FieldType::String)
            .with_default("topic", json!("none"))
            .field("section", FieldType::Object);
        let parent = state(schema)
            .merged(update("topic", json!("cats")))
            .unwrap();

        let worker = parent
            .fork(update("section", json!({"name": "Intro"})))
            .unwrap();
        assert_eq!(worker.get_str("topic"), Some("none"));
        assert_eq!(worker.get_path("section.name"), Some(&json!("Intro")));
    }

    #[test]
    fn test_get_path() {
        let mut state = WorkflowState::default();
        state
            .merge(update("result", json!({"data": {"values": [1, 42]}})))
            .unwrap();

        assert_eq!(state.get_path("result.data.values.1"), Some(&json!(42)));
        assert_eq!(state.get_path("result.nonexistent"), None);
        assert_eq!(state.get_path("missing"), None);
    }

    #[test]
    fn test_undefined_field_uses_overwrite() {
        let mut state = WorkflowState::default();

        state.merge(update("unknown", json!("first"))).unwrap();
        state.merge(update("unknown", json!(2))).unwrap();
        assert_eq!(state.get("unknown"), Some(&json!(2)));
        assert_eq!(state.to_json(), json!({"unknown": 2}));
    }
}
