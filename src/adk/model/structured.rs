// SPDX-License-Identifier: MIT

use super::{ChatModel, Message, OutputSchema};
use crate::adk::error::LatticeError;
use crate::adk::tool::{SchemaValidator, Tool};
use log::debug;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;

/// A [`ChatModel`] with tools attached; replies may carry tool calls
#[derive(Clone)]
pub struct ToolBoundModel {
    chat: ChatModel,
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolBoundModel {
    pub(super) fn new(chat: ChatModel, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { chat, tools }
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub async fn invoke(&self, messages: &[Message]) -> Result<Message, LatticeError> {
        debug!(
            "Invoking {} with {} bound tools",
            self.chat.name(),
            self.tools.len()
        );
        self.chat
            .generate(messages, self.chat.config(), Some(&self.tools))
            .await
    }
}

/// A [`ChatModel`] constrained to answer with JSON matching `T`
pub struct StructuredModel<T> {
    chat: ChatModel,
    schema: OutputSchema,
    validator: SchemaValidator,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StructuredModel<T> {
    fn clone(&self) -> Self {
        Self {
            chat: self.chat.clone(),
            schema: self.schema.clone(),
            validator: self.validator.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> StructuredModel<T> {
    pub(super) fn new(chat: ChatModel, schema: OutputSchema) -> Self {
        let validator = SchemaValidator::new(&schema.schema);
        Self {
            chat,
            schema,
            validator,
            _marker: PhantomData,
        }
    }

    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    pub async fn invoke(&self, messages: &[Message]) -> Result<T, LatticeError> {
        let mut config = self.chat.config().clone();
        config.output_schema = Some(self.schema.clone());

        let reply = self.chat.generate(messages, &config, None).await?;
        self.parse(&reply.text())
    }

    pub async fn invoke_text(&self, prompt: &str) -> Result<T, LatticeError> {
        self.invoke(&[Message::user(prompt)]).await
    }

    /// Validate a raw reply against the schema and deserialize it
    pub fn parse(&self, raw: &str) -> Result<T, LatticeError> {
        let value: serde_json::Value =
            serde_json::from_str(strip_code_fence(raw)).map_err(|e| {
                LatticeError::SchemaValidation {
                    schema: self.schema.name.clone(),
                    message: format!("reply is not JSON: {}", e),
                }
            })?;

        self.validator.validate(&value).map_err(|message| {
            LatticeError::SchemaValidation {
                schema: self.schema.name.clone(),
                message,
            }
        })?;

        serde_json::from_value(value).map_err(|e| LatticeError::SchemaValidation {
            schema: self.schema.name.clone(),
            message: e.to_string(),
        })
    }
}

// Local models like to wrap JSON in ```json fences
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}
