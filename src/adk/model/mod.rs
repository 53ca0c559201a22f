// SPDX-License-Identifier: MIT

//! Model module - defines LLM model trait and implementations
//!
//! This module provides the core Model trait, the message types exchanged
//! with it, and the [`ChatModel`] facade the workflows talk to.
//! Model implementations are in their own submodules:
//! - [ollama] - Ollama's local chat API
//! - [openai] - OpenAI's ChatGPT API
//!
//! Which backend, model name and temperature to use is decided by
//! [provider] from the process environment.

pub mod ollama;
pub mod openai;
pub mod provider;
mod structured;

pub use structured::{StructuredModel, ToolBoundModel};

use crate::adk::error::LatticeError;
use crate::adk::tool::{schema_for, Tool};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

/// Schema the model must answer with instead of free text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

/// Configuration for model generation
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    /// Structured output request, see [`ChatModel::with_structured_output`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<OutputSchema>,
}

/// Author of a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

/// Answer to a [`ToolCall`], tagged with the id of the call it answers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub call_id: String,
    pub name: String,
    pub content: serde_json::Value,
}

/// Parts of a message - text, tool calls, tool results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Assistant turn requesting the given tool calls
    pub fn tool_calls_request(calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            parts: calls.into_iter().map(Part::ToolCall).collect(),
        }
    }

    pub fn tool_result(result: ToolResult) -> Self {
        Self {
            role: Role::Tool,
            parts: vec![Part::ToolResult(result)],
        }
    }

    /// Concatenated text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::ToolCall(_)))
    }
}

/// What a backend can do beyond plain chat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub tools: bool,
    pub structured_output: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            tools: true,
            structured_output: true,
        }
    }
}

/// Core trait for LLM model implementations
#[async_trait]
pub trait Model: Send + Sync {
    /// Model identifier, used in logs and errors
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    async fn generate_content(
        &self,
        history: &[Message],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Message, Box<dyn Error + Send + Sync>>;
}

/// Chat model handle the workflows use.
///
/// Wraps a backend with its default [`GenerationConfig`] and checks
/// capabilities when tools or output schemas are attached, so a missing
/// capability is reported while a workflow is being built rather than
/// halfway through a run.
#[derive(Clone)]
pub struct ChatModel {
    model: Arc<dyn Model>,
    config: GenerationConfig,
}

impl ChatModel {
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model,
            config: GenerationConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn name(&self) -> &str {
        self.model.name()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.model.capabilities()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Send `messages` and return the model's reply
    pub async fn invoke(&self, messages: &[Message]) -> Result<Message, LatticeError> {
        let reply = self
            .model
            .generate_content(messages, Some(&self.config), None)
            .await?;
        Ok(reply)
    }

    /// Send a single user prompt and return the reply text
    pub async fn invoke_text(&self, prompt: &str) -> Result<String, LatticeError> {
        let reply = self.invoke(&[Message::user(prompt)]).await?;
        Ok(reply.text())
    }

    /// Attach tools the model may call
    pub fn bind_tools(&self, tools: Vec<Arc<dyn Tool>>) -> Result<ToolBoundModel, LatticeError> {
        if !self.capabilities().tools {
            return Err(LatticeError::MissingCapability {
                model: self.name().to_string(),
                capability: "tool binding".to_string(),
            });
        }
        Ok(ToolBoundModel::new(self.clone(), tools))
    }

    /// Make the model answer with values of `T` instead of free text
    pub fn with_structured_output<T>(&self, name: &str) -> Result<StructuredModel<T>, LatticeError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        if !self.capabilities().structured_output {
            return Err(LatticeError::MissingCapability {
                model: self.name().to_string(),
                capability: "structured output".to_string(),
            });
        }
        let schema = OutputSchema {
            name: name.to_string(),
            schema: schema_for::<T>(),
        };
        Ok(StructuredModel::new(self.clone(), schema))
    }

    pub(crate) async fn generate(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Message, LatticeError> {
        let reply = self.model.generate_content(messages, Some(config), tools).await?;
        Ok(reply)
    }
}
