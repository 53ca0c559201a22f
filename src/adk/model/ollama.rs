// SPDX-License-Identifier: MIT

//! Ollama Model - local `/api/chat` implementation
//!
//! Ollama does not issue tool call ids, so every call it returns gets a
//! fresh `call_<uuid>` id before it enters the conversation.

use super::{Capabilities, GenerationConfig, Message, Model, Part, Role, ToolCall};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama chat model
pub struct OllamaModel {
    client: Client,
    model_name: String,
    base_url: String,
}

impl OllamaModel {
    pub fn new(model_name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model_name: model_name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn convert_message(message: &Message) -> Vec<OllamaMessage> {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let mut out = Vec::new();
        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for part in &message.parts {
            match part {
                Part::Text { text: t } => text.push_str(t),
                Part::ToolCall(call) => tool_calls.push(OllamaToolCall {
                    function: OllamaFunction {
                        name: call.name.clone(),
                        arguments: call.args.clone(),
                    },
                }),
                Part::ToolResult(result) => out.push(OllamaMessage {
                    role: "tool".to_string(),
                    content: match &result.content {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    },
                    tool_calls: Vec::new(),
                }),
            }
        }

        if out.is_empty() {
            out.push(OllamaMessage {
                role: role.to_string(),
                content: text,
                tool_calls,
            });
        }
        out
    }

    fn tools_to_ollama_format(tools: &[Arc<dyn Tool>]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name(),
                        "description": t.description(),
                        "parameters": t.schema()
                    }
                })
            })
            .collect()
    }

    fn request_body(
        &self,
        history: &[Message],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> OllamaRequest {
        let mut options = HashMap::new();
        let mut format = None;
        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                options.insert("temperature", json!(temp));
            }
            if let Some(top_p) = cfg.top_p {
                options.insert("top_p", json!(top_p));
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                options.insert("num_predict", json!(max_tokens));
            }
            format = cfg.output_schema.as_ref().map(|s| s.schema.clone());
        }

        OllamaRequest {
            model: self.model_name.clone(),
            messages: history.iter().flat_map(Self::convert_message).collect(),
            stream: false,
            tools: tools
                .filter(|t| !t.is_empty())
                .map(Self::tools_to_ollama_format),
            format,
            options: if options.is_empty() {
                None
            } else {
                Some(options)
            },
        }
    }

    fn convert_response(response: OllamaResponse) -> Message {
        let mut parts = Vec::new();
        if !response.message.content.is_empty() {
            parts.push(Part::Text {
                text: response.message.content,
            });
        }
        for call in response.message.tool_calls {
            parts.push(Part::ToolCall(ToolCall {
                id: format!("call_{}", Uuid::new_v4().simple()),
                name: call.function.name,
                args: call.function.arguments,
            }));
        }
        Message {
            role: Role::Assistant,
            parts,
        }
    }
}

#[async_trait]
impl Model for OllamaModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }

    async fn generate_content(
        &self,
        history: &[Message],
        config: Option<&GenerationConfig>,
        tools: Option<&[Arc<dyn Tool>]>,
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        let url = format!("{}/api/chat", self.base_url);
        let body = self.request_body(history, config, tools);

        log::debug!(
            "Ollama request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self.client.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("Ollama API error {}: {}", status, text).into());
        }

        let response: OllamaResponse = resp.json().await?;
        log::info!(
            "Ollama response from {} ({} tool calls)",
            response.model,
            response.message.tool_calls.len()
        );

        Ok(Self::convert_response(response))
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<HashMap<&'static str, serde_json::Value>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    model: String,
    message: OllamaMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::{OutputSchema, ToolResult};

    #[test]
    fn test_request_body_options_and_format() {
        let model = OllamaModel::new("llama3.1:8b", "http://localhost:11434/");
        let config = GenerationConfig {
            temperature: Some(0.1),
            output_schema: Some(OutputSchema {
                name: "sections".to_string(),
                schema: json!({"type": "object"}),
            }),
            ..Default::default()
        };

        let body = serde_json::to_value(model.request_body(
            &[Message::system("be brief"), Message::user("hi")],
            Some(&config),
            None,
        ))
        .unwrap();

        assert_eq!(body["model"], "llama3.1:8b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["format"]["type"], "object");
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
        assert!(body.get("tools").is_none());
        assert_eq!(model.base_url, "http://localhost:11434");
    }

    #[test]
    fn test_tool_result_becomes_tool_message() {
        let msg = Message::tool_result(ToolResult {
            call_id: "call_1".to_string(),
            name: "add".to_string(),
            content: json!("7"),
        });
        let out = OllamaModel::convert_message(&msg);
        assert_eq!(out[0].role, "tool");
        assert_eq!(out[0].content, "7");
    }

    #[test]
    fn test_response_tool_calls_get_unique_ids() {
        let response: OllamaResponse = serde_json::from_value(json!({
            "model": "llama3.1:8b",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "multiply", "arguments": {"a": 3, "b": 4}}},
                    {"function": {"name": "multiply", "arguments": {"a": 3, "b": 4}}}
                ]
            },
            "done": true
        }))
        .unwrap();

        let msg = OllamaModel::convert_response(response);
        let calls = msg.tool_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].id.starts_with("call_"));
        assert_ne!(calls[0].id, calls[1].id);
        assert_eq!(calls[0].args["b"], 4);
        assert_eq!(msg.text(), "");
    }
}
