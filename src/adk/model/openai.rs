// SPDX-License-Identifier: MIT

//! OpenAI Model - ChatGPT API implementation

use super::{Capabilities, GenerationConfig, Message, Model, Part, Role, ToolCall};
use crate::adk::tool::Tool;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::error::Error;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI ChatGPT model implementation
pub struct OpenAIModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl OpenAIModel {
    /// Create a new OpenAIModel against `base_url` (see [`DEFAULT_BASE_URL`])
    pub fn new(
        model_name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model_name: model_name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Convert internal Messages to OpenAI message format.
    ///
    /// A message may expand to several entries: every tool result becomes
    /// its own `tool` message carrying the id of the call it answers.
    fn message_to_openai(message: &Message) -> Vec<serde_json::Value> {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let mut results = Vec::new();
        let mut tool_calls = Vec::new();
        let mut text_content = String::new();

        for part in &message.parts {
            match part {
                Part::Text { text } => text_content.push_str(text),
                Part::ToolCall(call) => {
                    tool_calls.push(json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.args.to_string()
                        }
                    }));
                }
                Part::ToolResult(result) => {
                    let content = match &result.content {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    results.push(json!({
                        "role": "tool",
                        "tool_call_id": result.call_id,
                        "content": content
                    }));
                }
            }
        }

        if !results.is_empty() {
            return results;
        }

        if !tool_calls.is_empty() {
            vec![json!({
                "role": role,
                "content": if text_content.is_empty() { serde_json::Value::Null } else { json!(text_content) },
                "tool_calls": tool_calls
            })]
        } else {
            vec![json!({
                "role": role,
                "content": text_content
            })]
        }
    }

    /// Convert tools to OpenAI function format
    fn tools_to_openai_format(tools: &[Arc<dyn Tool>]) -> Vec<serde_json::Value> {
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
    ) -> serde_json::Value {
        let messages: Vec<serde_json::Value> =
            history.iter().flat_map(Self::message_to_openai).collect();

        let mut body = json!({
            "model": self.model_name,
            "messages": messages
        });

        if let Some(cfg) = config {
            if let Some(temp) = cfg.temperature {
                body["temperature"] = json!(temp);
            }
            if let Some(max_tokens) = cfg.max_output_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(top_p) = cfg.top_p {
                body["top_p"] = json!(top_p);
            }
            if let Some(output) = &cfg.output_schema {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": output.name,
                        "schema": output.schema
                    }
                });
            }
        }

        if let Some(tools) = tools {
            if !tools.is_empty() {
                body["tools"] = json!(Self::tools_to_openai_format(tools));
                body["tool_choice"] = json!("auto");
            }
        }

        body
    }

    /// Parse OpenAI response into a Message
    fn parse_openai_response(
        response: &serde_json::Value,
    ) -> Result<Message, Box<dyn Error + Send + Sync>> {
        let choice = response["choices"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or("No choices in OpenAI response")?;

        let message = &choice["message"];
        let mut parts = Vec::new();

        if let Some(content) = message["content"].as_str() {
            if !content.is_empty() {
                parts.push(Part::Text {
                    text: content.to_string(),
                });
            }
        }

        if let Some(tool_calls) = message["tool_calls"].as_array() {
            for tc in tool_calls {
                let id = tc["id"].as_str().ok_or("Tool call without id")?.to_string();
                let name = tc["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                let args_str = tc["function"]["arguments"].as_str().unwrap_or("{}");
                let args: serde_json::Value = serde_json::from_str(args_str)?;

                parts.push(Part::ToolCall(ToolCall { id, name, args }));
            }
        }

        Ok(Message {
            role: Role::Assistant,
            parts,
        })
    }
}

#[async_trait]
impl Model for OpenAIModel {
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
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(history, config, tools);

        log::debug!(
            "OpenAI request body: {}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await?;
            return Err(format!("OpenAI API error {}: {}", status, text).into());
        }

        let resp_json: serde_json::Value = resp.json().await?;
        log::info!(
            "OpenAI response from {} ({} choices)",
            self.model_name,
            resp_json["choices"].as_array().map_or(0, |c| c.len())
        );

        Self::parse_openai_response(&resp_json)
    }
}
