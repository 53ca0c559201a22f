// SPDX-License-Identifier: MIT

//! Structured output and tool binding, without a graph

use crate::adk::error::LatticeError;
use crate::adk::model::{ChatModel, Message};
use crate::lattice::workflow::registry::ToolRegistry;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const QUESTION: &str = "How does Calcium CT score relate to high cholesterol?";
pub const ARITHMETIC_QUESTION: &str = "What is 2 times 3?";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Query that is optimized web search.
    pub search_query: String,
    /// Why this query is relevant to the user's request.
    pub justification: String,
}

pub async fn run(chat: &ChatModel, registry: &ToolRegistry) -> Result<String, LatticeError> {
    // Both capabilities are checked before the first request
    let structured = chat.with_structured_output::<SearchQuery>("searchQuery")?;
    let with_tools = chat.bind_tools(registry.resolve(&["multiply"]).await?)?;

    let query = structured.invoke_text(QUESTION).await?;
    let message = with_tools
        .invoke(&[Message::user(ARITHMETIC_QUESTION)])
        .await?;

    let calls: Vec<String> = message
        .tool_calls()
        .into_iter()
        .map(|call| format!("{}({}) [{}]", call.name, call.args, call.id))
        .collect();
    let calls = if calls.is_empty() {
        format!("no tool calls; replied: {}", message.text())
    } else {
        calls.join("\n")
    };

    Ok(format!(
        "Search query: {}\nJustification: {}\n\nTool calls:\n{}",
        query.search_query, query.justification, calls
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::testing::ScriptedModel;
    use crate::adk::model::ToolCall;
    use crate::lattice::tools::create_tools;
    use serde_json::json;

    async fn registry() -> ToolRegistry {
        let registry = ToolRegistry::new();
        registry.register_all(create_tools()).await;
        registry
    }

    #[tokio::test]
    async fn test_reports_query_and_tool_calls() {
        let (chat, scripted) = ScriptedModel::new(vec![
            Message::assistant(
                r#"{"searchQuery": "calcium CT score cholesterol", "justification": "links both"}"#,
            ),
            Message::tool_calls_request(vec![ToolCall {
                id: "call_2x3".to_string(),
                name: "multiply".to_string(),
                args: json!({"a": 2, "b": 3}),
            }]),
        ])
        .into_chat();

        let report = run(&chat, &registry().await).await.unwrap();

        assert_eq!(
            report,
            "Search query: calcium CT score cholesterol\nJustification: links both\n\n\
             Tool calls:\nmultiply({\"a\":2,\"b\":3}) [call_2x3]"
        );
        let configs = scripted.configs.lock().unwrap();
        assert_eq!(
            configs[0].output_schema.as_ref().map(|s| s.name.as_str()),
            Some("searchQuery")
        );
        assert!(configs[1].output_schema.is_none());
    }

    #[tokio::test]
    async fn test_model_without_capabilities_fails_upfront() {
        let (chat, scripted) = ScriptedModel::texts(&[]).without_capabilities().into_chat();
        let err = run(&chat, &registry().await).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(scripted.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_search_query_schema_uses_wire_names() {
        let schema = crate::adk::tool::schema_for::<SearchQuery>();
        assert_eq!(
            schema["properties"]["searchQuery"]["description"],
            "Query that is optimized web search."
        );
    }
}
