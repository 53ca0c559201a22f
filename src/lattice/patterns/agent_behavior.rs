// SPDX-License-Identifier: MIT

//! The tool-calling loop wired by hand from its parts

use super::SEARCH_TOOL;
use crate::adk::error::LatticeError;
use crate::adk::model::{ChatModel, Message};
use crate::adk::tool::Tool;
use crate::lattice::prebuilt::ToolNode;
use crate::lattice::workflow::graph::{node_fn, CompiledGraph, StateGraph, END, START};
use crate::lattice::workflow::registry::ToolRegistry;
use crate::lattice::workflow::state::{StateSchema, StateUpdate, WorkflowState};
use std::sync::Arc;

pub const QUESTIONS: [&str; 2] = ["what is the weather in sf", "what about ny"];

/// `tools` while the model keeps requesting them, else the end marker
fn should_continue(state: &WorkflowState) -> &'static str {
    match state.messages() {
        Ok(messages) if messages.last().is_some_and(Message::has_tool_calls) => "tools",
        _ => END,
    }
}

pub fn build(chat: &ChatModel, tools: Vec<Arc<dyn Tool>>) -> Result<CompiledGraph, LatticeError> {
    let model = chat.bind_tools(tools.clone())?;
    let call_model = node_fn(move |state: WorkflowState| {
        let model = model.clone();
        async move {
            let response = model.invoke(&state.messages()?).await?;
            Ok(StateUpdate::messages(vec![response]))
        }
    });

    StateGraph::new("agent_behavior", StateSchema::messages())
        .add_node("agent", call_model)
        .add_edge(START, "agent")
        .add_node("tools", ToolNode::new(tools))
        .add_edge("tools", "agent")
        .add_dynamic_edges("agent", should_continue)
        .compile()
}

/// Each question runs on a fresh conversation
pub async fn run(chat: &ChatModel, registry: &ToolRegistry) -> Result<String, LatticeError> {
    let graph = build(chat, registry.resolve(&[SEARCH_TOOL]).await?)?;
    log::debug!("Agent behavior graph:\n{}", graph.draw_mermaid());

    let mut answers = Vec::with_capacity(QUESTIONS.len());
    for question in QUESTIONS {
        let state = graph
            .invoke(StateUpdate::messages(vec![Message::user(question)]))
            .await?;
        let answer = state
            .messages()?
            .last()
            .map(Message::text)
            .unwrap_or_default();
        answers.push(answer);
    }
    Ok(answers.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::testing::ScriptedModel;
    use crate::adk::model::ToolCall;
    use crate::lattice::tools::TavilySearchTool;
    use serde_json::json;

    #[test]
    fn test_should_continue() {
        let schema = Arc::new(StateSchema::messages());
        let asks = WorkflowState::from_update(
            schema.clone(),
            StateUpdate::messages(vec![Message::tool_calls_request(vec![ToolCall {
                id: "call_1".to_string(),
                name: SEARCH_TOOL.to_string(),
                args: json!({"input": "weather in sf"}),
            }])]),
        )
        .unwrap();
        assert_eq!(should_continue(&asks), "tools");

        let done = WorkflowState::from_update(
            schema,
            StateUpdate::messages(vec![Message::assistant("sunny")]),
        )
        .unwrap();
        assert_eq!(should_continue(&done), END);
    }

    #[tokio::test]
    async fn test_questions_do_not_share_history() {
        let (chat, scripted) = ScriptedModel::texts(&["sunny", "rainy"]).into_chat();
        let registry = ToolRegistry::new();
        registry
            .register(Arc::new(TavilySearchTool::with_api_key("test")))
            .await;

        assert_eq!(run(&chat, &registry).await.unwrap(), "sunny\nrainy");
        let seen = scripted.seen.lock().unwrap();
        assert_eq!(seen[1], vec![Message::user("what about ny")]);
    }

    #[test]
    fn test_graph_lists_dynamic_targets() {
        let (chat, _) = ScriptedModel::texts(&[]).into_chat();
        let graph = build(&chat, vec![Arc::new(TavilySearchTool::with_api_key("test"))]).unwrap();
        let diagram = graph.draw_mermaid();
        assert!(diagram.contains("agent -.-> tools"));
        assert!(diagram.contains("agent -.-> __end__"));
    }
}
