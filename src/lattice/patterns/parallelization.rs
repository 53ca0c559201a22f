// SPDX-License-Identifier: MIT

//! Three independent calls fanned out from the start, joined by an aggregator

use super::{prompt_node, text_field};
use crate::adk::error::LatticeError;
use crate::adk::model::ChatModel;
use crate::lattice::workflow::graph::{node_fn, CompiledGraph, StateGraph, END, START};
use crate::lattice::workflow::state::{FieldType, StateSchema, StateUpdate, WorkflowState};

pub const TOPIC: &str = "cats";

fn schema() -> StateSchema {
    ["topic", "joke", "story", "poem", "combined_output"]
        .into_iter()
        .fold(StateSchema::new(), |schema, field| {
            schema.field(field, FieldType::String)
        })
}

pub fn combine(topic: &str, story: &str, joke: &str, poem: &str) -> String {
    format!(
        "Here's a story, joke, and poem about {}!\n\nSTORY:\n{}\n\nJOKE:\n{}\n\nPOEM:\n{}",
        topic, story, joke, poem
    )
}

pub fn build(chat: &ChatModel) -> Result<CompiledGraph, LatticeError> {
    let aggregator = node_fn(|state: WorkflowState| async move {
        let combined = combine(
            &text_field(&state, "topic"),
            &text_field(&state, "story"),
            &text_field(&state, "joke"),
            &text_field(&state, "poem"),
        );
        Ok(StateUpdate::new().set("combined_output", combined))
    });

    StateGraph::new("parallelization", schema())
        .add_node(
            "call_llm_1",
            prompt_node(chat, "joke", |s| format!("Write a joke about {}", text_field(s, "topic"))),
        )
        .add_node(
            "call_llm_2",
            prompt_node(chat, "story", |s| format!("Write a story about {}", text_field(s, "topic"))),
        )
        .add_node(
            "call_llm_3",
            prompt_node(chat, "poem", |s| format!("Write a poem about {}", text_field(s, "topic"))),
        )
        .add_node("aggregator", aggregator)
        .add_edge(START, "call_llm_1")
        .add_edge(START, "call_llm_2")
        .add_edge(START, "call_llm_3")
        .add_edge("call_llm_1", "aggregator")
        .add_edge("call_llm_2", "aggregator")
        .add_edge("call_llm_3", "aggregator")
        .add_edge("aggregator", END)
        .compile()
}

pub async fn run(chat: &ChatModel) -> Result<String, LatticeError> {
    let state = build(chat)?
        .invoke(StateUpdate::new().set("topic", TOPIC))
        .await?;
    Ok(text_field(&state, "combined_output"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adk::model::testing::ScriptedModel;
    use crate::lattice::workflow::graph::WorkflowEvent;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_three_branches_then_aggregator() {
        // Branch order is not fixed, so every branch gets the same reply
        let (chat, scripted) = ScriptedModel::texts(&["text", "text", "text"]).into_chat();
        let graph = build(&chat).unwrap();
        let (tx, mut rx) = mpsc::channel(64);

        let state = graph
            .invoke_with_events(StateUpdate::new().set("topic", "cats"), tx)
            .await
            .unwrap();

        assert_eq!(
            state.get_str("combined_output"),
            Some(combine("cats", "text", "text", "text").as_str())
        );
        assert_eq!(scripted.seen.lock().unwrap().len(), 3);

        let mut completed = Vec::new();
        while let Some(event) = rx.recv().await {
            if let WorkflowEvent::NodeCompleted { node, .. } = event {
                completed.push(node);
            }
        }
        assert_eq!(completed.len(), 4);
        assert_eq!(completed.last().map(String::as_str), Some("aggregator"));
    }
}
