// SPDX-License-Identifier: MIT

//! A structured-output router picks one of three writers

use super::text_field;
use crate::adk::error::LatticeError;
use crate::adk::model::{ChatModel, Message};
use crate::lattice::workflow::graph::{node_fn, CompiledGraph, Node, StateGraph, END, START};
use crate::lattice::workflow::state::{FieldType, StateSchema, StateUpdate, WorkflowState};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const INPUT: &str = "Write me a joke about cats";
const ROUTER_PROMPT: &str = "Route the input to story, joke, or poem based on the user's request.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Poem,
    Story,
    Joke,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Poem => "poem",
            Step::Story => "story",
            Step::Joke => "joke",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RouteDecision {
    /// The next step in the routing process
    pub step: Step,
}

fn schema() -> StateSchema {
    StateSchema::new()
        .field("input", FieldType::String)
        .field("decision", FieldType::String)
        .field("output", FieldType::String)
}

/// Writer answering `input` in the voice of `persona`
fn writer(chat: &ChatModel, persona: &'static str) -> impl Node {
    let chat = chat.clone();
    node_fn(move |state: WorkflowState| {
        let chat = chat.clone();
        async move {
            let reply = chat
                .invoke(&[Message::system(persona), Message::user(text_field(&state, "input"))])
                .await?;
            Ok(StateUpdate::new().set("output", reply.text()))
        }
    })
}

fn route_decision(state: &WorkflowState) -> &'static str {
    match state.get_str("decision") {
        Some("story") => "llm_call_1",
        Some("joke") => "llm_call_2",
        _ => "llm_call_3",
    }
}

pub fn build(chat: &ChatModel) -> Result<CompiledGraph, LatticeError> {
    let router = chat.with_structured_output::<RouteDecision>("routeDecision")?;
    let llm_call_router = node_fn(move |state: WorkflowState| {
        let router = router.clone();
        async move {
            let decision = router
                .invoke(&[
                    Message::system(ROUTER_PROMPT),
                    Message::user(text_field(&state, "input")),
                ])
                .await?;
            log::info!("Routing decision: {}", decision.step);
            Ok(StateUpdate::new().set("decision", decision.step.to_string()))
        }
    });

    StateGraph::new("routing", schema())
        .add_node("llm_call_1", writer(chat, "You are an expert storyteller."))
        .add_node("llm_call_2", writer(chat, "You are an expert comedian."))
        .add_node("llm_call_3", writer(chat, "You are an expert poet."))
        .add_node("llm_call_router", llm_call_router)
        .add_edge(START, "llm_call_router")
        .add_conditional_edges_to(
            "llm_call_router",
            route_decision,
            &["llm_call_1", "llm_call_2", "llm_call_3"],
        )
        .add_edge("llm_call_1", END)
        .add_edge("llm_call_2", END)
        .add_edge("llm_call_3", END)
        .compile()
}

pub async fn run(chat: &ChatModel) -> Result<String, LatticeError> {
    let state = build(chat)?
        .invoke(StateUpdate::new().set("input", INPUT))
        .await?;
    Ok(text_field(&state, "output"))
}
