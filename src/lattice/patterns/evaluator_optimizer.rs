// SPDX-License-Identifier: MIT

//! Generator and evaluator loop until the joke is graded funny
//!
//! Termination depends on the evaluator; the graph's step limit bounds a
//! model that never accepts.

use super::text_field;
use crate::adk::error::LatticeError;
use crate::adk::model::ChatModel;
use crate::lattice::workflow::graph::{node_fn, CompiledGraph, StateGraph, END, START};
use crate::lattice::workflow::state::{FieldType, StateSchema, StateUpdate, WorkflowState};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const TOPIC: &str = "Cats";
pub const ACCEPTED: &str = "Accepted";
pub const REJECTED: &str = "Rejected + Feedback";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum Grade {
    #[serde(rename = "funny")]
    Funny,
    #[serde(rename = "not funny")]
    NotFunny,
}

impl Grade {
    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Funny => "funny",
            Grade::NotFunny => "not funny",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Feedback {
    /// Decide if the joke is funny or not.
    pub grade: Grade,
    /// If the joke is not funny, provide feedback on how to improve it.
    pub feedback: String,
}

fn schema() -> StateSchema {
    StateSchema::new()
        .field("topic", FieldType::String)
        .field("joke", FieldType::String)
        .field("feedback", FieldType::String)
        .field("funny_or_not", FieldType::String)
}

fn route_joke(state: &WorkflowState) -> &'static str {
    if state.get_str("funny_or_not") == Some(Grade::Funny.as_str()) {
        ACCEPTED
    } else {
        REJECTED
    }
}

pub fn build(chat: &ChatModel) -> Result<CompiledGraph, LatticeError> {
    let evaluator = chat.with_structured_output::<Feedback>("feedback")?;

    let generator = chat.clone();
    let llm_call_generator = node_fn(move |state: WorkflowState| {
        let generator = generator.clone();
        async move {
            let topic = text_field(&state, "topic");
            let prompt = match state.get_str("feedback").filter(|f| !f.is_empty()) {
                Some(feedback) => format!(
                    "Write a joke about {} but take into account the feedback: {}",
                    topic, feedback
                ),
                None => format!("Write a joke about {}", topic),
            };
            let joke = generator.invoke_text(&prompt).await?;
            Ok(StateUpdate::new().set("joke", joke))
        }
    });

    let llm_call_evaluator = node_fn(move |state: WorkflowState| {
        let evaluator = evaluator.clone();
        async move {
            let grade = evaluator
                .invoke_text(&format!("Grade the joke {}", text_field(&state, "joke")))
                .await?;
            log::info!("Joke graded '{}'", grade.grade.as_str());
            Ok(StateUpdate::new()
                .set("funny_or_not", grade.grade.as_str())
                .set("feedback", grade.feedback))
        }
    });

    StateGraph::new("evaluator_optimizer", schema())
        .add_node("llm_call_generator", llm_call_generator)
        .add_node("llm_call_evaluator", llm_call_evaluator)
        .add_edge(START, "llm_call_generator")
        .add_edge("llm_call_generator", "llm_call_evaluator")
        .add_conditional_edges(
            "llm_call_evaluator",
            route_joke,
            &[(ACCEPTED, END), (REJECTED, "llm_call_generator")],
        )
        .compile()
}

pub async fn run(chat: &ChatModel) -> Result<String, LatticeError> {
    let state = build(chat)?
        .invoke(StateUpdate::new().set("topic", TOPIC))
        .await?;
    Ok(format!("Joke:\n{}", text_field(&state, "joke")))
}
