// SPDX-License-Identifier: MIT

//! Planner fans out one worker per report section, a synthesizer joins them

use super::text_field;
use crate::adk::error::LatticeError;
use crate::adk::model::{ChatModel, Message};
use crate::lattice::workflow::graph::{
    node_fn, CompiledGraph, Send, StateGraph, END, START,
};
use crate::lattice::workflow::state::{FieldType, StateSchema, StateUpdate, WorkflowState};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const TOPIC: &str = "Create a report on LLM scaling laws";
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

const PLANNER_PROMPT: &str = "Generate a plan for the report.";
const WORKER_PROMPT: &str = "Write a report section following the provided name and description. Include no preamble for each section. Use markdown formatting.";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Section {
    /// Name for this section of the report.
    pub name: String,
    /// Brief overview of the main topics and concepts to be covered in this section.
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Sections {
    /// Sections of the report.
    pub sections: Vec<Section>,
}

/// Shared by the parent run and the workers forked from it
fn schema() -> StateSchema {
    StateSchema::new()
        .field("topic", FieldType::String)
        .field("sections", FieldType::Array)
        .field("section", FieldType::Object)
        .append("completed_sections")
        .with_default("completed_sections", json!([]))
        .field("final_report", FieldType::String)
}

/// One `llm_call` worker per planned section.
///
/// The orchestrator only stores plans that passed [`check_plan`], so an
/// unreadable value here means the state was written by something else.
fn assign_workers(state: &WorkflowState) -> Vec<Send> {
    let sections: Vec<Section> = match state.get_as("sections") {
        Ok(sections) => sections.unwrap_or_default(),
        Err(e) => {
            log::error!("Unreadable sections, assigning no workers: {}", e);
            Vec::new()
        }
    };
    sections
        .into_iter()
        .map(|section| Send::new("llm_call", StateUpdate::new().set("section", json!(section))))
        .collect()
}

/// A plan with no sections would end the run without a report
fn check_plan(plan: &Sections) -> Result<(), LatticeError> {
    if plan.sections.is_empty() {
        return Err(LatticeError::SchemaValidation {
            schema: "sections".to_string(),
            message: "plan has no sections".to_string(),
        });
    }
    Ok(())
}

pub fn build(chat: &ChatModel) -> Result<CompiledGraph, LatticeError> {
    let planner = chat.with_structured_output::<Sections>("sections")?;
    let orchestrator = node_fn(move |state: WorkflowState| {
        let planner = planner.clone();
        async move {
            let plan = planner
                .invoke(&[
                    Message::system(PLANNER_PROMPT),
                    Message::user(format!(
                        "Here is the report topic: {}",
                        text_field(&state, "topic")
                    )),
                ])
                .await?;
            check_plan(&plan)?;
            log::info!("Planned {} report sections", plan.sections.len());
            Ok(StateUpdate::new().set("sections", serde_json::to_value(&plan.sections)?))
        }
    });

    let writer = chat.clone();
    let llm_call = node_fn(move |state: WorkflowState| {
        let writer = writer.clone();
        async move {
            let section: Section = state
                .get_as("section")?
                .ok_or_else(|| LatticeError::other("worker started without a section"))?;
            let reply = writer
                .invoke(&[
                    Message::system(WORKER_PROMPT),
                    Message::user(format!(
                        "Here is the section name: {} and description: {}",
                        section.name, section.description
                    )),
                ])
                .await?;
            Ok(StateUpdate::new().set("completed_sections", json!([reply.text()])))
        }
    });

    let synthesizer = node_fn(|state: WorkflowState| async move {
        let completed: Vec<String> = state.get_as("completed_sections")?.unwrap_or_default();
        Ok(StateUpdate::new().set("final_report", completed.join(SECTION_SEPARATOR)))
    });

    StateGraph::new("orchestrator_worker", schema())
        .add_node("orchestrator", orchestrator)
        .add_node("llm_call", llm_call)
        .add_node("synthesizer", synthesizer)
        .add_edge(START, "orchestrator")
        .add_conditional_edges_to("orchestrator", assign_workers, &["llm_call"])
        .add_edge("llm_call", "synthesizer")
        .add_edge("synthesizer", END)
        .compile()
}

pub async fn run(chat: &ChatModel) -> Result<String, LatticeError> {
    let state = build(chat)?
        .invoke(StateUpdate::new().set("topic", TOPIC))
        .await?;
    Ok(text_field(&state, "final_report"))
}
