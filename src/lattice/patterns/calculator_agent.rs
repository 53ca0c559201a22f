// SPDX-License-Identifier: MIT

//! Arithmetic agent, streamed event by event

use crate::adk::agent::{Agent, AgentEvent};
use crate::adk::error::LatticeError;
use crate::adk::model::ChatModel;
use crate::adk::tool::Tool;
use crate::lattice::prebuilt::ToolCallingAgent;
use crate::lattice::workflow::registry::ToolRegistry;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const TOOLS: [&str; 3] = ["add", "multiply", "divide"];
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant tasked with performing arithmetic on a set of inputs.";
pub const INPUT: &str = "Multiply 3 and 4.";

pub fn build(chat: &ChatModel, tools: Vec<Arc<dyn Tool>>) -> Result<ToolCallingAgent, LatticeError> {
    ToolCallingAgent::new("calculator", chat.clone(), tools, SYSTEM_PROMPT)
}

fn describe(event: &AgentEvent) -> String {
    match event {
        AgentEvent::ToolCall { id, name, args } => format!("[{}] {} {}", id, name, args),
        AgentEvent::ToolResult {
            call_id, result, ..
        } => format!("[{}] -> {}", call_id, result),
        AgentEvent::Answer(answer) => answer.clone(),
        AgentEvent::Error(error) => format!("error: {}", error),
    }
}

pub async fn run(chat: &ChatModel, registry: &ToolRegistry) -> Result<String, LatticeError> {
    let agent = build(chat, registry.resolve(&TOOLS).await?)?;
    let (tx, mut rx) = mpsc::channel(32);

    let collect = async {
        let mut lines = Vec::new();
        while let Some(event) = rx.recv().await {
            lines.push(describe(&event));
        }
        lines
    };
    let (result, lines) = tokio::join!(agent.run_stream(INPUT.to_string(), tx), collect);
    result?;
    Ok(lines.join("\n"))
}
