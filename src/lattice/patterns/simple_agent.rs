// SPDX-License-Identifier: MIT

//! Web-search agent keeping its conversation in a [`MemorySaver`]

use super::SEARCH_TOOL;
use crate::adk::error::LatticeError;
use crate::adk::model::{ChatModel, Message};
use crate::adk::tool::Tool;
use crate::lattice::prebuilt::ToolCallingAgent;
use crate::lattice::workflow::checkpoint::MemorySaver;
use crate::lattice::workflow::registry::ToolRegistry;
use std::sync::Arc;

pub const THREAD_ID: &str = "42";
pub const QUESTIONS: [&str; 2] = ["what is the current weather in sf", "what about ny"];

pub fn build(chat: &ChatModel, tools: Vec<Arc<dyn Tool>>) -> Result<ToolCallingAgent, LatticeError> {
    Ok(ToolCallingAgent::new("simple_agent", chat.clone(), tools, "")?
        .with_checkpointer(MemorySaver::new()))
}

pub async fn run(chat: &ChatModel, registry: &ToolRegistry) -> Result<String, LatticeError> {
    let agent = build(chat, registry.resolve(&[SEARCH_TOOL]).await?)?;

    let mut answers = Vec::with_capacity(QUESTIONS.len());
    for question in QUESTIONS {
        let history = agent
            .invoke(vec![Message::user(question)], Some(THREAD_ID))
            .await?;
        let answer = history.last().map(Message::text).unwrap_or_default();
        answers.push(format!("> {}\n{}", question, answer));
    }
    Ok(answers.join("\n\n"))
}
