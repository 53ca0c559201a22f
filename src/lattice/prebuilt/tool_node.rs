// SPDX-License-Identifier: MIT

//! Tool execution node
//!
//! Runs the tool calls of the latest assistant message and answers each
//! with a tool-result message carrying the id of the call it answers.

use crate::adk::error::LatticeError;
use crate::adk::model::{Message, ToolCall, ToolResult};
use crate::adk::tool::{SchemaValidator, Tool};
use crate::lattice::workflow::graph::{Node, Route, END};
use crate::lattice::workflow::state::{StateUpdate, WorkflowState};
use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;

/// Node name [`tools_condition`] routes to
pub const TOOLS_NODE: &str = "tools";

pub struct ToolNode {
    tools: Vec<Arc<dyn Tool>>,
    /// Argument validators, compiled once, same order as `tools`
    validators: Vec<SchemaValidator>,
    /// HashMap for O(1) tool lookups
    tool_map: HashMap<String, usize>,
}

impl ToolNode {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        let tool_map = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name().to_string(), i))
            .collect();
        let validators = tools
            .iter()
            .map(|t| SchemaValidator::new(t.schema()))
            .collect();
        Self {
            tools,
            validators,
            tool_map,
        }
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    fn get_tool(&self, name: &str) -> Option<(&Arc<dyn Tool>, &SchemaValidator)> {
        self.tool_map
            .get(name)
            .map(|&i| (&self.tools[i], &self.validators[i]))
    }

    /// Look up, validate and execute one call
    pub async fn invoke_call(&self, call: &ToolCall) -> Result<ToolResult, LatticeError> {
        let (tool, validator) = self.get_tool(&call.name).ok_or_else(|| {
            log::error!("Tool {} not found", call.name);
            LatticeError::tool_not_found(&call.name)
        })?;
        validator
            .validate(&call.args)
            .map_err(|message| LatticeError::InvalidArguments {
                tool: call.name.clone(),
                message,
            })?;

        log::info!("Tool call: {} {}", call.name, call.args);
        let content = tool.execute(call.args.clone()).await.map_err(|e| {
            log::error!("Tool {} failed: {}", call.name, e);
            LatticeError::ToolExecution {
                tool: call.name.clone(),
                message: e.to_string(),
            }
        })?;
        log::info!("Tool {} response: {}", call.name, content);

        Ok(ToolResult {
            call_id: call.id.clone(),
            name: call.name.clone(),
            content,
        })
    }

    /// Run every call concurrently; results keep the order of `calls`
    pub async fn invoke_calls(&self, calls: &[ToolCall]) -> Result<Vec<ToolResult>, LatticeError> {
        try_join_all(calls.iter().map(|call| self.invoke_call(call))).await
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn run(&self, state: WorkflowState) -> Result<StateUpdate, LatticeError> {
        let messages = state.messages()?;
        let calls: Vec<ToolCall> = match messages.last() {
            Some(last) => last.tool_calls().into_iter().cloned().collect(),
            None => return Err(LatticeError::other("no message to take tool calls from")),
        };
        if calls.is_empty() {
            log::warn!("Tool node reached without pending tool calls");
            return Ok(StateUpdate::new());
        }

        let results = self.invoke_calls(&calls).await?;
        Ok(StateUpdate::messages(
            results.into_iter().map(Message::tool_result).collect(),
        ))
    }
}

/// `"tools"` when the last message requests tools, else [`END`]
pub fn tools_condition(state: &WorkflowState) -> Route {
    let wants_tools = state
        .messages()
        .ok()
        .and_then(|messages| messages.last().map(Message::has_tool_calls))
        .unwrap_or(false);
    if wants_tools {
        Route::from(TOOLS_NODE)
    } else {
        Route::from(END)
    }
}
