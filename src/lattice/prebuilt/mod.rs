// SPDX-License-Identifier: MIT

//! Ready-made nodes and agents built on the workflow engine

pub mod tool_agent;
pub mod tool_node;

pub use tool_agent::{agent_graph, ToolCallingAgent, AGENT_NODE};
pub use tool_node::{tools_condition, ToolNode, TOOLS_NODE};
