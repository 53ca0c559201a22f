// SPDX-License-Identifier: MIT

//! Workflow engine - state, graphs, checkpoints and tool registry

pub mod checkpoint;
pub mod graph;
pub mod mermaid;
pub mod registry;
pub mod state;

pub use checkpoint::{Checkpoint, MemorySaver};
pub use graph::{
    node_fn, CompiledGraph, GraphConfig, Node, Route, StateGraph, WorkflowEvent, END, START,
};
pub use registry::ToolRegistry;
pub use state::{FieldType, ReducerType, StateSchema, StateUpdate, WorkflowState};
