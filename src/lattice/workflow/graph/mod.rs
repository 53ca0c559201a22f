// SPDX-License-Identifier: MIT

//! Graph-based workflow execution
//!
//! A workflow is built with [`StateGraph`], frozen by
//! [`StateGraph::compile`] and run any number of times through
//! [`CompiledGraph::invoke`].

mod builder;
mod edge;
mod executor;
mod node;

pub use builder::StateGraph;
pub use edge::{Route, Send, END, START};
pub(crate) use edge::Edge;
pub use executor::{CompiledGraph, GraphConfig, WorkflowEvent};
pub use node::{node_fn, FnNode, Node};
