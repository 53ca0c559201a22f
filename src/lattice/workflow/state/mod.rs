// SPDX-License-Identifier: MIT

//! State management for graph workflows
//!
//! This module provides:
//! - `StateSchema` - defines the shape, types and reducers of workflow state
//! - `WorkflowState` - runtime state storage with reducer support
//! - `StateUpdate` - the partial state a node returns

mod schema;
mod store;

pub use schema::{FieldType, ReducerType, StateFieldDef, StateSchema};
pub use store::{StateUpdate, WorkflowState};
