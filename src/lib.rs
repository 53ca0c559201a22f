// SPDX-License-Identifier: MIT

//! lattice-rs - state-graph workflows over chat models
//!
//! - [adk] - model, tool and agent building blocks
//! - [lattice] - the workflow engine, prebuilt agents, tools and example patterns

pub mod adk;
pub mod lattice;
