// SPDX-License-Identifier: MIT

//! Lattice - graph workflows over chat models
//!
//! - [workflow] - state, graph builder and superstep engine
//! - [prebuilt] - tool node and the tool-calling agent loop
//! - [tools] - arithmetic and web search tools
//! - [patterns] - the example workflows offered by the CLI

pub mod patterns;
pub mod prebuilt;
pub mod tools;
pub mod workflow;
