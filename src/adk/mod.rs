// SPDX-License-Identifier: MIT

//! Agent development kit: errors, models, tools and the agent trait.

pub mod agent;
pub mod error;
pub mod model;
pub mod tool;
