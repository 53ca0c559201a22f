// SPDX-License-Identifier: MIT

pub mod arithmetic;
pub mod search;

pub use arithmetic::{create_tools, ArithmeticArgs, ArithmeticTool};
pub use search::TavilySearchTool;
