// SPDX-License-Identifier: MIT

//! Two-operand arithmetic tools: `add`, `multiply`, `divide`

use crate::adk::tool::{schema_for, Tool};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;

static ARITHMETIC_SCHEMA: Lazy<Value> = Lazy::new(schema_for::<ArithmeticArgs>);

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ArithmeticArgs {
    /// first number
    pub a: f64,
    /// second number
    pub b: f64,
}

type Operation = fn(f64, f64) -> Result<f64, String>;

pub struct ArithmeticTool {
    name: &'static str,
    description: &'static str,
    op: Operation,
}

impl ArithmeticTool {
    pub fn add() -> Self {
        Self {
            name: "add",
            description: "Add two numbers together",
            op: |a, b| Ok(a + b),
        }
    }

    pub fn multiply() -> Self {
        Self {
            name: "multiply",
            description: "Multiply two numbers together",
            op: |a, b| Ok(a * b),
        }
    }

    pub fn divide() -> Self {
        Self {
            name: "divide",
            description: "Divide two numbers",
            op: |a, b| {
                if b == 0.0 {
                    Err("division by zero".to_string())
                } else {
                    Ok(a / b)
                }
            },
        }
    }
}

#[async_trait]
impl Tool for ArithmeticTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn schema(&self) -> &Value {
        &ARITHMETIC_SCHEMA
    }

    async fn execute(&self, input: Value) -> Result<Value, Box<dyn Error + Send + Sync>> {
        let args: ArithmeticArgs = serde_json::from_value(input)?;
        let result = (self.op)(args.a, args.b)?;
        Ok(json!(result))
    }
}

/// `add`, `multiply` and `divide`
pub fn create_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ArithmeticTool::add()),
        Arc::new(ArithmeticTool::multiply()),
        Arc::new(ArithmeticTool::divide()),
    ]
}
