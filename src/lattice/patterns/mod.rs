// SPDX-License-Identifier: MIT

//! Example workflows offered by the CLI menu
//!
//! Each module exposes `build` for the graph (or agent) and `run`, which
//! invokes it on the example input and returns a printable report.

pub mod agent_behavior;
pub mod building_blocks;
pub mod calculator_agent;
pub mod evaluator_optimizer;
pub mod orchestrator_worker;
pub mod parallelization;
pub mod prompt_chaining;
pub mod routing;
pub mod simple_agent;

use crate::adk::error::LatticeError;
use crate::adk::model::ChatModel;
use crate::lattice::workflow::graph::{node_fn, CompiledGraph, Node};
use crate::lattice::workflow::registry::ToolRegistry;
use crate::lattice::workflow::state::{StateUpdate, WorkflowState};
use clap::ValueEnum;
use std::fmt;

/// Name under which the web search tool is registered
pub const SEARCH_TOOL: &str = "tavily_search_results_json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Example {
    SimpleAgent,
    AgentBehavior,
    CalculatorAgent,
    BuildingBlocks,
    PromptChaining,
    Parallelization,
    Routing,
    OrchestratorWorker,
    EvaluatorOptimizer,
}

impl Example {
    pub const ALL: [Example; 9] = [
        Example::SimpleAgent,
        Example::AgentBehavior,
        Example::CalculatorAgent,
        Example::BuildingBlocks,
        Example::PromptChaining,
        Example::Parallelization,
        Example::Routing,
        Example::OrchestratorWorker,
        Example::EvaluatorOptimizer,
    ];

    /// Menu label
    pub fn label(self) -> &'static str {
        match self {
            Example::SimpleAgent => "Simple agent",
            Example::AgentBehavior => "Agent behavior",
            Example::CalculatorAgent => "Calculator agent",
            Example::BuildingBlocks => "Building blocks",
            Example::PromptChaining => "Prompt chaining",
            Example::Parallelization => "Parallelization",
            Example::Routing => "Routing",
            Example::OrchestratorWorker => "Orchestrator-Worker",
            Example::EvaluatorOptimizer => "Evaluator-optimizer",
        }
    }

    /// Run the example and return its report
    pub async fn run(self, chat: &ChatModel, registry: &ToolRegistry) -> Result<String, LatticeError> {
        log::info!("Running example '{}' on {}", self, chat.name());
        match self {
            Example::SimpleAgent => simple_agent::run(chat, registry).await,
            Example::AgentBehavior => agent_behavior::run(chat, registry).await,
            Example::CalculatorAgent => calculator_agent::run(chat, registry).await,
            Example::BuildingBlocks => building_blocks::run(chat, registry).await,
            Example::PromptChaining => prompt_chaining::run(chat).await,
            Example::Parallelization => parallelization::run(chat).await,
            Example::Routing => routing::run(chat).await,
            Example::OrchestratorWorker => orchestrator_worker::run(chat).await,
            Example::EvaluatorOptimizer => evaluator_optimizer::run(chat).await,
        }
    }

    /// The workflow graph of the example; building blocks has none
    pub async fn graph(
        self,
        chat: &ChatModel,
        registry: &ToolRegistry,
    ) -> Result<Option<CompiledGraph>, LatticeError> {
        let graph = match self {
            Example::SimpleAgent => {
                let tools = registry.resolve(&[SEARCH_TOOL]).await?;
                simple_agent::build(chat, tools)?.graph().clone()
            }
            Example::AgentBehavior => {
                agent_behavior::build(chat, registry.resolve(&[SEARCH_TOOL]).await?)?
            }
            Example::CalculatorAgent => {
                let tools = registry.resolve(&calculator_agent::TOOLS).await?;
                calculator_agent::build(chat, tools)?.graph().clone()
            }
            Example::BuildingBlocks => return Ok(None),
            Example::PromptChaining => prompt_chaining::build(chat)?,
            Example::Parallelization => parallelization::build(chat)?,
            Example::Routing => routing::build(chat)?,
            Example::OrchestratorWorker => orchestrator_worker::build(chat)?,
            Example::EvaluatorOptimizer => evaluator_optimizer::build(chat)?,
        };
        Ok(Some(graph))
    }
}

impl fmt::Display for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Node sending the prompt built from the state and storing the reply under `output`
pub(crate) fn prompt_node<F>(chat: &ChatModel, output: &'static str, prompt: F) -> impl Node
where
    F: Fn(&WorkflowState) -> String + Send + Sync + 'static,
{
    let chat = chat.clone();
    node_fn(move |state: WorkflowState| {
        let chat = chat.clone();
        let prompt = prompt(&state);
        async move {
            let reply = chat.invoke_text(&prompt).await?;
            Ok(StateUpdate::new().set(output, reply))
        }
    })
}

/// String field of `state`, empty when unset
pub(crate) fn text_field(state: &WorkflowState, key: &str) -> String {
    state.get_str(key).unwrap_or_default().to_string()
}
