// SPDX-License-Identifier: MIT

//! Graph workflow executor
//!
//! Runs in supersteps. Every task of a step sees the same state snapshot;
//! the updates they return are merged in completion order once all of
//! them finished, and only then are the outgoing edges of the completed
//! nodes resolved into the next step's tasks.

use super::edge::{Edge, Route, END, START};
use super::node::Node;
use crate::adk::error::{LatticeError, WorkflowError};
use crate::lattice::workflow::state::{StateSchema, StateUpdate, WorkflowState};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

/// Execution limits of a compiled graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphConfig {
    /// Maximum number of supersteps; `None` runs until the graph ends
    pub max_steps: Option<usize>,
    /// Maximum number of nodes running at once within a step
    pub max_concurrency: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_steps: Some(25),
            max_concurrency: 8,
        }
    }
}

/// Progress notifications emitted by [`CompiledGraph::invoke_with_events`]
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    StepStarted {
        step: usize,
        nodes: Vec<String>,
    },
    NodeCompleted {
        step: usize,
        node: String,
        update: StateUpdate,
    },
    NodeFailed {
        step: usize,
        node: String,
        error: String,
    },
    Finished {
        steps: usize,
    },
}

/// A pending node invocation
struct Task {
    node: String,
    /// Worker input of a fan-out send; `None` runs on the shared state
    arg: Option<StateUpdate>,
}

/// Next step's tasks; plain targets run once per step, sends every time
#[derive(Default)]
struct Frontier {
    tasks: Vec<Task>,
    scheduled: HashSet<String>,
}

impl Frontier {
    fn push_target(&mut self, node: &str) {
        if node != END && self.scheduled.insert(node.to_string()) {
            self.tasks.push(Task {
                node: node.to_string(),
                arg: None,
            });
        }
    }

    fn push_send(&mut self, node: String, arg: StateUpdate) {
        self.tasks.push(Task {
            node,
            arg: Some(arg),
        });
    }
}

/// Immutable, validated workflow graph
#[derive(Clone)]
pub struct CompiledGraph {
    name: String,
    schema: Arc<StateSchema>,
    nodes: Vec<(String, Arc<dyn Node>)>,
    edges: Vec<(String, Edge)>,
    config: GraphConfig,
}

impl CompiledGraph {
    pub(crate) fn new(
        name: String,
        schema: Arc<StateSchema>,
        nodes: Vec<(String, Arc<dyn Node>)>,
        edges: Vec<(String, Edge)>,
        config: GraphConfig,
    ) -> Self {
        Self {
            name,
            schema,
            nodes,
            edges,
            config,
        }
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Cap the number of supersteps; `None` removes the cap
    pub fn with_step_limit(mut self, max_steps: Option<usize>) -> Self {
        self.config.max_steps = max_steps;
        self
    }

    pub fn config(&self) -> GraphConfig {
        self.config
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<StateSchema> {
        &self.schema
    }

    /// Node names in registration order
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub(crate) fn edges(&self) -> &[(String, Edge)] {
        &self.edges
    }

    /// Mermaid `graph TD` text of this graph
    pub fn draw_mermaid(&self) -> String {
        crate::lattice::workflow::mermaid::draw_mermaid(self)
    }

    fn node(&self, name: &str) -> Option<&Arc<dyn Node>> {
        self.nodes.iter().find(|(n, _)| n == name).map(|(_, node)| node)
    }

    /// Run the graph from `input` until no task is left
    pub async fn invoke(&self, input: StateUpdate) -> Result<WorkflowState, LatticeError> {
        self.execute(input, None).await
    }

    /// Like [`CompiledGraph::invoke`], reporting progress on `events`
    pub async fn invoke_with_events(
        &self,
        input: StateUpdate,
        events: mpsc::Sender<WorkflowEvent>,
    ) -> Result<WorkflowState, LatticeError> {
        self.execute(input, Some(&events)).await
    }

    async fn execute(
        &self,
        input: StateUpdate,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> Result<WorkflowState, LatticeError> {
        let mut state = WorkflowState::from_update(self.schema.clone(), input)?;
        let mut frontier = Frontier::default();
        self.resolve(START, &state, &mut frontier)?;

        let mut step = 0;
        while !frontier.tasks.is_empty() {
            if let Some(limit) = self.config.max_steps {
                if step >= limit {
                    log::error!("Workflow '{}' hit the step limit of {}", self.name, limit);
                    return Err(WorkflowError::StepLimitExceeded(limit).into());
                }
            }
            step += 1;

            let names: Vec<String> = frontier.tasks.iter().map(|t| t.node.clone()).collect();
            log::info!("Workflow '{}' step {}: {:?}", self.name, step, names);
            emit(events, WorkflowEvent::StepStarted { step, nodes: names }).await;

            let completed = self.run_step(step, &state, frontier.tasks, events).await?;

            for (node, update) in &completed {
                state
                    .merge(update.clone())
                    .map_err(|e| LatticeError::in_node(node.clone(), e.into()))?;
            }

            frontier = Frontier::default();
            let mut resolved = HashSet::new();
            for (node, _) in &completed {
                if resolved.insert(node.as_str()) {
                    self.resolve(node, &state, &mut frontier)?;
                }
            }
        }

        log::info!("Workflow '{}' finished after {} steps", self.name, step);
        emit(events, WorkflowEvent::Finished { steps: step }).await;
        Ok(state)
    }

    /// Run every task of one step; the first failure drops the rest
    async fn run_step(
        &self,
        step: usize,
        state: &WorkflowState,
        tasks: Vec<Task>,
        events: Option<&mpsc::Sender<WorkflowEvent>>,
    ) -> Result<Vec<(String, StateUpdate)>, LatticeError> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut running = FuturesUnordered::new();

        for task in tasks {
            let node = self
                .node(&task.node)
                .cloned()
                .ok_or_else(|| WorkflowError::UnknownNode(task.node.clone()))?;
            let input = match task.arg {
                None => state.clone(),
                Some(arg) => state
                    .fork(arg)
                    .map_err(|e| LatticeError::in_node(task.node.clone(), e.into()))?,
            };
            let permits = permits.clone();
            let name = task.node;

            running.push(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => node.run(input).await,
                    Err(e) => Err(LatticeError::other(e.to_string())),
                };
                (name, result)
            });
        }

        let mut completed = Vec::with_capacity(running.len());
        while let Some((name, result)) = running.next().await {
            match result {
                Ok(update) => {
                    log::info!("Node '{}' completed", name);
                    emit(
                        events,
                        WorkflowEvent::NodeCompleted {
                            step,
                            node: name.clone(),
                            update: update.clone(),
                        },
                    )
                    .await;
                    completed.push((name, update));
                }
                Err(e) => {
                    log::error!("Node '{}' failed: {}", name, e);
                    emit(
                        events,
                        WorkflowEvent::NodeFailed {
                            step,
                            node: name.clone(),
                            error: e.to_string(),
                        },
                    )
                    .await;
                    return Err(LatticeError::in_node(name, e));
                }
            }
        }
        Ok(completed)
    }

    /// Turn the outgoing edges of `source` into tasks for the next step
    fn resolve(
        &self,
        source: &str,
        state: &WorkflowState,
        frontier: &mut Frontier,
    ) -> Result<(), LatticeError> {
        for (from, edge) in &self.edges {
            if from != source {
                continue;
            }
            match edge {
                Edge::Direct(target) => frontier.push_target(target),
                Edge::Conditional { router, paths } => {
                    let labels = match router(state) {
                        Route::Label(label) => vec![label],
                        Route::Labels(labels) => labels,
                        Route::Sends(sends) => {
                            // Checked as a whole so a bad send schedules nothing
                            for send in &sends {
                                let declared = match paths {
                                    Some(paths) => paths.iter().any(|(_, t)| *t == send.node),
                                    None => true,
                                };
                                if !declared {
                                    log::error!(
                                        "Router on '{}' sent to undeclared target '{}'",
                                        source,
                                        send.node
                                    );
                                    return Err(WorkflowError::UnmappedLabel {
                                        node: source.to_string(),
                                        label: send.node.clone(),
                                    }
                                    .into());
                                }
                                if self.node(&send.node).is_none() {
                                    return Err(WorkflowError::UnknownTarget {
                                        node: source.to_string(),
                                        target: send.node.clone(),
                                    }
                                    .into());
                                }
                            }
                            for send in sends {
                                frontier.push_send(send.node, send.arg);
                            }
                            continue;
                        }
                    };

                    for label in labels {
                        let target = match paths {
                            Some(paths) => Edge::lookup(paths, &label),
                            None if label == END || self.node(&label).is_some() => {
                                Some(label.as_str())
                            }
                            None => None,
                        };
                        match target {
                            Some(target) => {
                                log::debug!("Route {} -[{}]-> {}", source, label, target);
                                frontier.push_target(target);
                            }
                            None => {
                                log::error!(
                                    "Router on '{}' returned unmapped label '{}'",
                                    source,
                                    label
                                );
                                return Err(WorkflowError::UnmappedLabel {
                                    node: source.to_string(),
                                    label: label.clone(),
                                }
                                .into());
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

async fn emit(events: Option<&mpsc::Sender<WorkflowEvent>>, event: WorkflowEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event).await;
    }
}
