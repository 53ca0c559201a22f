// SPDX-License-Identifier: MIT

//! Graph builder - wires nodes and edges into a [`CompiledGraph`]
//!
//! Registration never fails on its own; every mistake is collected and the
//! first one is reported by [`StateGraph::compile`].

use super::edge::{Edge, Route, END, START};
use super::executor::{CompiledGraph, GraphConfig};
use super::node::Node;
use crate::adk::error::{LatticeError, WorkflowError};
use crate::lattice::workflow::state::{StateSchema, WorkflowState};
use std::collections::HashSet;
use std::sync::Arc;

/// Consuming builder for a workflow graph
pub struct StateGraph {
    name: String,
    schema: StateSchema,
    nodes: Vec<(String, Arc<dyn Node>)>,
    edges: Vec<(String, Edge)>,
    errors: Vec<WorkflowError>,
}

impl StateGraph {
    pub fn new(name: impl Into<String>, schema: StateSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            nodes: Vec::new(),
            edges: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn add_node(mut self, name: &str, node: impl Node + 'static) -> Self {
        if name == START || name == END {
            self.errors
                .push(WorkflowError::ReservedNodeName(name.to_string()));
        } else if self.nodes.iter().any(|(n, _)| n == name) {
            self.errors.push(WorkflowError::DuplicateNode(name.to_string()));
        } else {
            self.nodes.push((name.to_string(), Arc::new(node)));
        }
        self
    }

    /// Always continue from `source` to `target`
    pub fn add_edge(mut self, source: &str, target: &str) -> Self {
        if source == END {
            self.errors.push(WorkflowError::ReservedNodeName(END.to_string()));
        } else if target == START {
            self.errors
                .push(WorkflowError::ReservedNodeName(START.to_string()));
        } else {
            self.edges
                .push((source.to_string(), Edge::Direct(target.to_string())));
        }
        self
    }

    /// Route through `router`, mapping each returned label with `path_map`
    pub fn add_conditional_edges<F, R>(self, source: &str, router: F, path_map: &[(&str, &str)]) -> Self
    where
        F: Fn(&WorkflowState) -> R + Send + Sync + 'static,
        R: Into<Route>,
    {
        let paths = path_map
            .iter()
            .map(|(label, target)| (label.to_string(), target.to_string()))
            .collect();
        self.push_conditional(source, router, Some(paths))
    }

    /// Route through `router` whose labels are the node names in `targets`
    pub fn add_conditional_edges_to<F, R>(self, source: &str, router: F, targets: &[&str]) -> Self
    where
        F: Fn(&WorkflowState) -> R + Send + Sync + 'static,
        R: Into<Route>,
    {
        let paths = targets
            .iter()
            .map(|target| (target.to_string(), target.to_string()))
            .collect();
        self.push_conditional(source, router, Some(paths))
    }

    /// Route through `router` with no table; labels are checked while running
    pub fn add_dynamic_edges<F, R>(self, source: &str, router: F) -> Self
    where
        F: Fn(&WorkflowState) -> R + Send + Sync + 'static,
        R: Into<Route>,
    {
        self.push_conditional(source, router, None)
    }

    fn push_conditional<F, R>(
        mut self,
        source: &str,
        router: F,
        paths: Option<Vec<(String, String)>>,
    ) -> Self
    where
        F: Fn(&WorkflowState) -> R + Send + Sync + 'static,
        R: Into<Route>,
    {
        if source == END {
            self.errors.push(WorkflowError::ReservedNodeName(END.to_string()));
            return self;
        }
        self.edges.push((
            source.to_string(),
            Edge::Conditional {
                router: Arc::new(move |state: &WorkflowState| -> Route { router(state).into() }),
                paths,
            },
        ));
        self
    }

    /// Validate the wiring and freeze the graph
    pub fn compile(mut self) -> Result<CompiledGraph, LatticeError> {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0).into());
        }
        self.schema.validate()?;

        let names: HashSet<&str> = self.nodes.iter().map(|(n, _)| n.as_str()).collect();
        let is_node = |name: &str| names.contains(name);

        for (source, edge) in &self.edges {
            if source != START && !is_node(source) {
                return Err(WorkflowError::UnknownNode(source.clone()).into());
            }
            match edge {
                Edge::Direct(target) => {
                    if target != END && !is_node(target) {
                        return Err(WorkflowError::UnknownNode(target.clone()).into());
                    }
                }
                Edge::Conditional {
                    paths: Some(paths), ..
                } => {
                    for (_, target) in paths {
                        if target != END && !is_node(target) {
                            return Err(WorkflowError::UnknownTarget {
                                node: source.clone(),
                                target: target.clone(),
                            }
                            .into());
                        }
                    }
                }
                Edge::Conditional { paths: None, .. } => {}
            }
        }

        if !self.edges.iter().any(|(source, _)| source == START) {
            return Err(WorkflowError::MissingEntry(self.name).into());
        }
        for (name, _) in &self.nodes {
            if !self.edges.iter().any(|(source, _)| source == name) {
                return Err(WorkflowError::DeadEnd(name.clone()).into());
            }
        }

        log::debug!(
            "Compiled workflow '{}' with {} nodes and {} edges",
            self.name,
            self.nodes.len(),
            self.edges.len()
        );

        Ok(CompiledGraph::new(
            self.name,
            Arc::new(self.schema),
            self.nodes,
            self.edges,
            GraphConfig::default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::workflow::graph::node_fn;
    use crate::lattice::workflow::state::StateUpdate;

    fn noop() -> impl Node {
        node_fn(|_state| async { Ok(StateUpdate::new()) })
    }

    fn compile_err(graph: StateGraph) -> LatticeError {
        match graph.compile() {
            Ok(_) => panic!("expected compile error"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_compile_simple_chain() {
        let graph = StateGraph::new("chain", StateSchema::new())
            .add_node("a", noop())
            .add_node("b", noop())
            .add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("b", END)
            .compile()
            .unwrap();
        assert_eq!(graph.node_names(), vec!["a", "b"]);
        assert_eq!(graph.name(), "chain");
    }

    #[test]
    fn test_reserved_and_duplicate_names() {
        let err = compile_err(StateGraph::new("g", StateSchema::new()).add_node(END, noop()));
        assert!(matches!(
            err,
            LatticeError::Workflow(WorkflowError::ReservedNodeName(ref n)) if n == END
        ));

        let err = compile_err(
            StateGraph::new("g", StateSchema::new())
                .add_node("a", noop())
                .add_node("a", noop()),
        );
        assert!(matches!(
            err,
            LatticeError::Workflow(WorkflowError::DuplicateNode(_))
        ));
    }

    #[test]
    fn test_unknown_edge_endpoint() {
        let err = compile_err(
            StateGraph::new("g", StateSchema::new())
                .add_node("a", noop())
                .add_edge(START, "a")
                .add_edge("a", "ghost"),
        );
        assert!(matches!(
            err,
            LatticeError::Workflow(WorkflowError::UnknownNode(ref n)) if n == "ghost"
        ));
    }

    #[test]
    fn test_path_map_targets_checked_at_compile_time() {
        let err = compile_err(
            StateGraph::new("g", StateSchema::new())
                .add_node("router", noop())
                .add_edge(START, "router")
                .add_conditional_edges("router", |_| "x", &[("x", "missing")]),
        );
        assert!(err.is_configuration());
        assert!(matches!(
            err,
            LatticeError::Workflow(WorkflowError::UnknownTarget { ref target, .. }) if target == "missing"
        ));
    }

    #[test]
    fn test_missing_entry_and_dead_end() {
        let err = compile_err(
            StateGraph::new("no-entry", StateSchema::new())
                .add_node("a", noop())
                .add_edge("a", END),
        );
        assert!(matches!(
            err,
            LatticeError::Workflow(WorkflowError::MissingEntry(ref n)) if n == "no-entry"
        ));

        let err = compile_err(
            StateGraph::new("g", StateSchema::new())
                .add_node("a", noop())
                .add_node("b", noop())
                .add_edge(START, "a")
                .add_edge("a", END),
        );
        assert!(matches!(
            err,
            LatticeError::Workflow(WorkflowError::DeadEnd(ref n)) if n == "b"
        ));
    }

    #[test]
    fn test_invalid_schema_rejected() {
        use crate::lattice::workflow::state::{FieldType, ReducerType};

        let schema = StateSchema::new().with_reducer("n", FieldType::Boolean, ReducerType::Max);
        let err = compile_err(
            StateGraph::new("g", schema)
                .add_node("a", noop())
                .add_edge(START, "a")
                .add_edge("a", END),
        );
        assert!(matches!(err, LatticeError::State(_)));
    }
}
