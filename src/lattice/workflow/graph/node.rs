// SPDX-License-Identifier: MIT

use crate::adk::error::LatticeError;
use crate::lattice::workflow::state::{StateUpdate, WorkflowState};
use async_trait::async_trait;
use std::future::Future;

/// A unit of work in a workflow graph.
///
/// Nodes receive an owned snapshot of the state and return the fields they
/// want changed. They never see the updates of siblings running in the
/// same step.
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: WorkflowState) -> Result<StateUpdate, LatticeError>;
}

/// Node backed by an async closure, see [`node_fn`]
pub struct FnNode<F> {
    f: F,
}

/// Adapt an async closure into a [`Node`]
pub fn node_fn<F, Fut>(f: F) -> FnNode<F>
where
    F: Fn(WorkflowState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StateUpdate, LatticeError>> + Send + 'static,
{
    FnNode { f }
}

#[async_trait]
impl<F, Fut> Node for FnNode<F>
where
    F: Fn(WorkflowState) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StateUpdate, LatticeError>> + Send + 'static,
{
    async fn run(&self, state: WorkflowState) -> Result<StateUpdate, LatticeError> {
        (self.f)(state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_node_fn_reads_snapshot() {
        let node = node_fn(|state: WorkflowState| async move {
            let topic = state.get_str("topic").unwrap_or("nothing").to_string();
            Ok(StateUpdate::new().set("joke", format!("a joke about {}", topic)))
        });

        let state = WorkflowState::default()
            .merged(StateUpdate::new().set("topic", "cats"))
            .unwrap();
        let update = node.run(state).await.unwrap();
        assert_eq!(update.get("joke"), Some(&json!("a joke about cats")));
    }
}
