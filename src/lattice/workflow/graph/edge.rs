// SPDX-License-Identifier: MIT

//! Edges, routes and fan-out sends

use crate::lattice::workflow::state::{StateUpdate, WorkflowState};
use std::sync::Arc;

/// Virtual node every run starts from
pub const START: &str = "__start__";
/// Virtual node that ends a branch
pub const END: &str = "__end__";

/// One worker invocation dispatched by a router.
///
/// The worker runs on a fresh state built from the schema defaults and
/// `arg`, not on the parent state. Its update is merged into the parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Send {
    pub node: String,
    pub arg: StateUpdate,
}

impl Send {
    pub fn new(node: impl Into<String>, arg: StateUpdate) -> Self {
        Self {
            node: node.into(),
            arg,
        }
    }
}

/// What a router decided
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Label(String),
    Labels(Vec<String>),
    Sends(Vec<Send>),
}

impl From<&str> for Route {
    fn from(label: &str) -> Self {
        Route::Label(label.to_string())
    }
}

impl From<String> for Route {
    fn from(label: String) -> Self {
        Route::Label(label)
    }
}

impl From<Vec<&str>> for Route {
    fn from(labels: Vec<&str>) -> Self {
        Route::Labels(labels.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for Route {
    fn from(labels: Vec<String>) -> Self {
        Route::Labels(labels)
    }
}

impl From<Send> for Route {
    fn from(send: Send) -> Self {
        Route::Sends(vec![send])
    }
}

impl From<Vec<Send>> for Route {
    fn from(sends: Vec<Send>) -> Self {
        Route::Sends(sends)
    }
}

pub(crate) type Router = Arc<dyn Fn(&WorkflowState) -> Route + std::marker::Send + Sync>;

/// Label to target table of a conditional edge; `None` means labels are node names
pub(crate) type PathMap = Option<Vec<(String, String)>>;

#[derive(Clone)]
pub(crate) enum Edge {
    Direct(String),
    Conditional { router: Router, paths: PathMap },
}

impl Edge {
    pub(crate) fn lookup<'a>(paths: &'a [(String, String)], label: &str) -> Option<&'a str> {
        paths
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, target)| target.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_conversions() {
        assert_eq!(Route::from("joke"), Route::Label("joke".to_string()));
        assert_eq!(
            Route::from(vec!["a", "b"]),
            Route::Labels(vec!["a".to_string(), "b".to_string()])
        );

        let send = Send::new("llm_call", StateUpdate::new().set("section", "intro"));
        assert_eq!(Route::from(send.clone()), Route::Sends(vec![send]));
    }

    #[test]
    fn test_lookup() {
        let paths = vec![
            ("Accepted".to_string(), END.to_string()),
            ("Rejected + Feedback".to_string(), "generator".to_string()),
        ];
        assert_eq!(Edge::lookup(&paths, "Accepted"), Some(END));
        assert_eq!(Edge::lookup(&paths, "Maybe"), None);
    }
}
