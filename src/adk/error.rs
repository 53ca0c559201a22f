// SPDX-License-Identifier: MIT

//! Typed error handling for lattice-rs
//!
//! Every failure of a workflow run surfaces as a [`LatticeError`]. Node
//! failures are wrapped in [`LatticeError::Node`] so the caller always learns
//! which node raised them; [`LatticeError::root`] reaches the original cause.

use thiserror::Error;

/// Top-level error type for lattice-rs
#[derive(Debug, Error)]
pub enum LatticeError {
    /// Configuration errors (unsupported provider, bad env values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model lacks a capability the caller asked for
    #[error("Model '{model}' does not support {capability}")]
    MissingCapability { model: String, capability: String },

    /// A model requested a tool that is not registered
    #[error("Tool '{name}' not found")]
    ToolNotFound { name: String },

    /// Tool arguments failed schema validation
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    /// The tool body itself failed
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// Any failure raised inside a node body
    #[error("Node '{node}' failed: {source}")]
    Node {
        node: String,
        #[source]
        source: Box<LatticeError>,
    },

    /// Structured output did not match its schema
    #[error("Output does not match schema '{schema}': {message}")]
    SchemaValidation { schema: String, message: String },

    /// State merge errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Graph construction and execution errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Model/LLM-specific errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// API errors from external services
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic error wrapper for boundary errors
    #[error("{0}")]
    Other(String),
}

/// Graph construction and execution errors
#[derive(Debug, Error, PartialEq)]
pub enum WorkflowError {
    /// `__start__` and `__end__` cannot be used as node names
    #[error("'{0}' is a reserved node name")]
    ReservedNodeName(String),

    #[error("Node '{0}' is already registered")]
    DuplicateNode(String),

    #[error("Unknown node '{0}'")]
    UnknownNode(String),

    /// No edge leaves the start marker
    #[error("Workflow '{0}' has no entry edge from __start__")]
    MissingEntry(String),

    /// A node with no outgoing edge could never hand control on
    #[error("Node '{0}' has no outgoing edge")]
    DeadEnd(String),

    /// A path table points at a node that does not exist
    #[error("Edge from '{node}' targets unknown node '{target}'")]
    UnknownTarget { node: String, target: String },

    /// A router returned a label missing from its path table
    #[error("Router on '{node}' returned unmapped label '{label}'")]
    UnmappedLabel { node: String, label: String },

    /// Schema field names must not be empty
    #[error("State schema contains an empty field name")]
    EmptySchemaField,

    #[error("Step limit of {0} reached without reaching __end__")]
    StepLimitExceeded(usize),
}

/// State merge errors
#[derive(Debug, Error, PartialEq)]
pub enum StateError {
    /// Update value does not match the declared field type
    #[error("Field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// The declared reducer can never apply to the declared type
    #[error("Field '{field}' of type {field_type} cannot use reducer {reducer}")]
    IncompatibleReducer {
        field: String,
        reducer: String,
        field_type: String,
    },
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Unsupported LLM provider: {0}")]
    UnsupportedProvider(String),

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),
}

impl LatticeError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a tool not found error
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound { name: name.into() }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Wrap an error raised by the node `node`
    pub fn in_node(node: impl Into<String>, source: LatticeError) -> Self {
        Self::Node {
            node: node.into(),
            source: Box::new(source),
        }
    }

    /// The innermost cause, skipping node wrappers
    pub fn root(&self) -> &LatticeError {
        match self {
            Self::Node { source, .. } => source.root(),
            other => other,
        }
    }

    /// Name of the innermost node that raised this error, if any
    pub fn node_name(&self) -> Option<&str> {
        match self {
            Self::Node { node, source } => source.node_name().or(Some(node.as_str())),
            _ => None,
        }
    }

    /// True for errors that stem from configuration rather than execution
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.root(),
            Self::Config(_)
                | Self::MissingCapability { .. }
                | Self::Model(ModelError::ApiKeyMissing(_))
                | Self::Model(ModelError::UnsupportedProvider(_))
                | Self::Workflow(WorkflowError::UnmappedLabel { .. })
                | Self::Workflow(WorkflowError::UnknownTarget { .. })
        )
    }
}

impl From<&str> for LatticeError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for LatticeError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

// Boundary traits (models, tools) report boxed errors
impl From<Box<dyn std::error::Error + Send + Sync>> for LatticeError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        match err.downcast::<LatticeError>() {
            Ok(inner) => *inner,
            Err(err) => Self::Other(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_peels_node_wrappers() {
        let err = LatticeError::in_node(
            "outer",
            LatticeError::in_node("tools", LatticeError::tool_not_found("search")),
        );
        assert!(matches!(err.root(), LatticeError::ToolNotFound { name } if name == "search"));
        assert_eq!(err.node_name(), Some("tools"));
    }

    #[test]
    fn test_node_error_message_names_node() {
        let err = LatticeError::in_node("evaluator", LatticeError::other("boom"));
        assert_eq!(err.to_string(), "Node 'evaluator' failed: boom");
    }

    #[test]
    fn test_unmapped_label_is_configuration() {
        let err = LatticeError::in_node(
            "router",
            WorkflowError::UnmappedLabel {
                node: "router".to_string(),
                label: "dance".to_string(),
            }
            .into(),
        );
        assert!(err.is_configuration());
        assert!(!LatticeError::other("network").is_configuration());
    }

    #[test]
    fn test_boxed_lattice_error_roundtrips() {
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(LatticeError::tool_not_found("add"));
        let err: LatticeError = boxed.into();
        assert!(matches!(err, LatticeError::ToolNotFound { .. }));

        let boxed: Box<dyn std::error::Error + Send + Sync> = "plain".into();
        let err: LatticeError = boxed.into();
        assert_eq!(err.to_string(), "plain");
    }
}
