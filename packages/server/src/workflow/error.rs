use thiserror::Error;

/// Errors raised while compiling or walking a workflow graph.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid graph {graph}: {reason}")]
    InvalidGraph { graph: String, reason: String },

    #[error("node {node} failed in graph {graph}")]
    NodeFailed {
        graph: String,
        node: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("router after {node} chose undeclared target {target}")]
    InvalidRoute { node: String, target: String },

    /// Generation produced nothing usable, so nothing was saved.
    #[error("{pipeline} produced no entities")]
    EmptyGeneration { pipeline: &'static str },

    #[error("pipeline {pipeline} cannot run on {state} state")]
    PayloadMismatch {
        pipeline: &'static str,
        state: &'static str,
    },
}

impl WorkflowError {
    pub(crate) fn invalid(graph: &str, reason: impl Into<String>) -> Self {
        WorkflowError::InvalidGraph {
            graph: graph.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether re-running the same task could succeed.
    ///
    /// `NodeFailed` defers to its cause; callers walk the chain.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkflowError::InvalidGraph { .. }
            | WorkflowError::InvalidRoute { .. }
            | WorkflowError::PayloadMismatch { .. } => false,
            WorkflowError::NodeFailed { .. } | WorkflowError::EmptyGeneration { .. } => true,
        }
    }
}
