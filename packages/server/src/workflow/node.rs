use anyhow::Result;
use async_trait::async_trait;

use super::state::GraphState;

/// One named step of a workflow graph.
///
/// A node reads the current state and returns only the fields it changes.
#[async_trait]
pub trait Node<S: GraphState>: Send + Sync {
    /// Unique within a graph; edges refer to nodes by this name.
    fn name(&self) -> &str;

    async fn execute(&self, state: &S) -> Result<S::Patch>;
}
