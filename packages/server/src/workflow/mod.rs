//! Workflow engine: compiled graphs of nodes over a typed, mergeable state.
//!
//! ```text
//! GraphBuilder ──compile()──► WorkflowGraph
//!                                  │
//!      entry ─► node ─► merge(patch) ─► edge / router ─► ... ─► END
//! ```
//!
//! Domain pipelines supply a [`GenerationStep`] and a [`PersistenceStep`];
//! the generic [`GenerationNode`] and [`SaveNode`] do the model call, the
//! tolerant parsing and the transactional write.

mod error;
mod generation;
mod graph;
mod node;
mod persistence;
mod state;

pub use error::WorkflowError;
pub use generation::{parse_items, GenerationNode, GenerationOutput, GenerationStep};
pub use graph::{GraphBuilder, WorkflowGraph, END};
pub use node::Node;
pub use persistence::{correlate_ids, Draft, Persistable, PersistenceError, PersistenceStep, SaveNode, Saved};
pub use state::GraphState;
