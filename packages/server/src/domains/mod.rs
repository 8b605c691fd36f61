// Business domains. Each owns its request models, prompts, graph state,
// nodes, and pipeline wiring.

pub mod chat;
pub mod mission_steps;
pub mod missions;
pub mod pipelines;
pub mod side_jobs;

pub use pipelines::{register_pipelines, run_pipeline, Pipeline, WorkflowState};
