use std::sync::Arc;

use super::nodes::{GenerateSideJobs, RegenerateSideJobs, SaveSideJobs};
use super::state::SideJobState;
use crate::kernel::ServerDeps;
use crate::workflow::{GenerationNode, GraphBuilder, SaveNode, WorkflowError, WorkflowGraph, END};

/// generate_side_jobs -> save_side_jobs
pub fn generate_graph(deps: Arc<ServerDeps>) -> Result<WorkflowGraph<SideJobState>, WorkflowError> {
    GraphBuilder::new("generate_side_jobs")
        .add_node(GenerationNode::new(GenerateSideJobs, deps.clone()))
        .add_node(SaveNode::new(SaveSideJobs, deps))
        .set_entry("generate_side_jobs")
        .add_edge("generate_side_jobs", "save_side_jobs")
        .add_edge("save_side_jobs", END)
        .compile()
}

/// regenerate_side_jobs -> save_side_jobs, overwriting `side_job_ids` when given
pub fn regenerate_graph(deps: Arc<ServerDeps>) -> Result<WorkflowGraph<SideJobState>, WorkflowError> {
    GraphBuilder::new("regenerate_side_jobs")
        .add_node(GenerationNode::new(RegenerateSideJobs, deps.clone()))
        .add_node(SaveNode::new(SaveSideJobs, deps))
        .set_entry("regenerate_side_jobs")
        .add_edge("regenerate_side_jobs", "save_side_jobs")
        .add_edge("save_side_jobs", END)
        .compile()
}
