use std::sync::Arc;

use super::nodes::{GenerateMissions, SaveMissions};
use super::state::MissionState;
use crate::kernel::ServerDeps;
use crate::workflow::{GenerationNode, GraphBuilder, SaveNode, WorkflowError, WorkflowGraph, END};

/// generate_missions -> save_missions
pub fn generate_graph(deps: Arc<ServerDeps>) -> Result<WorkflowGraph<MissionState>, WorkflowError> {
    GraphBuilder::new("generate_missions")
        .add_node(GenerationNode::new(GenerateMissions, deps.clone()))
        .add_node(SaveNode::new(SaveMissions, deps))
        .set_entry("generate_missions")
        .add_edge("generate_missions", "save_missions")
        .add_edge("save_missions", END)
        .compile()
}
