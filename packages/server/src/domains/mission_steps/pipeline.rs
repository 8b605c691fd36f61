use std::sync::Arc;

use super::nodes::{GenerateMissionSteps, RegenerateMissionSteps, SaveMissionSteps};
use super::state::MissionStepState;
use crate::kernel::ServerDeps;
use crate::workflow::{GenerationNode, GraphBuilder, SaveNode, WorkflowError, WorkflowGraph, END};

/// generate_mission_steps -> save_mission_steps
pub fn generate_graph(deps: Arc<ServerDeps>) -> Result<WorkflowGraph<MissionStepState>, WorkflowError> {
    GraphBuilder::new("generate_mission_steps")
        .add_node(GenerationNode::new(GenerateMissionSteps, deps.clone()))
        .add_node(SaveNode::new(SaveMissionSteps, deps))
        .set_entry("generate_mission_steps")
        .add_edge("generate_mission_steps", "save_mission_steps")
        .add_edge("save_mission_steps", END)
        .compile()
}

/// regenerate_mission_steps -> save_mission_steps
pub fn regenerate_graph(deps: Arc<ServerDeps>) -> Result<WorkflowGraph<MissionStepState>, WorkflowError> {
    GraphBuilder::new("regenerate_mission_steps")
        .add_node(GenerationNode::new(RegenerateMissionSteps, deps.clone()))
        .add_node(SaveNode::new(SaveMissionSteps, deps))
        .set_entry("regenerate_mission_steps")
        .add_edge("regenerate_mission_steps", "save_mission_steps")
        .add_edge("save_mission_steps", END)
        .compile()
}
