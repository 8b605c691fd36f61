//! Step-by-step breakdown of a mission.

pub mod models;
pub mod nodes;
pub mod pipeline;
pub mod prompts;
pub mod state;

pub use models::{
    GenerateMissionStepRequest, MissionStep, MissionStepFeedbackType, RegenerateMissionStepsRequest, StepStatus,
};
pub use state::MissionStepState;
