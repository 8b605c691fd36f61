//! Missions planned for a chosen side job.

pub mod models;
pub mod nodes;
pub mod pipeline;
pub mod prompts;
pub mod state;

pub use models::{GenerateMissionRequest, Mission, MissionStatus};
pub use state::MissionState;
