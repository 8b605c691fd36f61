use serde::Serialize;

use super::models::{GenerateMissionStepRequest, GeneratedMissionSteps, MissionStep, RegenerateMissionStepsRequest};
use crate::common::FeedbackData;
use crate::workflow::{GraphState, Saved};

#[derive(Debug, Clone, Serialize)]
pub struct MissionStepState {
    pub user_id: Option<i64>,
    pub request: GenerateMissionStepRequest,
    pub mission_id: Option<i64>,
    pub feedback: Option<FeedbackData>,
    pub existing_ids: Option<Vec<i64>>,
    pub ai_result: Option<GeneratedMissionSteps>,
    pub saved_entities: Option<Vec<Saved<MissionStep>>>,
}

#[derive(Debug, Default)]
pub struct MissionStepPatch {
    pub ai_result: Option<GeneratedMissionSteps>,
    pub saved_entities: Option<Vec<Saved<MissionStep>>>,
}

impl MissionStepState {
    pub fn generate(request: GenerateMissionStepRequest) -> Self {
        Self {
            user_id: Some(request.user_id),
            mission_id: Some(request.mission_id),
            request,
            feedback: None,
            existing_ids: None,
            ai_result: None,
            saved_entities: None,
        }
    }

    pub fn regenerate(request: RegenerateMissionStepsRequest) -> Self {
        Self {
            feedback: Some(request.feedback_data),
            existing_ids: request.mission_step_ids,
            ..Self::generate(request.mission_step_generate_request)
        }
    }
}

impl GraphState for MissionStepState {
    type Patch = MissionStepPatch;

    fn merge(mut self, patch: MissionStepPatch) -> Self {
        crate::overlay!(self, patch, { ai_result, saved_entities });
        self
    }
}
