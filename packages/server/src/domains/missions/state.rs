use serde::Serialize;

use super::models::{GenerateMissionRequest, GeneratedMissions, Mission};
use crate::workflow::{GraphState, Saved};

#[derive(Debug, Clone, Serialize)]
pub struct MissionState {
    pub user_id: Option<i64>,
    pub request: GenerateMissionRequest,
    pub sidejob_id: Option<i64>,
    pub ai_result: Option<GeneratedMissions>,
    pub saved_entities: Option<Vec<Saved<Mission>>>,
}

#[derive(Debug, Default)]
pub struct MissionPatch {
    pub ai_result: Option<GeneratedMissions>,
    pub saved_entities: Option<Vec<Saved<Mission>>>,
}

impl MissionState {
    pub fn new(request: GenerateMissionRequest) -> Self {
        Self {
            user_id: Some(request.user_id),
            sidejob_id: Some(request.sidejob_id),
            request,
            ai_result: None,
            saved_entities: None,
        }
    }
}

impl GraphState for MissionState {
    type Patch = MissionPatch;

    fn merge(mut self, patch: MissionPatch) -> Self {
        crate::overlay!(self, patch, { ai_result, saved_entities });
        self
    }
}
