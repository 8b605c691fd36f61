use serde::Serialize;

use super::models::{GenerateSideJobRequest, GeneratedSideJobs, RegenerateSideJobRequest, SideJob};
use crate::common::FeedbackData;
use crate::workflow::{GraphState, Saved};

#[derive(Debug, Clone, Serialize)]
pub struct SideJobState {
    pub user_id: Option<i64>,
    pub profile: GenerateSideJobRequest,
    pub feedback: Option<FeedbackData>,
    pub side_job_ids: Option<Vec<i64>>,
    pub ai_result: Option<GeneratedSideJobs>,
    pub saved_entities: Option<Vec<Saved<SideJob>>>,
}

#[derive(Debug, Default)]
pub struct SideJobPatch {
    pub ai_result: Option<GeneratedSideJobs>,
    pub saved_entities: Option<Vec<Saved<SideJob>>>,
}

impl SideJobState {
    pub fn generate(profile: GenerateSideJobRequest) -> Self {
        Self {
            user_id: Some(profile.user_id),
            profile,
            feedback: None,
            side_job_ids: None,
            ai_result: None,
            saved_entities: None,
        }
    }

    pub fn regenerate(request: RegenerateSideJobRequest) -> Self {
        Self {
            feedback: Some(request.feedback_data),
            side_job_ids: request.side_job_ids,
            ..Self::generate(request.generate_side_job_request)
        }
    }
}

impl GraphState for SideJobState {
    type Patch = SideJobPatch;

    fn merge(mut self, patch: SideJobPatch) -> Self {
        crate::overlay!(self, patch, { ai_result, saved_entities });
        self
    }
}
