use serde::{Deserialize, Serialize};

use crate::common::lenient;
use crate::common::{FeedbackData, FeedbackKind};
use crate::kernel::Row;
use crate::workflow::Persistable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateMissionStepRequest {
    #[serde(alias = "userId")]
    pub user_id: i64,
    #[serde(alias = "missionId")]
    pub mission_id: i64,
    #[serde(alias = "missionTitle")]
    pub mission_title: String,
    #[serde(default, alias = "missionDesignNotes")]
    pub mission_design_notes: String,
    #[serde(default, alias = "orderNo")]
    pub order_no: i64,
    #[serde(default, alias = "sideJobTitle")]
    pub side_job_title: String,
    #[serde(default, alias = "sideJobDescription")]
    pub side_job_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateMissionStepsRequest {
    #[serde(default, alias = "feedbackData")]
    pub feedback_data: FeedbackData,
    #[serde(alias = "generateMissionStep", alias = "missionStepGenerateRequest")]
    pub mission_step_generate_request: GenerateMissionStepRequest,
    /// Steps to rewrite in place; absent means the new steps are inserted.
    #[serde(default, alias = "missionStepIds", alias = "existingStepIds")]
    pub mission_step_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStepFeedbackType {
    TooDifficult,
    TooEasy,
    NotMyChoice,
    NotMatchingGoal,
    None,
}

impl FeedbackKind for MissionStepFeedbackType {
    const ALL: &'static [Self] = &[
        MissionStepFeedbackType::TooDifficult,
        MissionStepFeedbackType::TooEasy,
        MissionStepFeedbackType::NotMyChoice,
        MissionStepFeedbackType::NotMatchingGoal,
        MissionStepFeedbackType::None,
    ];
    const NONE: Self = MissionStepFeedbackType::None;

    fn code(&self) -> &'static str {
        match self {
            MissionStepFeedbackType::TooDifficult => "TOO_DIFFICULT",
            MissionStepFeedbackType::TooEasy => "TOO_EASY",
            MissionStepFeedbackType::NotMyChoice => "NOT_MY_CHOICE",
            MissionStepFeedbackType::NotMatchingGoal => "NOT_MATCHING_GOAL",
            MissionStepFeedbackType::None => "NONE",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MissionStepFeedbackType::TooDifficult => "Too difficult",
            MissionStepFeedbackType::TooEasy => "Too easy",
            MissionStepFeedbackType::NotMyChoice => "Doesn't fit the side job I chose",
            MissionStepFeedbackType::NotMatchingGoal => "Doesn't match my goal",
            MissionStepFeedbackType::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Planned => "PLANNED",
            StepStatus::InProgress => "IN_PROGRESS",
            StepStatus::Completed => "COMPLETED",
            StepStatus::Skipped => "SKIPPED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMissionStep {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub seq: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMissionSteps {
    pub mission_steps: Vec<GeneratedMissionStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionStep {
    pub mission_id: i64,
    pub seq: i64,
    pub title: String,
    pub detail: String,
    pub status: StepStatus,
}

impl MissionStep {
    pub fn from_generated(mission_id: i64, generated: GeneratedMissionStep) -> Self {
        Self {
            mission_id,
            seq: generated.seq.unwrap_or(0),
            title: generated.title,
            detail: generated.detail.unwrap_or_default(),
            status: StepStatus::Planned,
        }
    }
}

impl Persistable for MissionStep {
    const TABLE: &'static str = "mission_steps";

    fn to_row(&self) -> Row {
        Row::new()
            .set("mission_id", self.mission_id)
            .set("seq", self.seq)
            .set("title", self.title.as_str())
            .set("detail", self.detail.as_str())
            .set("status", self.status.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_regenerate_request_aliases() {
        let request: RegenerateMissionStepsRequest = serde_json::from_value(json!({
            "feedbackData": {"reasons": ["TOO_EASY"], "etcFeedback": ""},
            "generateMissionStep": {
                "userId": 1, "missionId": 3, "missionTitle": "Launch",
                "missionDesignNotes": "first upload", "orderNo": 1,
                "sideJobTitle": "Cafe reels", "sideJobDescription": "Short videos"
            },
            "missionStepIds": [11, 12]
        }))
        .unwrap();
        assert_eq!(request.mission_step_generate_request.mission_id, 3);
        assert_eq!(request.mission_step_ids, Some(vec![11, 12]));
        assert_eq!(
            request.feedback_data.kinds::<MissionStepFeedbackType>(),
            vec![MissionStepFeedbackType::TooEasy]
        );
    }

    #[test]
    fn test_step_defaults() {
        let generated: GeneratedMissionStep = serde_json::from_value(json!({"title": "Buy a mic"})).unwrap();
        let step = MissionStep::from_generated(3, generated);
        assert_eq!(step.seq, 0);
        assert_eq!(step.status, StepStatus::Planned);
    }
}
