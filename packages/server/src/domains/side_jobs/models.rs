use serde::{Deserialize, Serialize};

use crate::common::lenient;
use crate::common::{FeedbackData, FeedbackKind};
use crate::kernel::Row;
use crate::workflow::Persistable;

pub const DEFAULT_DESCRIPTION: &str = "No description provided";

// ============================================================================
// Requests
// ============================================================================

/// Profile a user fills in during onboarding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateSideJobRequest {
    #[serde(alias = "userId")]
    pub user_id: i64,
    pub job: String,
    #[serde(default)]
    pub hobbies: Vec<String>,
    /// Text, drawing or video
    #[serde(alias = "expressionStyle")]
    pub expression_style: String,
    #[serde(alias = "strengthType")]
    pub strength_type: String,
    #[serde(default, alias = "characterType")]
    pub character_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegenerateSideJobRequest {
    #[serde(default, alias = "feedbackData")]
    pub feedback_data: FeedbackData,
    #[serde(alias = "generateSideJobRequest")]
    pub generate_side_job_request: GenerateSideJobRequest,
    /// Rows to replace in place; absent means the new ideas are inserted.
    #[serde(default, alias = "sideJobIds")]
    pub side_job_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackType {
    LowProfitability,
    NotInteresting,
    TooTimeConsuming,
    ChangeToOther,
    None,
}

impl FeedbackKind for FeedbackType {
    const ALL: &'static [Self] = &[
        FeedbackType::LowProfitability,
        FeedbackType::NotInteresting,
        FeedbackType::TooTimeConsuming,
        FeedbackType::ChangeToOther,
        FeedbackType::None,
    ];
    const NONE: Self = FeedbackType::None;

    fn code(&self) -> &'static str {
        match self {
            FeedbackType::LowProfitability => "LOW_PROFITABILITY",
            FeedbackType::NotInteresting => "NOT_INTERESTING",
            FeedbackType::TooTimeConsuming => "TOO_TIME_CONSUMING",
            FeedbackType::ChangeToOther => "CHANGE_TO_OTHER",
            FeedbackType::None => "NONE",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FeedbackType::LowProfitability => "It doesn't look profitable",
            FeedbackType::NotInteresting => "I don't like the platform",
            FeedbackType::TooTimeConsuming => "It takes too much time",
            FeedbackType::ChangeToOther => "Please change it to something else",
            FeedbackType::None => "None",
        }
    }
}

// ============================================================================
// Model output
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSideJob {
    /// Set when the model echoes the id of a row it replaces
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSideJobs {
    pub side_jobs: Vec<GeneratedSideJob>,
    #[serde(default)]
    pub prompt_meta: String,
}

// ============================================================================
// Stored entity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideJob {
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub prompt_meta: String,
    pub is_selected: bool,
}

impl SideJob {
    /// Apply save-time defaults to one generated idea.
    pub fn from_generated(user_id: i64, generated: GeneratedSideJob, prompt_meta: &str) -> Self {
        Self {
            user_id,
            title: generated.title,
            description: generated
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            prompt_meta: prompt_meta.to_string(),
            is_selected: false,
        }
    }
}

impl Persistable for SideJob {
    const TABLE: &'static str = "side_jobs";

    fn to_row(&self) -> Row {
        Row::new()
            .set("user_id", self.user_id)
            .set("title", self.title.as_str())
            .set("description", self.description.as_str())
            .set("prompt_meta", self.prompt_meta.as_str())
            .set("is_selected", self.is_selected)
    }
}
