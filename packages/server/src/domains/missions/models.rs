use serde::{Deserialize, Serialize};

use crate::common::lenient;
use crate::kernel::Row;
use crate::workflow::Persistable;

/// Request to plan missions for a side job the user picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateMissionRequest {
    #[serde(alias = "userId")]
    pub user_id: i64,
    #[serde(alias = "sideJobId")]
    pub sidejob_id: i64,
    #[serde(alias = "sideJobTitle")]
    pub sidejob_title: String,
    #[serde(default, alias = "sideJobDesignNotes")]
    pub sidejob_design_notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissionStatus::Planned => "PLANNED",
            MissionStatus::InProgress => "IN_PROGRESS",
            MissionStatus::Completed => "COMPLETED",
            MissionStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionGuide {
    #[serde(alias = "guideTitle", alias = "title")]
    pub guide_title: String,
    #[serde(default)]
    pub description: String,
}

/// Missions are only ever inserted, so a model-supplied `id` is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMission {
    pub title: String,
    #[serde(default, alias = "orderNo", deserialize_with = "lenient::opt_i64")]
    pub order_no: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub notes: Option<String>,
    #[serde(default)]
    pub guide: Vec<MissionGuide>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMissions {
    pub missions: Vec<GeneratedMission>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub user_id: i64,
    pub sidejob_id: i64,
    pub title: String,
    pub order_no: i64,
    pub design_notes: String,
    pub guide: Vec<MissionGuide>,
    pub status: MissionStatus,
}

impl Mission {
    pub fn from_generated(user_id: i64, sidejob_id: i64, generated: GeneratedMission) -> Self {
        Self {
            user_id,
            sidejob_id,
            title: generated.title,
            order_no: generated.order_no.unwrap_or(1),
            design_notes: generated.notes.unwrap_or_default(),
            guide: generated.guide,
            status: MissionStatus::Planned,
        }
    }
}

impl Persistable for Mission {
    const TABLE: &'static str = "missions";

    fn to_row(&self) -> Row {
        // A list of plain strings always serializes
        let guide = serde_json::to_string(&self.guide).unwrap_or_else(|_| "[]".to_string());
        Row::new()
            .set("user_id", self.user_id)
            .set("sidejob_id", self.sidejob_id)
            .set("title", self.title.as_str())
            .set("order_no", self.order_no)
            .set("design_notes", self.design_notes.as_str())
            .set("guide", guide)
            .set("status", self.status.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generated_mission_accepts_camel_case_order() {
        let mission: GeneratedMission = serde_json::from_value(json!({
            "title": "Open a channel", "orderNo": "2", "notes": "set up branding",
            "guide": [{"guide_title": "Pick a name", "description": "Short and searchable"}]
        }))
        .unwrap();
        assert_eq!(mission.order_no, Some(2));
        assert_eq!(mission.guide.len(), 1);
    }

    #[test]
    fn test_model_supplied_id_is_dropped() {
        let generated: GeneratedMission =
            serde_json::from_value(json!({"id": 77, "title": "Film a pilot"})).unwrap();
        let row = Mission::from_generated(1, 5, generated.clone()).to_row();

        assert!(serde_json::to_value(&generated).unwrap().get("id").is_none());
        assert!(row.get("id").is_none());
    }

    #[test]
    fn test_save_defaults() {
        let generated: GeneratedMission = serde_json::from_value(json!({"title": "Film a pilot"})).unwrap();
        let mission = Mission::from_generated(1, 5, generated);
        assert_eq!(mission.order_no, 1);
        assert_eq!(mission.design_notes, "");
        assert_eq!(mission.status, MissionStatus::Planned);
        assert_eq!(
            mission.to_row().get("status").and_then(|v| v.as_text()),
            Some("PLANNED")
        );
    }
}
