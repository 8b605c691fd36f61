use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, alias = "userId")]
    pub user_id: Option<i64>,
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

/// Router verdict on whether a message is in scope for the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default, alias = "isRelevant")]
    pub is_relevant: bool,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Classification {
    pub const MIN_CONFIDENCE: f64 = 0.5;

    /// Used when the model's verdict cannot be read.
    pub fn unreadable() -> Self {
        Self {
            is_relevant: false,
            confidence: 0.0,
            intent: None,
            reason: Some("classification response could not be parsed".to_string()),
        }
    }

    pub fn should_reply(&self) -> bool {
        self.is_relevant && self.confidence >= Self::MIN_CONFIDENCE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: String,
}
