use serde::Serialize;

use super::models::{ChatReply, ChatRequest, Classification};
use crate::workflow::GraphState;

#[derive(Debug, Clone, Serialize)]
pub struct ChatState {
    pub user_id: Option<i64>,
    pub request: ChatRequest,
    pub classification: Option<Classification>,
    pub ai_result: Option<ChatReply>,
}

#[derive(Debug, Default)]
pub struct ChatPatch {
    pub classification: Option<Classification>,
    pub ai_result: Option<ChatReply>,
}

impl ChatState {
    pub fn new(request: ChatRequest) -> Self {
        Self {
            user_id: request.user_id,
            request,
            classification: None,
            ai_result: None,
        }
    }
}

impl GraphState for ChatState {
    type Patch = ChatPatch;

    fn merge(mut self, patch: ChatPatch) -> Self {
        crate::overlay!(self, patch, { classification, ai_result });
        self
    }
}
