use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use super::models::{ChatReply, Classification};
use super::prompts;
use super::state::{ChatPatch, ChatState};
use crate::kernel::{response_parser, ServerDeps};
use crate::workflow::{Node, WorkflowError};

pub const CLASSIFY: &str = "classify";
pub const GENERATE_REPLY: &str = "generate_reply";
pub const FALLBACK: &str = "fallback";

pub struct ClassifyNode {
    deps: Arc<ServerDeps>,
}

impl ClassifyNode {
    pub fn new(deps: Arc<ServerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Node<ChatState> for ClassifyNode {
    fn name(&self) -> &str {
        CLASSIFY
    }

    async fn execute(&self, state: &ChatState) -> Result<ChatPatch> {
        let prompt = prompts::classify_prompt(&state.request);
        let params = self.deps.generation.deterministic();
        let raw = self
            .deps
            .ai
            .send(&prompt, &params)
            .await
            .context("chat classification call failed")?;

        let classification = response_parser::extract(&raw)
            .ok()
            .and_then(|value| serde_json::from_value::<Classification>(value).ok())
            .unwrap_or_else(|| {
                warn!(node = CLASSIFY, response_length = raw.len(), "unreadable classification");
                Classification::unreadable()
            });

        info!(
            node = CLASSIFY,
            is_relevant = classification.is_relevant,
            confidence = classification.confidence,
            intent = classification.intent.as_deref().unwrap_or("-"),
            "message classified"
        );

        Ok(ChatPatch {
            classification: Some(classification),
            ..Default::default()
        })
    }
}

/// Router after [`ClassifyNode`].
pub fn route_after_classify(state: &ChatState) -> &'static str {
    match &state.classification {
        Some(classification) if classification.should_reply() => GENERATE_REPLY,
        _ => FALLBACK,
    }
}

pub struct ReplyNode {
    deps: Arc<ServerDeps>,
}

impl ReplyNode {
    pub fn new(deps: Arc<ServerDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Node<ChatState> for ReplyNode {
    fn name(&self) -> &str {
        GENERATE_REPLY
    }

    async fn execute(&self, state: &ChatState) -> Result<ChatPatch> {
        let prompt = prompts::reply_prompt(&state.request);
        let raw = self
            .deps
            .ai
            .send(&prompt, &self.deps.generation)
            .await
            .context("chat reply call failed")?;

        let message = raw.trim();
        if message.is_empty() {
            return Err(WorkflowError::EmptyGeneration { pipeline: "chat" }.into());
        }

        info!(node = GENERATE_REPLY, reply_length = message.len(), "chat reply generated");
        Ok(ChatPatch {
            ai_result: Some(ChatReply {
                message: message.to_string(),
            }),
            ..Default::default()
        })
    }
}

pub struct FallbackNode;

#[async_trait]
impl Node<ChatState> for FallbackNode {
    fn name(&self) -> &str {
        FALLBACK
    }

    async fn execute(&self, _state: &ChatState) -> Result<ChatPatch> {
        Ok(ChatPatch {
            ai_result: Some(ChatReply {
                message: prompts::FALLBACK_MESSAGE.to_string(),
            }),
            ..Default::default()
        })
    }
}
