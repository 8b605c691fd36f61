// AI implementation using an OpenAI-compatible chat completion API
//
// This is the infrastructure implementation of BaseAI.
// Business logic (what to prompt for) lives in domain layers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use openai_client::{ChatRequest, Message, OpenAIClient};
use tracing::{debug, warn};

use super::response_parser::is_brace_balanced;
use super::{BaseAI, GenerationParams, Prompt};

#[derive(Clone)]
pub struct OpenAIAdapter {
    client: OpenAIClient,
    model: String,
}

impl OpenAIAdapter {
    pub fn new(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn build_request(&self, prompt: &Prompt, params: &GenerationParams) -> ChatRequest {
        let mut request = ChatRequest::new(&self.model);
        if !prompt.system.is_empty() {
            request = request.message(Message::system(&prompt.system));
        }
        request
            .message(Message::user(&prompt.user))
            .temperature(params.temperature)
            .top_p(params.top_p)
            .token_limit(params.max_tokens)
    }
}

#[async_trait]
impl BaseAI for OpenAIAdapter {
    async fn send(&self, prompt: &Prompt, params: &GenerationParams) -> Result<String> {
        let request = self.build_request(prompt, params);

        let text = if params.streaming {
            let text = self
                .client
                .chat_completion_stream(request)
                .await
                .context("streaming completion request failed")?
                .collect_text()
                .await
                .context("streaming completion interrupted")?;

            if !is_brace_balanced(&text) {
                warn!(
                    model = %self.model,
                    response_length = text.len(),
                    "streamed response has unbalanced braces, output may be truncated"
                );
            }
            text
        } else {
            self.client
                .chat_completion(request)
                .await
                .context("completion request failed")?
                .content
        };

        debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            response_length = text.len(),
            streaming = params.streaming,
            "model call completed"
        );

        Ok(text)
    }
}
