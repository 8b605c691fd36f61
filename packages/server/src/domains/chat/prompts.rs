use super::models::ChatRequest;
use crate::kernel::Prompt;

const CLASSIFY_SYSTEM: &str = r#"You are a router. Decide whether the question is about side jobs, missions, side quests, photo or ad verification, rewards and experience points, or how to use the app.
If it is, set is_relevant to true and set intent to one of those categories. Give your confidence between 0 and 1.

Respond with JSON only, in exactly this shape:
{"is_relevant": true, "confidence": 0.0, "intent": "...", "reason": "..."}"#;

const REPLY_SYSTEM: &str = r#"You are a friendly guide for people starting a side job.
Answer the user's question concretely and briefly. If you are not sure, say so and suggest where to look next."#;

pub const FALLBACK_MESSAGE: &str =
    "I can only help with side jobs, missions, and using the app. Could you ask about one of those?";

pub fn classify_prompt(request: &ChatRequest) -> Prompt {
    Prompt::new(CLASSIFY_SYSTEM, request.message.as_str())
}

pub fn reply_prompt(request: &ChatRequest) -> Prompt {
    let mut user = String::new();
    if !request.history.is_empty() {
        user.push_str("Conversation so far:\n");
        for turn in &request.history {
            user.push_str(&format!("{}: {}\n", turn.role, turn.content));
        }
        user.push('\n');
    }
    user.push_str(&request.message);
    Prompt::new(REPLY_SYSTEM, user)
}
