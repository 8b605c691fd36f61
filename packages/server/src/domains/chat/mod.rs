//! Side-job assistant chat: classify the message, then answer or deflect.

pub mod models;
pub mod nodes;
pub mod pipeline;
pub mod prompts;
pub mod state;

pub use models::{ChatReply, ChatRequest, ChatTurn, Classification};
pub use state::ChatState;
