//! Side-job ideas generated from a user's profile.
//!
//! Generation inserts fresh rows; regeneration with `side_job_ids` rewrites
//! those rows in place.

pub mod models;
pub mod nodes;
pub mod pipeline;
pub mod prompts;
pub mod state;

pub use models::{FeedbackType, GenerateSideJobRequest, RegenerateSideJobRequest, SideJob};
pub use state::SideJobState;
