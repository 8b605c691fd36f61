//! Prompt templates for side-job ideas.

use super::models::{FeedbackType, GenerateSideJobRequest};
use crate::common::FeedbackData;
use crate::kernel::Prompt;

/// Platforms the model may pick from, with the media each one carries.
pub const PLATFORMS: &[(&str, &str)] = &[
    ("YouTube", "video"),
    ("YouTube Shorts", "video"),
    ("TikTok", "video"),
    ("Instagram", "image"),
    ("Instagram Reels", "video"),
    ("Pinterest", "image"),
    ("Naver Blog", "text"),
    ("Brunch", "text"),
    ("Postype", "text"),
    ("Threads", "text"),
    ("X", "text"),
];

const GENERATE_SYSTEM: &str = r#"You are a generator of social media side-job ideas.
Using the user's job, hobbies and interests, preferred way of expressing themselves (text, drawing or video) and strength (creating, organizing and explaining, sharing daily life, spotting trends), recommend 3 side-job ideas in the form "[Mood] + [Topic] + [Format] + [Platform]".

Example: Cozy + cafe hopping + reels + Instagram
-> A creator who introduces atmospheric cafes through stylish reels

Rules:
- [Mood] is an adjective describing tone (cozy, sharp, cheerful, earnest, ...).
- [Topic] must relate to the user's job, hobbies or strength.
- [Format] must suit the user's way of expressing themselves and strength.
- [Platform] must be chosen from the list of available platforms only.
- Avoid combinations that do not fit (e.g. cozy stock-market illustrations on Instagram).

Respond with JSON only, in exactly this shape:
{"side_jobs": [{"title": "...", "description": "..."}], "prompt_meta": "one short line on how the ideas were chosen"}"#;

const REGENERATE_SYSTEM: &str = r#"You regenerate social media side-job ideas based on user feedback.
Work out what was wrong with the earlier suggestions and propose better ones.
Each idea must have the form "[Mood] + [Topic] + [Format] + [Platform]" and use only the available platforms.

Respond with JSON only, in exactly this shape:
{"side_jobs": [{"id": <id of the idea being replaced, if given>, "title": "...", "description": "..."}], "prompt_meta": "..."}"#;

pub fn platform_list() -> String {
    PLATFORMS
        .iter()
        .map(|(name, media)| format!("{} ({})", name, media))
        .collect::<Vec<_>>()
        .join(", ")
}

fn profile_block(profile: &GenerateSideJobRequest) -> String {
    let hobbies = if profile.hobbies.is_empty() {
        "none given".to_string()
    } else {
        profile.hobbies.join(", ")
    };
    let mut block = format!(
        "User profile:\n- Job: {}\n- Hobbies: {}\n- Expression style: {}\n- Strength: {}",
        profile.job, hobbies, profile.expression_style, profile.strength_type
    );
    if let Some(character) = profile.character_type.as_deref().filter(|c| !c.is_empty()) {
        block.push_str(&format!("\n- Character: {}", character));
    }
    block
}

pub fn generate_prompt(profile: &GenerateSideJobRequest) -> Prompt {
    let user = format!(
        "{}\n\nAvailable platforms: {}\n\nSuggest 3 realistic side jobs for this user.",
        profile_block(profile),
        platform_list()
    );
    Prompt::new(GENERATE_SYSTEM, user)
}

pub fn regenerate_prompt(
    profile: &GenerateSideJobRequest,
    feedback: &FeedbackData,
    side_job_ids: Option<&[i64]>,
) -> Prompt {
    let count = side_job_ids.map_or(3, |ids| ids.len().max(1));
    let mut user = format!(
        "{}\n\nFeedback reasons: {}\nAdditional feedback: {}\n\nAvailable platforms: {}\n\n",
        profile_block(profile),
        feedback.reason_labels::<FeedbackType>(),
        feedback.extra_feedback(),
        platform_list()
    );
    match side_job_ids {
        Some(ids) if !ids.is_empty() => {
            let ids: Vec<String> = ids.iter().map(i64::to_string).collect();
            user.push_str(&format!(
                "Replace the ideas with ids [{}]: return exactly {} ideas, each carrying the id it replaces.",
                ids.join(", "),
                count
            ));
        }
        _ => user.push_str(&format!("Suggest {} improved side jobs that address the feedback.", count)),
    }
    Prompt::new(REGENERATE_SYSTEM, user)
}
