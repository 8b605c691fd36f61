use super::models::{GenerateMissionStepRequest, MissionStepFeedbackType};
use crate::common::FeedbackData;
use crate::kernel::Prompt;

const GENERATE_SYSTEM: &str = r#"You break a mission down into concrete steps a user can follow one at a time.
Every step must be clear and actionable and include title, seq and detail. seq starts at 1 and increases by one; detail must never be empty.

Respond with JSON only, in exactly this shape:
{"mission_steps": [{"title": "...", "seq": 1, "detail": "..."}]}"#;

const REGENERATE_SYSTEM: &str = r#"You rewrite the steps of a mission based on user feedback.
Keep the steps concrete and actionable, fix what the feedback criticises, and include title, seq and detail for every step.

Respond with JSON only, in exactly this shape:
{"mission_steps": [{"id": <id of the step being replaced, if given>, "title": "...", "seq": 1, "detail": "..."}]}"#;

fn mission_block(request: &GenerateMissionStepRequest) -> String {
    format!(
        "Side job: {} ({})\nMission #{}: {}\nMission notes: {}",
        request.side_job_title,
        request.side_job_description,
        request.order_no,
        request.mission_title,
        request.mission_design_notes
    )
}

pub fn generate_prompt(request: &GenerateMissionStepRequest) -> Prompt {
    let user = format!(
        "{}\n\nCreate 5 steps that complete this mission.",
        mission_block(request)
    );
    Prompt::new(GENERATE_SYSTEM, user)
}

pub fn regenerate_prompt(
    request: &GenerateMissionStepRequest,
    feedback: &FeedbackData,
    existing_ids: Option<&[i64]>,
) -> Prompt {
    let mut user = format!(
        "{}\n\nFeedback reasons: {}\nAdditional feedback: {}\n\n",
        mission_block(request),
        feedback.reason_labels::<MissionStepFeedbackType>(),
        feedback.extra_feedback()
    );
    match existing_ids {
        Some(ids) if !ids.is_empty() => {
            let ids: Vec<String> = ids.iter().map(i64::to_string).collect();
            user.push_str(&format!(
                "Rewrite the steps with ids [{}]: return exactly {} steps, each carrying the id it replaces.",
                ids.join(", "),
                ids.len()
            ));
        }
        _ => user.push_str("Create 5 improved steps that address the feedback."),
    }
    Prompt::new(REGENERATE_SYSTEM, user)
}
