use super::models::GenerateMissionRequest;
use crate::kernel::Prompt;

const SYSTEM: &str = r#"You analyse a side job a user has chosen and design concrete, achievable missions that take them from zero to their first result.
Each mission has one clear goal. Missions are ordered; orderNo starts at 1 and increases by one.
Every mission must include title, orderNo and notes; notes must never be empty.
Add a short guide list with practical tips for each mission.

Respond with JSON only, in exactly this shape:
{"missions": [{"title": "...", "orderNo": 1, "notes": "...", "guide": [{"guide_title": "...", "description": "..."}]}]}"#;

pub fn generate_prompt(request: &GenerateMissionRequest) -> Prompt {
    let notes = match request.sidejob_design_notes.trim() {
        "" => "none",
        notes => notes,
    };
    let user = format!(
        "Side job: {}\nDesign notes: {}\n\nCreate 5 missions the user can complete in order to get this side job started.",
        request.sidejob_title, notes
    );
    Prompt::new(SYSTEM, user)
}
