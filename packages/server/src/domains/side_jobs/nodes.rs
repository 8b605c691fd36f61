use super::models::{GeneratedSideJob, GeneratedSideJobs, SideJob};
use super::prompts;
use super::state::{SideJobPatch, SideJobState};
use crate::kernel::Prompt;
use crate::workflow::{Draft, GenerationOutput, GenerationStep, PersistenceStep, Saved};

const ENTITY_KEYS: &[&str] = &["side_jobs", "recommendations", "result"];

fn generated_patch(output: GenerationOutput<GeneratedSideJob>) -> SideJobPatch {
    let prompt_meta = output.document_str("prompt_meta").unwrap_or_default().to_string();
    SideJobPatch {
        ai_result: Some(GeneratedSideJobs {
            side_jobs: output.items,
            prompt_meta,
        }),
        ..Default::default()
    }
}

pub struct GenerateSideJobs;

impl GenerationStep for GenerateSideJobs {
    type State = SideJobState;
    type Item = GeneratedSideJob;

    const NAME: &'static str = "generate_side_jobs";
    const ENTITY_KEYS: &'static [&'static str] = ENTITY_KEYS;

    fn prepare_input(&self, state: &SideJobState) -> Prompt {
        prompts::generate_prompt(&state.profile)
    }

    fn into_patch(&self, _state: &SideJobState, output: GenerationOutput<GeneratedSideJob>) -> SideJobPatch {
        generated_patch(output)
    }
}

pub struct RegenerateSideJobs;

impl GenerationStep for RegenerateSideJobs {
    type State = SideJobState;
    type Item = GeneratedSideJob;

    const NAME: &'static str = "regenerate_side_jobs";
    const ENTITY_KEYS: &'static [&'static str] = ENTITY_KEYS;

    fn prepare_input(&self, state: &SideJobState) -> Prompt {
        let feedback = state.feedback.clone().unwrap_or_default();
        prompts::regenerate_prompt(&state.profile, &feedback, state.side_job_ids.as_deref())
    }

    fn into_patch(&self, _state: &SideJobState, output: GenerationOutput<GeneratedSideJob>) -> SideJobPatch {
        generated_patch(output)
    }
}

pub struct SaveSideJobs;

impl PersistenceStep for SaveSideJobs {
    type State = SideJobState;
    type Entity = SideJob;

    const NAME: &'static str = "save_side_jobs";

    fn drafts(&self, state: &SideJobState) -> Vec<Draft<SideJob>> {
        let Some(result) = &state.ai_result else {
            return Vec::new();
        };
        let user_id = state.user_id.unwrap_or(state.profile.user_id);
        result
            .side_jobs
            .iter()
            .cloned()
            .map(|generated| {
                let hint = generated.id;
                Draft::replacing(hint, SideJob::from_generated(user_id, generated, &result.prompt_meta))
            })
            .collect()
    }

    fn existing_ids(&self, state: &SideJobState) -> Option<Vec<i64>> {
        state.side_job_ids.clone()
    }

    fn into_patch(&self, saved: Vec<Saved<SideJob>>) -> SideJobPatch {
        SideJobPatch {
            saved_entities: Some(saved),
            ..Default::default()
        }
    }
}
