use super::models::{GeneratedMissionStep, GeneratedMissionSteps, MissionStep};
use super::prompts;
use super::state::{MissionStepPatch, MissionStepState};
use crate::kernel::Prompt;
use crate::workflow::{Draft, GenerationOutput, GenerationStep, PersistenceStep, Saved};

const ENTITY_KEYS: &[&str] = &["mission_steps", "steps", "result"];

fn generated_patch(output: GenerationOutput<GeneratedMissionStep>) -> MissionStepPatch {
    MissionStepPatch {
        ai_result: Some(GeneratedMissionSteps {
            mission_steps: output.items,
        }),
        ..Default::default()
    }
}

pub struct GenerateMissionSteps;

impl GenerationStep for GenerateMissionSteps {
    type State = MissionStepState;
    type Item = GeneratedMissionStep;

    const NAME: &'static str = "generate_mission_steps";
    const ENTITY_KEYS: &'static [&'static str] = ENTITY_KEYS;

    fn prepare_input(&self, state: &MissionStepState) -> Prompt {
        prompts::generate_prompt(&state.request)
    }

    fn into_patch(&self, _state: &MissionStepState, output: GenerationOutput<GeneratedMissionStep>) -> MissionStepPatch {
        generated_patch(output)
    }
}

pub struct RegenerateMissionSteps;

impl GenerationStep for RegenerateMissionSteps {
    type State = MissionStepState;
    type Item = GeneratedMissionStep;

    const NAME: &'static str = "regenerate_mission_steps";
    const ENTITY_KEYS: &'static [&'static str] = ENTITY_KEYS;

    fn prepare_input(&self, state: &MissionStepState) -> Prompt {
        let feedback = state.feedback.clone().unwrap_or_default();
        prompts::regenerate_prompt(&state.request, &feedback, state.existing_ids.as_deref())
    }

    fn into_patch(&self, _state: &MissionStepState, output: GenerationOutput<GeneratedMissionStep>) -> MissionStepPatch {
        generated_patch(output)
    }
}

pub struct SaveMissionSteps;

impl PersistenceStep for SaveMissionSteps {
    type State = MissionStepState;
    type Entity = MissionStep;

    const NAME: &'static str = "save_mission_steps";

    fn drafts(&self, state: &MissionStepState) -> Vec<Draft<MissionStep>> {
        let Some(result) = &state.ai_result else {
            return Vec::new();
        };
        let mission_id = state.mission_id.unwrap_or(state.request.mission_id);
        result
            .mission_steps
            .iter()
            .cloned()
            .map(|generated| Draft::replacing(generated.id, MissionStep::from_generated(mission_id, generated)))
            .collect()
    }

    fn existing_ids(&self, state: &MissionStepState) -> Option<Vec<i64>> {
        state.existing_ids.clone()
    }

    fn into_patch(&self, saved: Vec<Saved<MissionStep>>) -> MissionStepPatch {
        MissionStepPatch {
            saved_entities: Some(saved),
            ..Default::default()
        }
    }
}
