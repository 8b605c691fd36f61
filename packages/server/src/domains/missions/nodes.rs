use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::models::{GeneratedMission, GeneratedMissions, Mission};
use super::prompts;
use super::state::{MissionPatch, MissionState};
use crate::domains::side_jobs::SideJob;
use crate::kernel::{Prompt, Row, UnitOfWork};
use crate::workflow::{Draft, GenerationOutput, GenerationStep, Persistable, PersistenceError, PersistenceStep, Saved};

pub struct GenerateMissions;

impl GenerationStep for GenerateMissions {
    type State = MissionState;
    type Item = GeneratedMission;

    const NAME: &'static str = "generate_missions";
    const ENTITY_KEYS: &'static [&'static str] = &["missions", "recommendations", "result"];

    fn prepare_input(&self, state: &MissionState) -> Prompt {
        prompts::generate_prompt(&state.request)
    }

    fn into_patch(&self, _state: &MissionState, output: GenerationOutput<GeneratedMission>) -> MissionPatch {
        MissionPatch {
            ai_result: Some(GeneratedMissions { missions: output.items }),
            ..Default::default()
        }
    }
}

/// Saves missions and marks their side job as selected in the same transaction.
pub struct SaveMissions;

#[async_trait]
impl PersistenceStep for SaveMissions {
    type State = MissionState;
    type Entity = Mission;

    const NAME: &'static str = "save_missions";

    fn drafts(&self, state: &MissionState) -> Vec<Draft<Mission>> {
        let Some(result) = &state.ai_result else {
            return Vec::new();
        };
        let user_id = state.user_id.unwrap_or(state.request.user_id);
        let sidejob_id = state.sidejob_id.unwrap_or(state.request.sidejob_id);
        result
            .missions
            .iter()
            .cloned()
            .map(|generated| Draft::new(Mission::from_generated(user_id, sidejob_id, generated)))
            .collect()
    }

    async fn after_save(
        &self,
        uow: &mut dyn UnitOfWork,
        state: &MissionState,
        _saved: &[Saved<Mission>],
    ) -> Result<()> {
        let Some(sidejob_id) = state.sidejob_id else {
            return Ok(());
        };
        let table = <SideJob as Persistable>::TABLE;
        let touched = uow
            .update_row(table, sidejob_id, &Row::new().set("is_selected", true))
            .await?;
        if touched == 0 {
            return Err(PersistenceError::MissingRow { table, id: sidejob_id }.into());
        }
        info!(sidejob_id, "side job marked selected");
        Ok(())
    }

    fn into_patch(&self, saved: Vec<Saved<Mission>>) -> MissionPatch {
        MissionPatch {
            saved_entities: Some(saved),
            ..Default::default()
        }
    }
}
