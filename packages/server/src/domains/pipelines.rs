//! Pipeline catalogue: maps task names to workflow graphs.
//!
//! Every pipeline is registered as a job type. A job deserializes its request,
//! builds the initial state, runs the graph, and turns the terminal state into
//! the task result. A run that saved nothing fails so the task is retried.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::chat::{self, ChatRequest, ChatState};
use super::mission_steps::{self, GenerateMissionStepRequest, MissionStepState, RegenerateMissionStepsRequest};
use super::missions::{self, GenerateMissionRequest, MissionState};
use super::side_jobs::{self, GenerateSideJobRequest, RegenerateSideJobRequest, SideJobState};
use crate::kernel::{JobRegistry, ServerDeps};
use crate::workflow::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    GenerateSideJobs,
    RegenerateSideJobs,
    GenerateMissions,
    GenerateMissionSteps,
    RegenerateMissionSteps,
    Chat,
}

impl Pipeline {
    pub const ALL: [Pipeline; 6] = [
        Pipeline::GenerateSideJobs,
        Pipeline::RegenerateSideJobs,
        Pipeline::GenerateMissions,
        Pipeline::GenerateMissionSteps,
        Pipeline::RegenerateMissionSteps,
        Pipeline::Chat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::GenerateSideJobs => "generate_side_jobs",
            Pipeline::RegenerateSideJobs => "regenerate_side_jobs",
            Pipeline::GenerateMissions => "generate_missions",
            Pipeline::GenerateMissionSteps => "generate_mission_steps",
            Pipeline::RegenerateMissionSteps => "regenerate_mission_steps",
            Pipeline::Chat => "chat",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pipeline {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Pipeline::ALL
            .into_iter()
            .find(|pipeline| pipeline.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown pipeline: {}", s))
    }
}

/// State of one pipeline run, tagged by domain.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowState {
    SideJob(SideJobState),
    Mission(MissionState),
    MissionStep(MissionStepState),
    Chat(ChatState),
}

impl WorkflowState {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowState::SideJob(_) => "side_job",
            WorkflowState::Mission(_) => "mission",
            WorkflowState::MissionStep(_) => "mission_step",
            WorkflowState::Chat(_) => "chat",
        }
    }

    /// Task result for a finished run.
    ///
    /// Persisting pipelines report `{"saved_entities": [...]}`; chat reports
    /// the reply itself.
    pub fn into_result(self, pipeline: Pipeline) -> Result<Value> {
        match self {
            WorkflowState::SideJob(state) => saved_result(pipeline, state.saved_entities),
            WorkflowState::Mission(state) => saved_result(pipeline, state.saved_entities),
            WorkflowState::MissionStep(state) => saved_result(pipeline, state.saved_entities),
            WorkflowState::Chat(state) => {
                let reply = state.ai_result.ok_or(WorkflowError::EmptyGeneration {
                    pipeline: pipeline.as_str(),
                })?;
                Ok(serde_json::to_value(reply)?)
            }
        }
    }
}

fn saved_result<T: Serialize>(pipeline: Pipeline, saved: Option<Vec<T>>) -> Result<Value> {
    match saved {
        Some(saved) if !saved.is_empty() => {
            info!(pipeline = pipeline.as_str(), saved_count = saved.len(), "pipeline saved entities");
            Ok(json!({ "saved_entities": saved }))
        }
        _ => Err(WorkflowError::EmptyGeneration {
            pipeline: pipeline.as_str(),
        }
        .into()),
    }
}

/// Build the graph for `pipeline` and run it to completion.
pub async fn run_pipeline(
    pipeline: Pipeline,
    state: WorkflowState,
    deps: Arc<ServerDeps>,
) -> Result<WorkflowState, WorkflowError> {
    let finished = match (pipeline, state) {
        (Pipeline::GenerateSideJobs, WorkflowState::SideJob(state)) => {
            WorkflowState::SideJob(side_jobs::pipeline::generate_graph(deps)?.run(state).await?)
        }
        (Pipeline::RegenerateSideJobs, WorkflowState::SideJob(state)) => {
            WorkflowState::SideJob(side_jobs::pipeline::regenerate_graph(deps)?.run(state).await?)
        }
        (Pipeline::GenerateMissions, WorkflowState::Mission(state)) => {
            WorkflowState::Mission(missions::pipeline::generate_graph(deps)?.run(state).await?)
        }
        (Pipeline::GenerateMissionSteps, WorkflowState::MissionStep(state)) => {
            WorkflowState::MissionStep(mission_steps::pipeline::generate_graph(deps)?.run(state).await?)
        }
        (Pipeline::RegenerateMissionSteps, WorkflowState::MissionStep(state)) => {
            WorkflowState::MissionStep(mission_steps::pipeline::regenerate_graph(deps)?.run(state).await?)
        }
        (Pipeline::Chat, WorkflowState::Chat(state)) => {
            WorkflowState::Chat(chat::pipeline::chat_graph(deps)?.run(state).await?)
        }
        (pipeline, state) => {
            return Err(WorkflowError::PayloadMismatch {
                pipeline: pipeline.as_str(),
                state: state.kind(),
            })
        }
    };
    Ok(finished)
}

/// Run a pipeline and convert its terminal state into a task result.
pub async fn execute(pipeline: Pipeline, state: WorkflowState, deps: Arc<ServerDeps>) -> Result<Value> {
    let finished = run_pipeline(pipeline, state, deps).await?;
    finished.into_result(pipeline)
}

/// Register every pipeline as a job type.
pub fn register_pipelines(registry: &mut JobRegistry) {
    registry.register(
        Pipeline::GenerateSideJobs.as_str(),
        |request: GenerateSideJobRequest, deps| async move {
            execute(Pipeline::GenerateSideJobs, WorkflowState::SideJob(SideJobState::generate(request)), deps).await
        },
    );
    registry.register(
        Pipeline::RegenerateSideJobs.as_str(),
        |request: RegenerateSideJobRequest, deps| async move {
            execute(
                Pipeline::RegenerateSideJobs,
                WorkflowState::SideJob(SideJobState::regenerate(request)),
                deps,
            )
            .await
        },
    );
    registry.register(
        Pipeline::GenerateMissions.as_str(),
        |request: GenerateMissionRequest, deps| async move {
            execute(Pipeline::GenerateMissions, WorkflowState::Mission(MissionState::new(request)), deps).await
        },
    );
    registry.register(
        Pipeline::GenerateMissionSteps.as_str(),
        |request: GenerateMissionStepRequest, deps| async move {
            execute(
                Pipeline::GenerateMissionSteps,
                WorkflowState::MissionStep(MissionStepState::generate(request)),
                deps,
            )
            .await
        },
    );
    registry.register(
        Pipeline::RegenerateMissionSteps.as_str(),
        |request: RegenerateMissionStepsRequest, deps| async move {
            execute(
                Pipeline::RegenerateMissionSteps,
                WorkflowState::MissionStep(MissionStepState::regenerate(request)),
                deps,
            )
            .await
        },
    );
    registry.register(Pipeline::Chat.as_str(), |request: ChatRequest, deps| async move {
        execute(Pipeline::Chat, WorkflowState::Chat(ChatState::new(request)), deps).await
    });
}
