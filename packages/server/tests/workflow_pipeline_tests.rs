//! End-to-end pipeline runs against the scripted model and in-memory store.
//!
//! Covers generation followed by persistence for each domain: fresh inserts,
//! in-place regeneration, the mission side effect on the parent side job, and
//! the rollback paths.

mod common;

use serde_json::json;
use sidequest_core::domains::mission_steps::{self, MissionStepState, RegenerateMissionStepsRequest};
use sidequest_core::domains::missions::{self, GenerateMissionRequest, MissionState};
use sidequest_core::domains::side_jobs::{self, RegenerateSideJobRequest, SideJobState};
use sidequest_core::kernel::{InMemoryStore, MockAI, Row, SqlValue, TestDependencies};
use sidequest_core::workflow::WorkflowError;

use crate::common::{developer_profile, three_side_jobs, two_missions};

fn side_job_row(user_id: i64, title: &str) -> Row {
    Row::new()
        .set("user_id", user_id)
        .set("title", title)
        .set("description", "")
        .set("prompt_meta", "")
        .set("is_selected", false)
}

fn mission_request(sidejob_id: i64) -> GenerateMissionRequest {
    serde_json::from_value(json!({
        "userId": 1,
        "sideJobId": sidejob_id,
        "sideJobTitle": "Game guide blog",
        "sideJobDesignNotes": "weekly posts"
    }))
    .unwrap()
}

fn text<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column).and_then(SqlValue::as_text).unwrap_or_default()
}

// =============================================================================
// Side jobs
// =============================================================================

#[tokio::test]
async fn generate_side_jobs_inserts_fresh_rows() {
    let test_deps = TestDependencies::new().with_ai(MockAI::new().with_json_response(three_side_jobs()));
    let store = test_deps.store.clone();
    let graph = side_jobs::pipeline::generate_graph(test_deps.into_deps()).unwrap();

    let state = graph.run(SideJobState::generate(developer_profile(1))).await.unwrap();

    let saved = state.saved_entities.expect("save node ran");
    assert_eq!(saved.len(), 3);
    assert!(saved.iter().all(|s| !s.entity.is_selected));
    let mut ids: Vec<i64> = saved.iter().map(|s| s.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert_eq!(store.count("side_jobs"), 3);
    assert_eq!(saved[0].entity.prompt_meta, "developer/gaming");
}

#[tokio::test]
async fn generation_does_not_touch_unrelated_state() {
    let test_deps = TestDependencies::new().with_ai(MockAI::new().with_json_response(three_side_jobs()));
    let graph = side_jobs::pipeline::generate_graph(test_deps.into_deps()).unwrap();
    let initial = SideJobState::generate(developer_profile(42));

    let state = graph.run(initial.clone()).await.unwrap();

    assert_eq!(state.user_id, initial.user_id);
    assert_eq!(state.profile, initial.profile);
    assert_eq!(state.side_job_ids, None);
    assert!(state.ai_result.is_some());
}

#[tokio::test]
async fn regeneration_overwrites_the_same_rows_on_every_run() {
    let store = InMemoryStore::new();
    let ids: Vec<i64> = ["a", "b", "c"]
        .iter()
        .map(|title| store.seed("side_jobs", side_job_row(1, title)))
        .collect();

    let rewritten = json!({
        "side_jobs": [
            {"id": ids[2], "title": "Speedrun coaching", "description": "1:1 sessions"},
            {"id": ids[0], "title": "Patch notes digest", "description": "Weekly summary"},
            {"id": ids[1], "title": "Retro game repair", "description": "Fix old consoles"}
        ]
    });
    let request: RegenerateSideJobRequest = serde_json::from_value(json!({
        "feedbackData": {"reasons": ["LOW_PROFITABILITY"], "etcFeedback": "more money"},
        "generateSideJobRequest": developer_profile(1),
        "sideJobIds": ids
    }))
    .unwrap();

    // A retried task re-runs the whole graph
    for _ in 0..2 {
        let test_deps = TestDependencies::new()
            .with_ai(MockAI::new().with_json_response(rewritten.clone()))
            .with_store(store.clone());
        let graph = side_jobs::pipeline::regenerate_graph(test_deps.into_deps()).unwrap();
        let state = graph.run(SideJobState::regenerate(request.clone())).await.unwrap();

        let saved: Vec<i64> = state.saved_entities.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(saved, ids);
    }

    assert_eq!(store.count("side_jobs"), 3);
    assert_eq!(text(&store.row("side_jobs", ids[0]).unwrap(), "title"), "Patch notes digest");
    assert_eq!(text(&store.row("side_jobs", ids[2]).unwrap(), "title"), "Speedrun coaching");
}

#[tokio::test]
async fn regeneration_of_deleted_row_rolls_back() {
    let store = InMemoryStore::new();
    let kept = store.seed("side_jobs", side_job_row(1, "kept"));
    let request: RegenerateSideJobRequest = serde_json::from_value(json!({
        "generateSideJobRequest": developer_profile(1),
        "sideJobIds": [kept, 9999]
    }))
    .unwrap();
    let ai = MockAI::new().with_json_response(json!({
        "side_jobs": [{"title": "one"}, {"title": "two"}]
    }));
    let test_deps = TestDependencies::new().with_ai(ai).with_store(store.clone());
    let graph = side_jobs::pipeline::regenerate_graph(test_deps.into_deps()).unwrap();

    let err = graph.run(SideJobState::regenerate(request)).await.unwrap_err();

    assert!(matches!(err, WorkflowError::NodeFailed { ref node, .. } if node == "save_side_jobs"));
    assert_eq!(text(&store.row("side_jobs", kept).unwrap(), "title"), "kept");
    assert_eq!(store.rollback_count(), 1);
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn unparseable_output_saves_nothing() {
    let test_deps = TestDependencies::new().with_ai(MockAI::new().with_response("I cannot help with that."));
    let store = test_deps.store.clone();
    let graph = side_jobs::pipeline::generate_graph(test_deps.into_deps()).unwrap();

    let state = graph.run(SideJobState::generate(developer_profile(1))).await.unwrap();

    assert_eq!(state.saved_entities.map(|s| s.len()), Some(0));
    assert_eq!(store.count("side_jobs"), 0);
    assert_eq!(store.commit_count(), 0);
}

// =============================================================================
// Missions
// =============================================================================

#[tokio::test]
async fn saving_missions_selects_the_side_job() {
    let store = InMemoryStore::new();
    let sidejob_id = store.seed("side_jobs", side_job_row(1, "Game guide blog"));
    let test_deps = TestDependencies::new()
        .with_ai(MockAI::new().with_json_response(two_missions()))
        .with_store(store.clone());
    let graph = missions::pipeline::generate_graph(test_deps.into_deps()).unwrap();

    let state = graph.run(MissionState::new(mission_request(sidejob_id))).await.unwrap();

    let saved = state.saved_entities.unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].entity.order_no, 1);
    assert_eq!(saved[0].entity.guide.len(), 1);
    assert_eq!(store.count("missions"), 2);
    let side_job = store.row("side_jobs", sidejob_id).unwrap();
    assert_eq!(side_job.get("is_selected").and_then(SqlValue::as_bool), Some(true));
    assert_eq!(store.commit_count(), 1);
}

#[tokio::test]
async fn failed_mission_save_leaves_side_job_unselected() {
    let store = InMemoryStore::new();
    let sidejob_id = store.seed("side_jobs", side_job_row(1, "Game guide blog"));
    store.fail_writes_to("side_jobs");
    let test_deps = TestDependencies::new()
        .with_ai(MockAI::new().with_json_response(two_missions()))
        .with_store(store.clone());
    let graph = missions::pipeline::generate_graph(test_deps.into_deps()).unwrap();

    let result = graph.run(MissionState::new(mission_request(sidejob_id))).await;

    assert!(result.is_err());
    assert_eq!(store.count("missions"), 0);
    let side_job = store.row("side_jobs", sidejob_id).unwrap();
    assert_eq!(side_job.get("is_selected").and_then(SqlValue::as_bool), Some(false));
    assert_eq!(store.rollback_count(), 1);
}

#[tokio::test]
async fn missions_for_missing_side_job_are_not_saved() {
    let test_deps = TestDependencies::new().with_ai(MockAI::new().with_json_response(two_missions()));
    let store = test_deps.store.clone();
    let graph = missions::pipeline::generate_graph(test_deps.into_deps()).unwrap();

    let err = graph.run(MissionState::new(mission_request(404))).await.unwrap_err();

    assert!(format!("{:#}", anyhow::Error::from(err)).contains("side_jobs"));
    assert_eq!(store.count("missions"), 0);
}

// =============================================================================
// Mission steps
// =============================================================================

#[tokio::test]
async fn regenerated_steps_follow_their_id_hints() {
    let store = InMemoryStore::new();
    let step_row = |title: &str, seq: i64| {
        Row::new()
            .set("mission_id", 3i64)
            .set("seq", seq)
            .set("title", title)
            .set("detail", "")
            .set("status", "PLANNED")
    };
    let first = store.seed("mission_steps", step_row("Buy a mic", 1));
    let second = store.seed("mission_steps", step_row("Record intro", 2));

    let request: RegenerateMissionStepsRequest = serde_json::from_value(json!({
        "feedbackData": {"reasons": ["TOO_EASY"]},
        "generateMissionStep": {"userId": 1, "missionId": 3, "missionTitle": "Launch"},
        "missionStepIds": [first, second]
    }))
    .unwrap();
    let ai = MockAI::new().with_json_response(json!({
        "mission_steps": [
            {"id": second, "title": "Script a 3-minute episode", "seq": 2, "detail": "Outline first"},
            {"id": first, "title": "Compare three mics", "seq": 1, "detail": "Under $100"}
        ]
    }));
    let test_deps = TestDependencies::new().with_ai(ai).with_store(store.clone());
    let graph = mission_steps::pipeline::regenerate_graph(test_deps.into_deps()).unwrap();

    let state = graph.run(MissionStepState::regenerate(request)).await.unwrap();

    let saved = state.saved_entities.unwrap();
    assert_eq!(saved.iter().map(|s| s.id).collect::<Vec<_>>(), vec![first, second]);
    assert_eq!(text(&store.row("mission_steps", first).unwrap(), "title"), "Compare three mics");
    assert_eq!(text(&store.row("mission_steps", second).unwrap(), "title"), "Script a 3-minute episode");
    assert_eq!(store.count("mission_steps"), 2);
}
