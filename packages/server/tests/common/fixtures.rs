//! Test fixtures: request payloads, scripted model output, seeded rows.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use sidequest_core::domains::side_jobs::GenerateSideJobRequest;
use sidequest_core::kernel::{BaseUnitOfWorkFactory, GenerationParams, MockAI, PgUnitOfWorkFactory, ServerDeps};
use sqlx::PgPool;

static NEXT_USER_ID: AtomicI64 = AtomicI64::new(10_000);

/// A user id no other test in this binary uses.
pub fn unique_user_id() -> i64 {
    NEXT_USER_ID.fetch_add(1, Ordering::SeqCst)
}

/// The onboarding profile used across the suite.
pub fn developer_profile(user_id: i64) -> GenerateSideJobRequest {
    serde_json::from_value(json!({
        "userId": user_id,
        "job": "developer",
        "hobbies": ["gaming"],
        "expressionStyle": "TEXT",
        "strengthType": "creative"
    }))
    .expect("profile fixture is valid")
}

/// Model output with three side-job ideas.
pub fn three_side_jobs() -> Value {
    json!({
        "side_jobs": [
            {"title": "Game guide blog", "description": "Write walkthroughs for new releases"},
            {"title": "Indie QA tester", "description": "Test indie games before launch"},
            {"title": "Mod tutorials", "description": "Teach modding on a newsletter"}
        ],
        "prompt_meta": "developer/gaming"
    })
}

pub fn two_missions() -> Value {
    json!({
        "missions": [
            {"title": "Pick a niche", "orderNo": 1, "notes": "Choose one genre",
             "guide": [{"guideTitle": "Research", "description": "List 10 games"}]},
            {"title": "First post", "orderNo": 2, "notes": "Publish one guide"}
        ]
    })
}

/// Deps wired to a real Postgres unit of work and a scripted model.
pub fn postgres_deps(pool: &PgPool, ai: MockAI) -> Arc<ServerDeps> {
    let uow_factory: Arc<dyn BaseUnitOfWorkFactory> = Arc::new(PgUnitOfWorkFactory::new(pool.clone()));
    Arc::new(ServerDeps::new(Arc::new(ai), uow_factory, GenerationParams::default()))
}

/// Insert a side job directly and return its id.
pub async fn seed_side_job(pool: &PgPool, user_id: i64, title: &str) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO side_jobs (user_id, title, description, prompt_meta, is_selected) \
         VALUES ($1, $2, '', '', FALSE) RETURNING id",
    )
    .bind(user_id)
    .bind(title)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

pub async fn side_job_selected(pool: &PgPool, id: i64) -> Result<bool> {
    let selected = sqlx::query_scalar::<_, bool>("SELECT is_selected FROM side_jobs WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(selected)
}
