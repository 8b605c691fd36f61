//! Server dependencies for pipelines (using traits for testability)
//!
//! This module provides the dependency container handed to every job handler.
//! External services sit behind trait objects so tests can swap in mocks.

use std::sync::Arc;

use sqlx::PgPool;

use super::ai::OpenAIAdapter;
use super::unit_of_work::PgUnitOfWorkFactory;
use super::{BaseAI, BaseUnitOfWorkFactory, GenerationParams};
use crate::config::Config;

/// Dependencies shared by every pipeline run.
#[derive(Clone)]
pub struct ServerDeps {
    pub ai: Arc<dyn BaseAI>,
    pub uow_factory: Arc<dyn BaseUnitOfWorkFactory>,
    /// Defaults for generation calls; classification calls derive from these.
    pub generation: GenerationParams,
}

impl ServerDeps {
    pub fn new(
        ai: Arc<dyn BaseAI>,
        uow_factory: Arc<dyn BaseUnitOfWorkFactory>,
        generation: GenerationParams,
    ) -> Self {
        Self {
            ai,
            uow_factory,
            generation,
        }
    }

    /// Production wiring: OpenAI-compatible client plus Postgres transactions.
    pub fn from_config(config: &Config, pool: PgPool) -> Self {
        let client = openai_client::OpenAIClient::new(&config.openai_api_key)
            .with_base_url(&config.openai_base_url);

        Self::new(
            Arc::new(OpenAIAdapter::new(client, &config.ai_model)),
            Arc::new(PgUnitOfWorkFactory::new(pool)),
            config.generation,
        )
    }
}
