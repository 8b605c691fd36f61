// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// What to prompt for and what to save lives in the domain pipelines.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseUnitOfWorkFactory)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::unit_of_work::Row;

// =============================================================================
// AI Trait (Infrastructure - single request/response LLM call)
// =============================================================================

/// Sampling parameters forwarded to the model on every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Stream tokens from the provider. The adapter still returns one string.
    pub streaming: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 1.0,
            max_tokens: 1500,
            streaming: false,
        }
    }
}

impl GenerationParams {
    /// Deterministic settings for classification-style calls.
    pub fn deterministic(self) -> Self {
        Self {
            temperature: 0.0,
            ..self
        }
    }
}

/// A rendered prompt: system instructions plus the user turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }

    /// Total characters sent to the model.
    pub fn len(&self) -> usize {
        self.system.chars().count() + self.user.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.system.is_empty() && self.user.is_empty()
    }
}

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Send a prompt and return the raw completion text.
    ///
    /// Implementations must not retry; retries happen at the task level so the
    /// whole pipeline re-runs together.
    async fn send(&self, prompt: &Prompt, params: &GenerationParams) -> Result<String>;
}

// =============================================================================
// Unit of Work Traits (Infrastructure - transactional writes)
// =============================================================================

/// One open transaction.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// every write made through it.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Insert all rows in one statement and return generated ids in row order.
    async fn insert_rows(&mut self, table: &'static str, rows: &[Row]) -> Result<Vec<i64>>;

    /// Overwrite the given columns of one row. Returns the number of rows touched.
    async fn update_row(&mut self, table: &'static str, id: i64, row: &Row) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait BaseUnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}
