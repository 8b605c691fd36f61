// TestDependencies - mock implementations for testing
//
// Provides a scripted model and an in-memory transactional store that can be
// injected into ServerDeps for pipeline tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::unit_of_work::Row;
use super::{BaseAI, BaseUnitOfWorkFactory, GenerationParams, Prompt, ServerDeps, UnitOfWork};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Mock AI
// =============================================================================

enum ScriptedResponse {
    Text(String),
    Error(String),
}

/// One recorded call to the model.
#[derive(Debug, Clone)]
pub struct AICall {
    pub prompt: Prompt,
    pub params: GenerationParams,
}

/// Returns queued responses in order, then a fixed default.
pub struct MockAI {
    responses: Mutex<Vec<ScriptedResponse>>,
    calls: Mutex<Vec<AICall>>,
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Add a text response to the queue
    pub fn with_response(self, text: impl Into<String>) -> Self {
        lock(&self.responses).push(ScriptedResponse::Text(text.into()));
        self
    }

    /// Add a response serialized from JSON
    pub fn with_json_response(self, value: serde_json::Value) -> Self {
        self.with_response(value.to_string())
    }

    /// Make the next call fail
    pub fn with_error(self, message: impl Into<String>) -> Self {
        lock(&self.responses).push(ScriptedResponse::Error(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<AICall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn last_prompt(&self) -> Option<Prompt> {
        lock(&self.calls).last().map(|call| call.prompt.clone())
    }

    /// Check if any prompt contained the given text
    pub fn was_called_with(&self, text: &str) -> bool {
        lock(&self.calls)
            .iter()
            .any(|call| call.prompt.user.contains(text) || call.prompt.system.contains(text))
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn send(&self, prompt: &Prompt, params: &GenerationParams) -> Result<String> {
        lock(&self.calls).push(AICall {
            prompt: prompt.clone(),
            params: *params,
        });

        let mut responses = lock(&self.responses);
        if responses.is_empty() {
            return Ok("Mock AI response".to_string());
        }
        match responses.remove(0) {
            ScriptedResponse::Text(text) => Ok(text),
            ScriptedResponse::Error(message) => Err(anyhow!(message)),
        }
    }
}

// =============================================================================
// In-memory store
// =============================================================================

type Tables = HashMap<&'static str, BTreeMap<i64, Row>>;

#[derive(Default)]
struct StoreInner {
    tables: Tables,
    sequences: HashMap<&'static str, i64>,
    failing_tables: HashSet<&'static str>,
    commits: usize,
    rollbacks: usize,
}

impl StoreInner {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }
}

/// Tables held in memory with transactional visibility.
///
/// Each unit of work operates on a copy taken at `begin`; the copy replaces
/// the shared tables on commit and is discarded on rollback or drop. Ids come
/// from a per-table sequence and are not reused after a rollback.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a committed row directly and return its id.
    pub fn seed(&self, table: &'static str, row: Row) -> i64 {
        let mut inner = lock(&self.inner);
        let id = inner.next_id(table);
        inner.tables.entry(table).or_default().insert(id, row);
        id
    }

    /// Make every write to `table` fail.
    pub fn fail_writes_to(&self, table: &'static str) {
        lock(&self.inner).failing_tables.insert(table);
    }

    /// Committed rows of a table, ordered by id.
    pub fn rows(&self, table: &str) -> Vec<(i64, Row)> {
        lock(&self.inner)
            .tables
            .get(table)
            .map(|rows| rows.iter().map(|(id, row)| (*id, row.clone())).collect())
            .unwrap_or_default()
    }

    pub fn row(&self, table: &str, id: i64) -> Option<Row> {
        lock(&self.inner)
            .tables
            .get(table)
            .and_then(|rows| rows.get(&id).cloned())
    }

    pub fn count(&self, table: &str) -> usize {
        lock(&self.inner).tables.get(table).map_or(0, BTreeMap::len)
    }

    pub fn commit_count(&self) -> usize {
        lock(&self.inner).commits
    }

    pub fn rollback_count(&self) -> usize {
        lock(&self.inner).rollbacks
    }
}

#[async_trait]
impl BaseUnitOfWorkFactory for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let working = lock(&self.inner).tables.clone();
        Ok(Box::new(InMemoryUnitOfWork {
            store: self.clone(),
            working,
        }))
    }
}

struct InMemoryUnitOfWork {
    store: InMemoryStore,
    working: Tables,
}

impl InMemoryUnitOfWork {
    fn check_writable(&self, table: &'static str) -> Result<()> {
        if lock(&self.store.inner).failing_tables.contains(table) {
            return Err(anyhow!("write to {} rejected", table));
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn insert_rows(&mut self, table: &'static str, rows: &[Row]) -> Result<Vec<i64>> {
        self.check_writable(table)?;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id = lock(&self.store.inner).next_id(table);
            self.working.entry(table).or_default().insert(id, row.clone());
            ids.push(id);
        }
        Ok(ids)
    }

    async fn update_row(&mut self, table: &'static str, id: i64, row: &Row) -> Result<u64> {
        self.check_writable(table)?;
        let Some(stored) = self.working.get_mut(table).and_then(|rows| rows.get_mut(&id)) else {
            return Ok(0);
        };
        *stored = stored.clone().merged_with(row);
        Ok(1)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        let mut inner = lock(&this.store.inner);
        inner.tables = this.working;
        inner.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        lock(&self.store.inner).rollbacks += 1;
        Ok(())
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

pub struct TestDependencies {
    pub ai: Arc<MockAI>,
    pub store: InMemoryStore,
    pub generation: GenerationParams,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            ai: Arc::new(MockAI::new()),
            store: InMemoryStore::new(),
            generation: GenerationParams::default(),
        }
    }

    pub fn with_ai(mut self, ai: MockAI) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    pub fn with_store(mut self, store: InMemoryStore) -> Self {
        self.store = store;
        self
    }

    pub fn into_deps(self) -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            self.ai,
            Arc::new(self.store),
            self.generation,
        ))
    }
}
