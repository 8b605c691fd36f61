//! Persistence node: upsert generated entities inside one unit of work.
//!
//! Without existing ids every draft is inserted with a single bulk
//! `INSERT ... RETURNING id`. With existing ids (regeneration) each draft
//! overwrites one row by id. Any failure, including a post-save side effect,
//! rolls the whole unit of work back.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::node::Node;
use super::state::GraphState;
use crate::kernel::{Row, ServerDeps, UnitOfWork};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no {table} row with id {id}")]
    MissingRow { table: &'static str, id: i64 },
}

/// An entity that maps onto one table row.
pub trait Persistable: Serialize + Clone + Send + Sync + 'static {
    const TABLE: &'static str;

    fn to_row(&self) -> Row;
}

/// A written entity echoed back with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Saved<T> {
    pub id: i64,
    #[serde(flatten)]
    pub entity: T,
}

/// An entity ready to write, plus the id the model said it replaces.
#[derive(Debug, Clone)]
pub struct Draft<T> {
    pub hint_id: Option<i64>,
    pub entity: T,
}

impl<T> Draft<T> {
    pub fn new(entity: T) -> Self {
        Self { hint_id: None, entity }
    }

    pub fn replacing(hint_id: Option<i64>, entity: T) -> Self {
        Self { hint_id, entity }
    }
}

/// What a pipeline plugs into [`SaveNode`].
#[async_trait]
pub trait PersistenceStep: Send + Sync + 'static {
    type State: GraphState;
    type Entity: Persistable;

    const NAME: &'static str;

    /// Entities to write, with save-time defaults applied.
    fn drafts(&self, state: &Self::State) -> Vec<Draft<Self::Entity>>;

    /// Rows to overwrite in place. `None` or empty means insert.
    fn existing_ids(&self, _state: &Self::State) -> Option<Vec<i64>> {
        None
    }

    /// Extra writes that must commit or roll back with the entities.
    async fn after_save(
        &self,
        _uow: &mut dyn UnitOfWork,
        _state: &Self::State,
        _saved: &[Saved<Self::Entity>],
    ) -> Result<()> {
        Ok(())
    }

    fn into_patch(&self, saved: Vec<Saved<Self::Entity>>) -> <Self::State as GraphState>::Patch;
}

pub struct SaveNode<P: PersistenceStep> {
    step: P,
    deps: Arc<ServerDeps>,
}

impl<P: PersistenceStep> SaveNode<P> {
    pub fn new(step: P, deps: Arc<ServerDeps>) -> Self {
        Self { step, deps }
    }

    async fn write(
        &self,
        uow: &mut dyn UnitOfWork,
        state: &P::State,
        drafts: Vec<Draft<P::Entity>>,
    ) -> Result<Vec<Saved<P::Entity>>> {
        let table = <P::Entity as Persistable>::TABLE;

        let saved = match self.step.existing_ids(state).filter(|ids| !ids.is_empty()) {
            Some(ids) => {
                let mut saved = Vec::new();
                for (id, entity) in correlate_ids(P::NAME, &ids, drafts) {
                    let touched = uow.update_row(table, id, &entity.to_row()).await?;
                    if touched == 0 {
                        return Err(PersistenceError::MissingRow { table, id }.into());
                    }
                    saved.push(Saved { id, entity });
                }
                info!(node = P::NAME, table, count = saved.len(), "updated rows in place");
                saved
            }
            None => {
                let rows: Vec<Row> = drafts.iter().map(|d| d.entity.to_row()).collect();
                let ids = uow.insert_rows(table, &rows).await?;
                if ids.len() != rows.len() {
                    return Err(anyhow!(
                        "insert into {} returned {} ids for {} rows",
                        table,
                        ids.len(),
                        rows.len()
                    ));
                }
                info!(node = P::NAME, table, count = ids.len(), "inserted rows");
                ids.into_iter()
                    .zip(drafts)
                    .map(|(id, draft)| Saved {
                        id,
                        entity: draft.entity,
                    })
                    .collect()
            }
        };

        self.step.after_save(uow, state, &saved).await?;
        Ok(saved)
    }
}

#[async_trait]
impl<P: PersistenceStep> Node<P::State> for SaveNode<P> {
    fn name(&self) -> &str {
        P::NAME
    }

    async fn execute(&self, state: &P::State) -> Result<<P::State as GraphState>::Patch> {
        let drafts = self.step.drafts(state);
        if drafts.is_empty() {
            warn!(node = P::NAME, "nothing to save");
            return Ok(self.step.into_patch(Vec::new()));
        }

        let mut uow = self.deps.uow_factory.begin().await?;
        match self.write(uow.as_mut(), state, drafts).await {
            Ok(saved) => {
                uow.commit().await?;
                Ok(self.step.into_patch(saved))
            }
            Err(e) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!(node = P::NAME, error = %rollback_err, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Pair drafts with the rows they overwrite.
///
/// A draft whose `hint_id` is one of `ids` takes that row. The remaining
/// drafts take the remaining ids in order. Surplus drafts are dropped and
/// surplus ids are left untouched; both are logged.
pub fn correlate_ids<T>(node: &str, ids: &[i64], drafts: Vec<Draft<T>>) -> Vec<(i64, T)> {
    let known: HashSet<i64> = ids.iter().copied().collect();
    let mut claimed: HashSet<i64> = HashSet::new();
    let mut keyed: Vec<(i64, T)> = Vec::new();
    let mut unkeyed: Vec<T> = Vec::new();

    for draft in drafts {
        match draft.hint_id {
            Some(id) if known.contains(&id) && claimed.insert(id) => keyed.push((id, draft.entity)),
            Some(id) => {
                warn!(node, id, "ignoring id that is not an open regeneration target");
                unkeyed.push(draft.entity);
            }
            None => unkeyed.push(draft.entity),
        }
    }

    let mut open = ids.iter().copied().filter(|id| !claimed.contains(id));
    let mut unkeyed = unkeyed.into_iter();
    let mut pairs = keyed;
    loop {
        match (open.next(), unkeyed.next()) {
            (Some(id), Some(entity)) => pairs.push((id, entity)),
            (Some(id), None) => {
                let left = 1 + open.count();
                warn!(node, first_untouched = id, count = left, "fewer generated items than ids, rows left unchanged");
                break;
            }
            (None, Some(_)) => {
                let dropped = 1 + unkeyed.count();
                warn!(node, count = dropped, "more generated items than ids, extras dropped");
                break;
            }
            (None, None) => break,
        }
    }

    // Report in request order
    let position = |id: &i64| ids.iter().position(|x| x == id).unwrap_or(usize::MAX);
    pairs.sort_by_key(|(id, _)| position(id));
    pairs
}
