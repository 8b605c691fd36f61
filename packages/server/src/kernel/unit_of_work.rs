//! Transaction-scoped writes.
//!
//! [`PgUnitOfWork`] wraps one `sqlx` transaction. Rows are described with the
//! small [`Row`] value type so persistence nodes stay storage-agnostic and can
//! run against the in-memory store in tests.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::Postgres;
use sqlx::query_builder::Separated;
use sqlx::{PgPool, QueryBuilder, Transaction};
use tracing::debug;

use super::traits::{BaseUnitOfWorkFactory, UnitOfWork};

/// A column value the persistence layer knows how to bind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    OptText(Option<String>),
    Bool(bool),
}

impl SqlValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            SqlValue::OptText(v) => v.as_deref(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v.into())
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::OptText(v)
    }
}

/// Ordered column/value pairs for one row. Column names are compile-time
/// constants, never user input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    columns: Vec<(&'static str, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, replacing any earlier value for it.
    pub fn set(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((column, value)),
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|(name, _)| *name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (*name, value))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Overlay another row's columns onto this one.
    pub fn merged_with(mut self, other: &Row) -> Self {
        for (column, value) in other.iter() {
            self = self.set(column, value.clone());
        }
        self
    }
}

fn bind_value(builder: &mut Separated<'_, '_, Postgres, &'static str>, value: &SqlValue) {
    match value.clone() {
        SqlValue::Int(v) => builder.push_bind(v),
        SqlValue::Text(v) => builder.push_bind(v),
        SqlValue::OptText(v) => builder.push_bind(v),
        SqlValue::Bool(v) => builder.push_bind(v),
    };
}

// =============================================================================
// Postgres implementation
// =============================================================================

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn insert_rows(&mut self, table: &'static str, rows: &[Row]) -> Result<Vec<i64>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns = first.column_names();
        if rows.iter().any(|row| row.column_names() != columns) {
            return Err(anyhow!("rows for {} do not share one column layout", table));
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {} ({}) ", table, columns.join(", ")));
        builder.push_values(rows, |mut values, row| {
            for (_, value) in row.iter() {
                bind_value(&mut values, value);
            }
        });
        builder.push(" RETURNING id");

        let ids: Vec<i64> = builder
            .build_query_scalar()
            .fetch_all(&mut *self.tx)
            .await
            .with_context(|| format!("bulk insert into {} failed", table))?;

        debug!(table, count = ids.len(), "inserted rows");
        Ok(ids)
    }

    async fn update_row(&mut self, table: &'static str, id: i64, row: &Row) -> Result<u64> {
        if row.is_empty() {
            return Err(anyhow!("update of {} {} has no columns", table, id));
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("UPDATE {} SET ", table));
        let mut assignments = builder.separated(", ");
        for (column, value) in row.iter() {
            assignments.push(format!("{} = ", column));
            bind_value_unseparated(&mut assignments, value);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder
            .build()
            .execute(&mut *self.tx)
            .await
            .with_context(|| format!("update of {} {} failed", table, id))?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.commit().await.context("commit failed")
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.tx.rollback().await.context("rollback failed")
    }
}

fn bind_value_unseparated(builder: &mut Separated<'_, '_, Postgres, &'static str>, value: &SqlValue) {
    match value.clone() {
        SqlValue::Int(v) => builder.push_bind_unseparated(v),
        SqlValue::Text(v) => builder.push_bind_unseparated(v),
        SqlValue::OptText(v) => builder.push_bind_unseparated(v),
        SqlValue::Bool(v) => builder.push_bind_unseparated(v),
    };
}

/// Opens one transaction per persistence step on a shared pool.
#[derive(Clone)]
pub struct PgUnitOfWorkFactory {
    pool: PgPool,
}

impl PgUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseUnitOfWorkFactory for PgUnitOfWorkFactory {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await.context("failed to open transaction")?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}
