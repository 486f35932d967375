// Document store adapter trait.
//
// Every backend (memory, MongoDB) implements this trait. Records travel as
// `serde_json::Value` objects keyed by `id`; the typed stores in the
// `pushgate` crate convert to and from the domain models.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::schema::Schema;
use crate::error::PushgateError;

/// Result type for adapter operations.
pub type AdapterResult<T> = std::result::Result<T, PushgateError>;

// ─── Where Clause ────────────────────────────────────────────────

/// Comparison operators for WHERE clauses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Equal (default).
    #[default]
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Value is in the given list.
    In,
}

/// A single WHERE condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    /// The field name to filter on.
    pub field: String,
    /// The comparison value.
    pub value: serde_json::Value,
    /// The comparison operator (default: Eq).
    #[serde(default)]
    pub operator: Operator,
    /// Connector to the next clause. None means AND.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<Connector>,
}

/// Logical connector between WHERE clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Connector {
    And,
    Or,
}

impl WhereClause {
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            operator,
            connector: None,
        }
    }

    /// Simple equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(field, Operator::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(field, Operator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(field, Operator::Gte, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self::new(field, Operator::Lte, value)
    }

    pub fn is_in(field: impl Into<String>, values: Vec<serde_json::Value>) -> Self {
        Self::new(field, Operator::In, serde_json::Value::Array(values))
    }

    /// Connect this clause to the next one with OR.
    pub fn or(mut self) -> Self {
        self.connector = Some(Connector::Or);
        self
    }
}

// ─── Sort / Pagination ───────────────────────────────────────────

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Sort specification (field + direction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

impl SortBy {
    /// Newest-first ordering on `createdAt`.
    pub fn newest_first() -> Self {
        Self {
            field: "createdAt".to_string(),
            direction: SortDirection::Desc,
        }
    }
}

/// Query parameters for `find_many`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindManyQuery {
    pub where_clauses: Vec<WhereClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
}

impl FindManyQuery {
    pub fn filter(where_clauses: Vec<WhereClause>) -> Self {
        Self {
            where_clauses,
            ..Default::default()
        }
    }

    pub fn sorted(mut self, sort: SortBy) -> Self {
        self.sort_by = Some(sort);
        self
    }

    pub fn page(mut self, offset: u64, limit: u64) -> Self {
        self.offset = Some(offset as i64);
        self.limit = Some(limit as i64);
        self
    }
}

// ─── Adapter Trait ───────────────────────────────────────────────

/// The document store adapter.
///
/// `model` names a collection (`users`, `subscriptions`, `notifications`).
/// `update` applies a shallow merge of `data` onto the first matching record.
#[async_trait]
pub trait Adapter: Send + Sync + fmt::Debug {
    /// Insert a record. An `id` is generated when the input has none.
    /// Returns the stored record.
    async fn create(&self, model: &str, data: serde_json::Value) -> AdapterResult<serde_json::Value>;

    /// Find the first record matching the WHERE clauses.
    async fn find_one(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Find all records matching the query.
    async fn find_many(
        &self,
        model: &str,
        query: FindManyQuery,
    ) -> AdapterResult<Vec<serde_json::Value>>;

    /// Count records matching the WHERE clauses.
    async fn count(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64>;

    /// Update the first matching record. Returns the updated record, or
    /// `None` when nothing matched.
    async fn update(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Add each of `values` to the array `field` of the first matching
    /// record unless already present, and merge `data` into the record, in
    /// one atomic step. Returns the updated record, or `None` when nothing
    /// matched.
    async fn add_to_set(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        values: &[serde_json::Value],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Remove every occurrence of `values` from the array `field` of the
    /// first matching record and merge `data` into it, atomically.
    async fn pull_all(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        field: &str,
        values: &[serde_json::Value],
        data: serde_json::Value,
    ) -> AdapterResult<Option<serde_json::Value>>;

    /// Update every matching record. Returns the number of affected records.
    async fn update_many(
        &self,
        model: &str,
        where_clauses: &[WhereClause],
        data: serde_json::Value,
    ) -> AdapterResult<i64>;

    /// Delete every matching record. Returns the number removed.
    async fn delete_many(&self, model: &str, where_clauses: &[WhereClause]) -> AdapterResult<i64>;

    /// Create the indexes described by `schema`. Idempotent.
    async fn ensure_indexes(&self, schema: &Schema) -> AdapterResult<()>;
}
