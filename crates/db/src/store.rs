//! The `QueryStore` trait — the contract every store backend must fulfil.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{DbError, Query};

/// A single row as returned by the store: a JSON object keyed by column name,
/// with embedded relations under their alias.
pub type Row = Map<String, Value>;

/// Executes [`Query`] values against a backing store.
///
/// Implementations only provide [`execute`](QueryStore::execute); the fetch
/// helpers layer the row-count contracts on top of it.
#[async_trait]
pub trait QueryStore: Send + Sync {
    /// Run the query and return every row it produced.
    async fn execute(&self, query: Query) -> Result<Vec<Row>, DbError>;

    /// Return all rows.
    async fn fetch_all(&self, query: Query) -> Result<Vec<Row>, DbError> {
        self.execute(query).await
    }

    /// Return zero or one row.
    ///
    /// Returns `DbError::MultipleRows` if more than one row matched.
    async fn fetch_optional(&self, query: Query) -> Result<Option<Row>, DbError> {
        let mut rows = self.execute(query).await?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(DbError::MultipleRows(n)),
        }
    }

    /// Return exactly one row.
    ///
    /// Returns `DbError::NotFound` if nothing matched and
    /// `DbError::MultipleRows` if more than one row did.
    async fn fetch_one(&self, query: Query) -> Result<Row, DbError> {
        self.fetch_optional(query).await?.ok_or(DbError::NotFound)
    }
}
