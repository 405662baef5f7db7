//! Persistence layer: team accounts, enrichment cache and scraped rows.
//!
//! [`SyncStore`] is everything the pipelines need from storage: account
//! lookups, the enrichment cache, a key-set membership query for dedup
//! against storage, and upserts keyed by a table's natural key. The
//! concrete implementation uses `sqlx::PgPool`; tests use an in-memory
//! store.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::ExternalAccount;
use crate::error::SyncError;

#[cfg(test)]
pub(crate) mod memory;
pub mod models;
pub mod postgres;

pub use models::{EnrichmentEntry, TableRow, TableSpec};
pub use postgres::PostgresStore;

/// Outcome of a single-row upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowWrite {
    /// The natural key was new.
    Inserted,
    /// The natural key already existed; mutable columns were refreshed.
    Updated,
}

/// Membership query: which of `keys` already exist in `key_column` for
/// rows where `scope_column = scope`.
#[derive(Debug, Clone, Copy)]
pub struct KeyLookup<'a> {
    /// Table to search.
    pub table: &'a TableSpec,
    /// Owner/scope column.
    pub scope_column: &'a str,
    /// Owner/scope value.
    pub scope: &'a str,
    /// Column holding the subject key.
    pub key_column: &'a str,
    /// Candidate keys.
    pub keys: &'a [String],
}

/// Storage operations used by the pipelines.
#[async_trait]
pub trait SyncStore: Send + Sync + fmt::Debug {
    /// Team accounts with a scraping-proxy session.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] when the query fails.
    async fn team_accounts(&self) -> Result<Vec<ExternalAccount>, SyncError>;

    /// Proxy account id of the team member with this ghost account id.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] when the query fails.
    async fn account_by_ghost_id(&self, ghost_id: &str) -> Result<Option<String>, SyncError>;

    /// Canonical URL cached for `original_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] when the query fails.
    async fn cached_enrichment(&self, original_url: &str) -> Result<Option<String>, SyncError>;

    /// Stores or refreshes a cache entry, keyed by its original URL.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StorageWriteFailed`] when the write fails.
    async fn save_enrichment(&self, entry: &EnrichmentEntry) -> Result<(), SyncError>;

    /// Keys from `lookup.keys` already stored for the scope.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] when the query fails.
    async fn existing_keys(&self, lookup: KeyLookup<'_>) -> Result<HashSet<String>, SyncError>;

    /// Upserts all rows in one statement, merging on the table's natural key.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StorageWriteFailed`]; `conflict` is set for
    /// unique-violation class failures.
    async fn upsert_rows(&self, table: &TableSpec, rows: &[Value]) -> Result<(), SyncError>;

    /// Upserts a single row and reports whether it was new.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::StorageWriteFailed`] when the write fails.
    async fn upsert_row(&self, table: &TableSpec, row: &Value) -> Result<RowWrite, SyncError>;
}
