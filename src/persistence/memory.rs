//! In-memory [`SyncStore`] for tests, with fault injection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::models::{EnrichmentEntry, TableSpec};
use super::{KeyLookup, RowWrite, SyncStore};
use crate::domain::ExternalAccount;
use crate::error::SyncError;

#[derive(Debug, Default)]
struct State {
    tables: HashMap<&'static str, BTreeMap<String, Value>>,
    cache: HashMap<String, EnrichmentEntry>,
    cache_reads: usize,
    cache_writes: usize,
    batch_writes: usize,
    row_writes: usize,
}

/// Store keeping every table as a map from natural key to row.
///
/// Batches containing the same key twice are rejected with SQLSTATE 21000
/// like PostgreSQL does for `INSERT … ON CONFLICT`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: Vec<ExternalAccount>,
    ghosts: HashMap<String, String>,
    conflict_batches: bool,
    hard_batches: bool,
    unreachable: bool,
    failing_rows: HashSet<String>,
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(mut self, accounts: Vec<ExternalAccount>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_ghost(mut self, ghost_id: &str, account_id: &str) -> Self {
        self.ghosts
            .insert(ghost_id.to_string(), account_id.to_string());
        self
    }

    /// Every batch write fails with a unique violation.
    pub fn fail_batches_with_conflict(mut self) -> Self {
        self.conflict_batches = true;
        self
    }

    /// Every batch write fails with a non-conflict database error.
    pub fn fail_batches_hard(mut self) -> Self {
        self.hard_batches = true;
        self
    }

    /// Single-row writes for this natural key fail with a check violation.
    pub fn fail_row(mut self, key: String) -> Self {
        self.failing_rows.insert(key);
        self
    }

    /// Every read and write fails as if the database were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn with_cached(self, original_url: &str, enriched_url: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.cache.insert(
                original_url.to_string(),
                EnrichmentEntry {
                    original_url: original_url.to_string(),
                    enriched_url: enriched_url.to_string(),
                    profile_data: Value::Null,
                },
            );
        }
        self
    }

    pub fn with_rows(self, table: &TableSpec, rows: Vec<Value>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            let stored = state.tables.entry(table.name).or_default();
            for row in rows {
                if let Some(key) = table.key_of(&row) {
                    stored.insert(key, row);
                }
            }
        }
        self
    }

    /// Stored rows of `table`, ordered by natural key.
    pub fn rows(&self, table: &TableSpec) -> Vec<Value> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.tables.get(table.name).map(|t| t.values().cloned().collect()))
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &TableSpec) -> usize {
        self.rows(table).len()
    }

    pub fn cache_entry(&self, original_url: &str) -> Option<EnrichmentEntry> {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.cache.get(original_url).cloned())
    }

    pub fn cache_reads(&self) -> usize {
        self.state.lock().map(|s| s.cache_reads).unwrap_or_default()
    }

    pub fn cache_writes(&self) -> usize {
        self.state.lock().map(|s| s.cache_writes).unwrap_or_default()
    }

    pub fn batch_writes(&self) -> usize {
        self.state.lock().map(|s| s.batch_writes).unwrap_or_default()
    }

    pub fn row_writes(&self) -> usize {
        self.state.lock().map(|s| s.row_writes).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, SyncError> {
        if self.unreachable {
            return Err(SyncError::Storage("connection refused".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| SyncError::Internal("memory store poisoned".to_string()))
    }
}

fn write_failed(conflict: bool, code: &str, message: &str) -> SyncError {
    SyncError::StorageWriteFailed {
        conflict,
        code: code.to_string(),
        message: message.to_string(),
    }
}

fn merge(table: &TableSpec, stored: &mut BTreeMap<String, Value>, key: String, row: &Value) -> RowWrite {
    match stored.get_mut(&key) {
        Some(existing) => {
            for column in table.update_columns() {
                if let (Some(target), Some(value)) = (existing.get_mut(column), row.get(column)) {
                    *target = value.clone();
                }
            }
            RowWrite::Updated
        }
        None => {
            stored.insert(key, row.clone());
            RowWrite::Inserted
        }
    }
}

#[async_trait]
impl SyncStore for MemoryStore {
    async fn team_accounts(&self) -> Result<Vec<ExternalAccount>, SyncError> {
        self.lock()?;
        Ok(self.accounts.clone())
    }

    async fn account_by_ghost_id(&self, ghost_id: &str) -> Result<Option<String>, SyncError> {
        self.lock()?;
        Ok(self.ghosts.get(ghost_id).cloned())
    }

    async fn cached_enrichment(&self, original_url: &str) -> Result<Option<String>, SyncError> {
        let mut state = self.lock()?;
        state.cache_reads += 1;
        Ok(state.cache.get(original_url).map(|e| e.enriched_url.clone()))
    }

    async fn save_enrichment(&self, entry: &EnrichmentEntry) -> Result<(), SyncError> {
        let mut state = self.lock()?;
        state.cache_writes += 1;
        state.cache.insert(entry.original_url.clone(), entry.clone());
        Ok(())
    }

    async fn existing_keys(&self, lookup: KeyLookup<'_>) -> Result<HashSet<String>, SyncError> {
        let state = self.lock()?;
        let wanted: HashSet<&str> = lookup.keys.iter().map(String::as_str).collect();
        Ok(state
            .tables
            .get(lookup.table.name)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter(|row| row.get(lookup.scope_column).and_then(Value::as_str) == Some(lookup.scope))
            .filter_map(|row| row.get(lookup.key_column).and_then(Value::as_str))
            .filter(|key| wanted.contains(key))
            .map(str::to_string)
            .collect())
    }

    async fn upsert_rows(&self, table: &TableSpec, rows: &[Value]) -> Result<(), SyncError> {
        let mut state = self.lock()?;
        state.batch_writes += 1;
        if self.hard_batches {
            return Err(write_failed(false, "53100", "disk full"));
        }
        if self.conflict_batches {
            return Err(write_failed(true, "23505", "duplicate key value"));
        }

        let mut keys = Vec::with_capacity(rows.len());
        let mut seen = HashSet::new();
        for row in rows {
            let key = table
                .key_of(row)
                .ok_or_else(|| write_failed(false, "23502", "null value in key column"))?;
            if !seen.insert(key.clone()) {
                return Err(write_failed(
                    true,
                    "21000",
                    "ON CONFLICT DO UPDATE command cannot affect row a second time",
                ));
            }
            keys.push(key);
        }

        let stored = state.tables.entry(table.name).or_default();
        for (key, row) in keys.into_iter().zip(rows) {
            merge(table, stored, key, row);
        }
        Ok(())
    }

    async fn upsert_row(&self, table: &TableSpec, row: &Value) -> Result<RowWrite, SyncError> {
        let mut state = self.lock()?;
        state.row_writes += 1;
        let key = table
            .key_of(row)
            .ok_or_else(|| write_failed(false, "23502", "null value in key column"))?;
        if self.failing_rows.contains(&key) {
            return Err(write_failed(false, "23514", "check constraint violated"));
        }
        let stored = state.tables.entry(table.name).or_default();
        Ok(merge(table, stored, key, row))
    }
}
