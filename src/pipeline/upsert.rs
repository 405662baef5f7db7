//! Idempotent batched writes with per-row fallback.
//!
//! Rows are written in one statement merging on the table's natural key.
//! When that statement fails on a conflict-class error, the batch is
//! replayed one row at a time and each outcome is classified separately.

use std::time::Duration;

use serde_json::Value;

use super::pacing::Pacer;
use crate::domain::ErrorRecord;
use crate::error::SyncError;
use crate::persistence::{RowWrite, SyncStore, TableRow, TableSpec};

/// Counters for one [`UpsertSink::upsert_batch`] call.
///
/// `inserted + skipped + errors.len()` always equals the input size.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertReport {
    /// Rows written (inserted or merged on the batch path, inserted on the
    /// per-row path).
    pub inserted: u32,
    /// Rows without key material, or already present on the per-row path.
    pub skipped: u32,
    /// Rows that failed individually.
    pub errors: Vec<ErrorRecord>,
    /// Natural keys of the failed rows.
    pub failed_keys: Vec<String>,
    /// Whether the per-row path was taken.
    pub fell_back: bool,
}

impl UpsertReport {
    /// Number of rows that failed individually.
    #[must_use]
    pub fn errored(&self) -> usize {
        self.errors.len()
    }
}

/// Batched writer bound to one store.
#[derive(Debug)]
pub struct UpsertSink<'a> {
    store: &'a dyn SyncStore,
    pacer: &'a dyn Pacer,
    row_pause: Duration,
    row_pause_every: usize,
}

impl<'a> UpsertSink<'a> {
    /// Creates a sink pausing `row_pause` every `row_pause_every` rows on
    /// the per-row path.
    #[must_use]
    pub const fn new(
        store: &'a dyn SyncStore,
        pacer: &'a dyn Pacer,
        row_pause: Duration,
        row_pause_every: usize,
    ) -> Self {
        Self {
            store,
            pacer,
            row_pause,
            row_pause_every,
        }
    }

    /// Serializes typed rows and writes them to their table.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Internal`] if a row cannot be serialized, or
    /// whatever [`Self::upsert_batch`] returns.
    pub async fn upsert<R: TableRow + Sync>(&self, rows: &[R]) -> Result<UpsertReport, SyncError> {
        let values = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SyncError::Internal(format!("row serialization: {e}")))?;
        self.upsert_batch(&R::TABLE, values).await
    }

    /// Writes `rows` to `table`, merging on its natural key.
    ///
    /// # Errors
    ///
    /// Returns the batch error unchanged when it is not conflict-class
    /// (storage unreachable, constraint outside the key). Per-row failures
    /// on the fallback path are reported in [`UpsertReport::errors`].
    pub async fn upsert_batch(
        &self,
        table: &TableSpec,
        rows: Vec<Value>,
    ) -> Result<UpsertReport, SyncError> {
        let mut report = UpsertReport::default();
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            match table.key_of(&row) {
                Some(key) => keyed.push((key, row)),
                None => report.skipped += 1,
            }
        }
        if report.skipped > 0 {
            tracing::debug!(table = table.name, skipped = report.skipped, "rows without key material");
        }
        if keyed.is_empty() {
            return Ok(report);
        }

        let batch: Vec<Value> = keyed.iter().map(|(_, row)| row.clone()).collect();
        match self.store.upsert_rows(table, &batch).await {
            Ok(()) => {
                report.inserted += count(keyed.len());
                tracing::debug!(table = table.name, rows = keyed.len(), "batch upserted");
                Ok(report)
            }
            Err(err) if err.is_conflict() => {
                tracing::warn!(
                    table = table.name,
                    rows = keyed.len(),
                    error = %err,
                    "batch conflict, falling back to single rows"
                );
                report.fell_back = true;
                self.row_by_row(table, keyed, &mut report).await;
                Ok(report)
            }
            Err(err) => Err(err),
        }
    }

    async fn row_by_row(
        &self,
        table: &TableSpec,
        keyed: Vec<(String, Value)>,
        report: &mut UpsertReport,
    ) {
        let total = keyed.len();
        for (idx, (key, row)) in keyed.into_iter().enumerate() {
            match self.store.upsert_row(table, &row).await {
                Ok(RowWrite::Inserted) => report.inserted += 1,
                Ok(RowWrite::Updated) => report.skipped += 1,
                Err(err) if err.is_conflict() => report.skipped += 1,
                Err(err) => {
                    tracing::warn!(table = table.name, key = %key, error = %err, "row write failed");
                    report
                        .errors
                        .push(ErrorRecord::from_error(&err, subject_of(table, &row, &key)));
                    report.failed_keys.push(key);
                }
            }
            let written = idx + 1;
            if self.row_pause_every > 0 && written % self.row_pause_every == 0 && written < total {
                self.pacer.pause(self.row_pause, "row_batch").await;
            }
        }
    }
}

/// First key column value, for readable error records.
fn subject_of(table: &TableSpec, row: &Value, key: &str) -> String {
    table
        .conflict_key
        .first()
        .and_then(|column| row.get(*column))
        .and_then(Value::as_str)
        .map_or_else(|| key.to_string(), str::to_string)
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
