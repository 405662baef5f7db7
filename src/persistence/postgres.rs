//! PostgreSQL implementation of [`SyncStore`].

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use super::models::{EnrichmentEntry, TableSpec};
use super::{KeyLookup, RowWrite, SyncStore};
use crate::domain::ExternalAccount;
use crate::error::SyncError;

/// SQLSTATEs treated as conflict-class: `unique_violation` and
/// `cardinality_violation` (the same key twice in one `ON CONFLICT` batch).
const CONFLICT_CODES: [&str; 2] = ["23505", "21000"];

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Builds `INSERT … SELECT … FROM <source> ON CONFLICT (<key>) DO UPDATE`.
///
/// Rows arrive as JSON and are expanded with `jsonb_populate_record(set)`
/// against the table's own row type, so column types come from the schema.
fn upsert_sql(table: &TableSpec, source: &str) -> String {
    let columns = table.columns.join(", ");
    let key = table.conflict_key.join(", ");
    let updates: Vec<String> = table
        .update_columns()
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    let action = if updates.is_empty() {
        "NOTHING".to_string()
    } else {
        format!("UPDATE SET {}", updates.join(", "))
    };
    format!(
        "INSERT INTO {name} ({columns}) SELECT {columns} FROM {source} ON CONFLICT ({key}) DO {action}",
        name = table.name,
    )
}

fn batch_upsert_sql(table: &TableSpec) -> String {
    upsert_sql(
        table,
        &format!("jsonb_populate_recordset(NULL::{}, $1)", table.name),
    )
}

fn row_upsert_sql(table: &TableSpec) -> String {
    format!(
        "{} RETURNING (xmax = 0) AS inserted",
        upsert_sql(
            table,
            &format!("jsonb_populate_record(NULL::{}, $1)", table.name)
        )
    )
}

fn read_error(err: sqlx::Error) -> SyncError {
    SyncError::Storage(err.to_string())
}

/// Database rejections become [`SyncError::StorageWriteFailed`]; anything
/// else (pool timeout, I/O) means storage is unreachable.
fn write_error(err: sqlx::Error) -> SyncError {
    match &err {
        sqlx::Error::Database(db) => {
            let code = db
                .code()
                .map_or_else(|| "unknown".to_string(), |c| c.into_owned());
            SyncError::StorageWriteFailed {
                conflict: CONFLICT_CODES.contains(&code.as_str()),
                code,
                message: db.message().to_string(),
            }
        }
        _ => SyncError::Storage(err.to_string()),
    }
}

#[async_trait]
impl SyncStore for PostgresStore {
    async fn team_accounts(&self) -> Result<Vec<ExternalAccount>, SyncError> {
        let rows = sqlx::query_as::<_, (String, Option<String>, Option<String>)>(
            "SELECT id::text, linkedin_url_owner_post, unipile_account_id FROM workspace_team \
             WHERE unipile_account_id IS NOT NULL ORDER BY linkedin_url_owner_post",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, owner_url, account_id)| {
                let owner_url = owner_url.filter(|s| !s.trim().is_empty())?;
                let account_id = account_id.filter(|s| !s.trim().is_empty())?;
                Some(ExternalAccount {
                    id,
                    account_id,
                    owner_url,
                })
            })
            .collect())
    }

    async fn account_by_ghost_id(&self, ghost_id: &str) -> Result<Option<String>, SyncError> {
        let account = sqlx::query_scalar::<_, Option<String>>(
            "SELECT unipile_account_id FROM workspace_team WHERE ghost_genius_account_id = $1 LIMIT 1",
        )
        .bind(ghost_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_error)?;

        Ok(account.flatten().filter(|s| !s.trim().is_empty()))
    }

    async fn cached_enrichment(&self, original_url: &str) -> Result<Option<String>, SyncError> {
        sqlx::query_scalar::<_, String>(
            "SELECT enriched_url FROM enriched_contacts WHERE original_url = $1",
        )
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(read_error)
    }

    async fn save_enrichment(&self, entry: &EnrichmentEntry) -> Result<(), SyncError> {
        sqlx::query(
            "INSERT INTO enriched_contacts (original_url, enriched_url, profile_data, updated_at) \
             VALUES ($1, $2, $3, now()) \
             ON CONFLICT (original_url) DO UPDATE SET enriched_url = EXCLUDED.enriched_url, \
             profile_data = EXCLUDED.profile_data, updated_at = now()",
        )
        .bind(&entry.original_url)
        .bind(&entry.enriched_url)
        .bind(&entry.profile_data)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn existing_keys(&self, lookup: KeyLookup<'_>) -> Result<HashSet<String>, SyncError> {
        if lookup.keys.is_empty() {
            return Ok(HashSet::new());
        }
        let sql = format!(
            "SELECT {key} FROM {table} WHERE {scope} = $1 AND {key} = ANY($2)",
            key = lookup.key_column,
            table = lookup.table.name,
            scope = lookup.scope_column,
        );
        let keys = sqlx::query_scalar::<_, String>(&sql)
            .bind(lookup.scope)
            .bind(lookup.keys)
            .fetch_all(&self.pool)
            .await
            .map_err(read_error)?;
        Ok(keys.into_iter().collect())
    }

    async fn upsert_rows(&self, table: &TableSpec, rows: &[Value]) -> Result<(), SyncError> {
        if rows.is_empty() {
            return Ok(());
        }
        let payload = Value::Array(rows.to_vec());
        sqlx::query(&batch_upsert_sql(table))
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(write_error)?;
        Ok(())
    }

    async fn upsert_row(&self, table: &TableSpec, row: &Value) -> Result<RowWrite, SyncError> {
        let inserted = sqlx::query_scalar::<_, bool>(&row_upsert_sql(table))
            .bind(row)
            .fetch_optional(&self.pool)
            .await
            .map_err(write_error)?;
        Ok(match inserted {
            Some(true) => RowWrite::Inserted,
            Some(false) | None => RowWrite::Updated,
        })
    }
}
