//! Run counters and summaries.
//!
//! [`RunStats`] is scoped to one account within one execution; the
//! orchestrator folds them into a [`RunSummary`]. Neither is persisted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{AccountStage, JobKind, RunId};
use crate::error::{ErrorCategory, SyncError};

/// Longest message kept in an [`ErrorRecord`].
const MAX_MESSAGE_LEN: usize = 200;

/// One recorded failure, readable in a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ErrorRecord {
    /// Taxonomy bucket.
    pub category: ErrorCategory,
    /// Short machine code (HTTP status, SQLSTATE, `missing`, …).
    pub code: String,
    /// Human-readable message, truncated.
    pub message: String,
    /// Offending identifier (profile URL, slug, account label).
    pub subject: String,
}

impl ErrorRecord {
    /// Builds a record from its parts, truncating the message.
    #[must_use]
    pub fn new(
        category: ErrorCategory,
        code: impl Into<String>,
        message: impl AsRef<str>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: truncate(message.as_ref(), MAX_MESSAGE_LEN),
            subject: subject.into(),
        }
    }

    /// Builds a record from a [`SyncError`].
    #[must_use]
    pub fn from_error(err: &SyncError, subject: impl Into<String>) -> Self {
        Self::new(err.category(), err.code(), err.to_string(), subject)
    }
}

/// Counters for one account (or, after folding, one run).
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RunStats {
    /// Raw vendor elements fetched.
    pub fetched: u32,
    /// Elements that normalized into a view.
    pub normalized: u32,
    /// Views dropped as in-run duplicates or outside the recency window.
    pub deduplicated: u32,
    /// Identifiers resolved to a canonical form (cache or resolver).
    pub enriched: u32,
    /// Enrichment attempts that degraded to the original identifier.
    pub enrichment_failed: u32,
    /// Rows newly written.
    pub inserted: u32,
    /// Rows already present in storage (refreshed in place).
    pub duplicates: u32,
    /// Rows excluded before the write or reported as already existing.
    pub skipped: u32,
    /// HTTP 429 responses seen, including retried ones.
    pub rate_limited: u32,
    /// Per-item and per-account errors.
    pub errors: Vec<ErrorRecord>,
}

impl RunStats {
    /// Records an error.
    pub fn record(&mut self, error: ErrorRecord) {
        self.errors.push(error);
    }

    /// Number of recorded errors.
    #[must_use]
    pub fn errored(&self) -> usize {
        self.errors.len()
    }

    /// Adds another set of counters into this one.
    pub fn absorb(&mut self, other: &Self) {
        self.fetched += other.fetched;
        self.normalized += other.normalized;
        self.deduplicated += other.deduplicated;
        self.enriched += other.enriched;
        self.enrichment_failed += other.enrichment_failed;
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.skipped += other.skipped;
        self.rate_limited += other.rate_limited;
        self.errors.extend(other.errors.iter().cloned());
    }

    /// Error counts grouped by category.
    #[must_use]
    pub fn errors_by_category(&self) -> BTreeMap<ErrorCategory, usize> {
        let mut counts = BTreeMap::new();
        for error in &self.errors {
            *counts.entry(error.category).or_insert(0) += 1;
        }
        counts
    }
}

/// Outcome for one account or search target.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TargetReport {
    /// Display label of the target.
    pub label: String,
    /// Terminal stage reached.
    pub stage: AccountStage,
    /// Counters for the target.
    pub stats: RunStats,
}

/// Summary of a whole run, always produced even when every target failed.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunSummary {
    /// Run identifier.
    pub run_id: RunId,
    /// Job that ran.
    pub job: JobKind,
    /// Start time.
    pub started_at: DateTime<Utc>,
    /// End time.
    pub finished_at: DateTime<Utc>,
    /// Per-target outcomes in processing order.
    pub targets: Vec<TargetReport>,
    /// Errors raised before any target could be processed.
    pub setup_errors: Vec<ErrorRecord>,
}

impl RunSummary {
    /// Counters folded across all targets, plus setup errors.
    #[must_use]
    pub fn totals(&self) -> RunStats {
        let mut totals = RunStats::default();
        for target in &self.targets {
            totals.absorb(&target.stats);
        }
        totals.errors.extend(self.setup_errors.iter().cloned());
        totals
    }

    /// Number of targets that reached [`AccountStage::Done`].
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.stage == AccountStage::Done)
            .count()
    }

    /// Number of targets that reached [`AccountStage::Failed`].
    #[must_use]
    pub fn failed(&self) -> usize {
        self.targets
            .iter()
            .filter(|t| t.stage == AccountStage::Failed)
            .count()
    }

    /// Total recorded errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.setup_errors.len()
            + self
                .targets
                .iter()
                .map(|t| t.stats.errored())
                .sum::<usize>()
    }
}

fn truncate(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((idx, _)) => message.get(..idx).unwrap_or(message).to_string(),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(stage: AccountStage, stats: RunStats) -> TargetReport {
        TargetReport {
            label: "jane".to_string(),
            stage,
            stats,
        }
    }

    #[test]
    fn messages_are_truncated_on_char_boundaries() {
        let long = "é".repeat(500);
        let record = ErrorRecord::new(ErrorCategory::Http, "500", &long, "x");
        assert_eq!(record.message.chars().count(), MAX_MESSAGE_LEN);
    }

    #[test]
    fn absorb_sums_counters_and_errors() {
        let mut a = RunStats {
            inserted: 2,
            rate_limited: 1,
            ..RunStats::default()
        };
        let mut b = RunStats {
            inserted: 3,
            skipped: 1,
            ..RunStats::default()
        };
        b.record(ErrorRecord::new(ErrorCategory::RateLimited, "429", "slow down", "p1"));
        a.absorb(&b);
        assert_eq!(a.inserted, 5);
        assert_eq!(a.skipped, 1);
        assert_eq!(a.rate_limited, 1);
        assert_eq!(a.errored(), 1);
    }

    #[test]
    fn errors_group_by_category() {
        let mut stats = RunStats::default();
        stats.record(ErrorRecord::new(ErrorCategory::RateLimited, "429", "a", "1"));
        stats.record(ErrorRecord::new(ErrorCategory::RateLimited, "429", "b", "2"));
        stats.record(ErrorRecord::new(ErrorCategory::AuthExpired, "401", "c", "3"));
        let counts = stats.errors_by_category();
        assert_eq!(counts.get(&ErrorCategory::RateLimited), Some(&2));
        assert_eq!(counts.get(&ErrorCategory::AuthExpired), Some(&1));
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut failing = RunStats::default();
        failing.record(ErrorRecord::new(ErrorCategory::AuthExpired, "401", "expired", "bob"));
        let summary = RunSummary {
            run_id: RunId::new(),
            job: JobKind::ProfileViews,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            targets: vec![
                report(AccountStage::Done, RunStats { inserted: 4, ..RunStats::default() }),
                report(AccountStage::Failed, failing),
            ],
            setup_errors: Vec::new(),
        };
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.error_count(), 1);
        assert_eq!(summary.totals().inserted, 4);
    }
}
