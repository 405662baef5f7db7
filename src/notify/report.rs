//! Plain-text alert and recap bodies.
//!
//! Alerts list per-target counters, then errors grouped by category and
//! code with one sample message each. Stack traces never appear.

use std::fmt::Write as _;

use crate::domain::{AccountStage, ErrorRecord, JobKind, RunSummary};

/// Longest sample message quoted in an alert.
const MAX_SAMPLE_LEN: usize = 100;

/// Label used for errors raised before any target ran.
const SETUP_LABEL: &str = "setup";

/// Error alert for a run with at least one recorded error.
#[must_use]
pub fn error_alert(summary: &RunSummary) -> String {
    let mut text = format!(
        "[{}] ⚠️ Erreurs — {}\n\n📊 Résultats\n",
        summary.job.label(),
        timestamp(summary)
    );
    for target in &summary.targets {
        let stats = &target.stats;
        let _ = write!(
            text,
            "• {}: {} insérés | {} doublons | {} ignorés",
            target.label, stats.inserted, stats.duplicates, stats.skipped
        );
        if stats.rate_limited > 0 {
            let _ = write!(text, " | {} rate limits", stats.rate_limited);
        }
        if target.stage == AccountStage::Failed {
            text.push_str(" (échec)");
        }
        text.push('\n');
    }

    let _ = write!(text, "\n❌ Erreurs ({})\n", summary.error_count());
    if !summary.setup_errors.is_empty() {
        let _ = writeln!(text, "• {SETUP_LABEL}: {}", grouped(&summary.setup_errors));
    }
    for target in &summary.targets {
        if !target.stats.errors.is_empty() {
            let _ = writeln!(text, "• {}: {}", target.label, grouped(&target.stats.errors));
        }
    }
    text.trim_end().to_string()
}

/// Success recap: targets processed, rows inserted, identifiers enriched.
#[must_use]
pub fn success_recap(summary: &RunSummary) -> String {
    let totals = summary.totals();
    let (targets, rows) = match summary.job {
        JobKind::ProfileViews => ("profils traités", "visites insérées"),
        JobKind::TeamConnections => ("profils traités", "connexions insérées"),
        JobKind::StrategicConnections | JobKind::StrategicPeople => {
            ("recherches traitées", "profils insérés")
        }
    };
    format!(
        "[{}] ✅ — {}\n• {} {targets}, {} {rows}, {} enrichies",
        summary.job.label(),
        timestamp(summary),
        summary.succeeded(),
        totals.inserted,
        totals.enriched,
    )
}

fn timestamp(summary: &RunSummary) -> String {
    summary.finished_at.format("%Y-%m-%d %H:%M").to_string()
}

/// `2x rate_limited (429) — "sample", 1x http (500) — "sample"`.
fn grouped(errors: &[ErrorRecord]) -> String {
    let mut groups: Vec<(&ErrorRecord, usize)> = Vec::new();
    for error in errors {
        match groups
            .iter_mut()
            .find(|(first, _)| first.category == error.category && first.code == error.code)
        {
            Some((_, count)) => *count += 1,
            None => groups.push((error, 1)),
        }
    }
    groups
        .iter()
        .map(|(first, count)| {
            format!(
                "{count}x {} ({}) — \"{}\"",
                first.category,
                first.code,
                sample(&first.message)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn sample(message: &str) -> &str {
    match message.char_indices().nth(MAX_SAMPLE_LEN) {
        Some((idx, _)) => message.get(..idx).unwrap_or(message),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{RunId, RunStats, TargetReport};
    use crate::error::ErrorCategory;

    fn summary(job: JobKind, targets: Vec<TargetReport>) -> RunSummary {
        let at = Utc
            .with_ymd_and_hms(2026, 3, 10, 14, 5, 0)
            .single()
            .unwrap_or_default();
        RunSummary {
            run_id: RunId::new(),
            job,
            started_at: at,
            finished_at: at,
            targets,
            setup_errors: Vec::new(),
        }
    }

    fn target(label: &str, stage: AccountStage, stats: RunStats) -> TargetReport {
        TargetReport {
            label: label.to_string(),
            stage,
            stats,
        }
    }

    #[test]
    fn alert_groups_errors_by_category_and_code() {
        let mut failing = RunStats {
            inserted: 2,
            duplicates: 1,
            ..RunStats::default()
        };
        failing.record(ErrorRecord::new(ErrorCategory::RateLimited, "429", "rate limited on page 2", "p1"));
        failing.record(ErrorRecord::new(ErrorCategory::RateLimited, "429", "again", "p2"));
        failing.record(ErrorRecord::new(ErrorCategory::MissingIdentifier, "missing", "no url", "Jane"));
        let report = summary(
            JobKind::TeamConnections,
            vec![
                target("jane", AccountStage::Done, failing),
                target("bob", AccountStage::Done, RunStats::default()),
            ],
        );
        let text = error_alert(&report);
        assert!(text.starts_with("[Team Connections] ⚠️ Erreurs — 2026-03-10 14:05"));
        assert!(text.contains("• jane: 2 insérés | 1 doublons | 0 ignorés\n"));
        assert!(text.contains("❌ Erreurs (3)"));
        assert!(text.contains(
            "• jane: 2x rate_limited (429) — \"rate limited on page 2\", 1x missing_identifier (missing) — \"no url\""
        ));
        assert!(!text.contains("• bob: 0x"));
    }

    #[test]
    fn failed_targets_are_flagged() {
        let mut stats = RunStats::default();
        stats.record(ErrorRecord::new(ErrorCategory::AuthExpired, "401", "expired", "bob"));
        let text = error_alert(&summary(
            JobKind::ProfileViews,
            vec![target("bob", AccountStage::Failed, stats)],
        ));
        assert!(text.contains("• bob: 0 insérés | 0 doublons | 0 ignorés (échec)"));
    }

    #[test]
    fn sample_messages_are_capped() {
        let mut stats = RunStats::default();
        stats.record(ErrorRecord::new(ErrorCategory::Http, "500", "x".repeat(150), "p"));
        let text = error_alert(&summary(
            JobKind::ProfileViews,
            vec![target("jane", AccountStage::Done, stats)],
        ));
        assert!(text.contains(&format!("\"{}\"", "x".repeat(MAX_SAMPLE_LEN))));
        assert!(!text.contains(&"x".repeat(MAX_SAMPLE_LEN + 1)));
    }

    #[test]
    fn recap_reports_visits_and_enrichment() {
        let stats = RunStats {
            inserted: 7,
            enriched: 2,
            ..RunStats::default()
        };
        let text = success_recap(&summary(
            JobKind::ProfileViews,
            vec![
                target("jane", AccountStage::Done, stats),
                target("bob", AccountStage::Failed, RunStats::default()),
            ],
        ));
        assert_eq!(
            text,
            "[Profile Views] ✅ — 2026-03-10 14:05\n• 1 profils traités, 7 visites insérées, 2 enrichies"
        );
    }
}
