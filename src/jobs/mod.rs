//! The scraping jobs, composed from the shared pipeline components.
//!
//! Each job is an [`AccountPipeline`](crate::pipeline::AccountPipeline)
//! over its own kind of target: team accounts for the profile views and
//! connections jobs, saved searches for the strategic jobs. [`run_job`]
//! is the single entry point used by the job service and `RUN_ONCE`.

use std::fmt;
use std::sync::Arc;

use crate::client::{ContactEnricher, LinkedInSource};
use crate::config::{StrategicConnectionSearch, StrategicPeopleConfig, SyncConfig};
use crate::domain::{ErrorRecord, JobKind, RunStats, RunSummary};
use crate::error::{ErrorCategory, SyncError};
use crate::notify::Notifier;
use crate::persistence::SyncStore;
use crate::pipeline::normalize::Rejected;
use crate::pipeline::{Clock, Orchestrator, Pacer, UpsertReport};

pub mod profile_views;
pub mod sales_nav;
pub mod sources;
pub mod strategic_connections;
pub mod strategic_people;
pub mod team_connections;

pub use profile_views::ProfileViews;
pub use strategic_connections::StrategicConnections;
pub use strategic_people::StrategicPeople;
pub use team_connections::TeamConnections;

/// Saved searches scanned by the strategic jobs.
#[derive(Debug, Clone, Default)]
pub struct JobSettings {
    /// Competitor searches for the strategic connections job.
    pub strategic_connection_searches: Vec<StrategicConnectionSearch>,
    /// Account and searches for the strategic people job.
    pub strategic_people: StrategicPeopleConfig,
}

impl JobSettings {
    /// Extracts the job settings from the service configuration.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            strategic_connection_searches: config.strategic_connection_searches.clone(),
            strategic_people: config.strategic_people.clone(),
        }
    }
}

/// Collaborators shared by every job.
#[derive(Clone)]
pub struct JobDeps {
    /// Backing store.
    pub store: Arc<dyn SyncStore>,
    /// Scraping proxy, also used as enrichment resolver.
    pub linkedin: Arc<dyn LinkedInSource>,
    /// Contact enrichment endpoint; the strategic jobs refuse to run without it.
    pub enricher: Option<Arc<dyn ContactEnricher>>,
    /// Rate-limit pauses.
    pub pacer: Arc<dyn Pacer>,
    /// Processing time.
    pub clock: Arc<dyn Clock>,
    /// Saved searches.
    pub settings: JobSettings,
}

impl fmt::Debug for JobDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobDeps")
            .field("store", &self.store)
            .field("linkedin", &self.linkedin)
            .field("enricher", &self.enricher.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl JobDeps {
    /// The enrichment endpoint, or a configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] when `ENRICH_URL`/`ENRICH_TOKEN` are unset.
    pub fn require_enricher(&self) -> Result<&dyn ContactEnricher, SyncError> {
        self.enricher
            .as_deref()
            .ok_or_else(|| SyncError::Config("ENRICH_URL and ENRICH_TOKEN are not set".to_string()))
    }
}

/// Runs `job` over all its targets and notifies.
pub async fn run_job(job: JobKind, deps: &JobDeps, notifier: &Notifier) -> RunSummary {
    let orchestrator = Orchestrator::new(deps.pacer.as_ref(), deps.clock.as_ref(), notifier);
    match job {
        JobKind::ProfileViews => orchestrator.run(&ProfileViews::new(deps)).await,
        JobKind::TeamConnections => orchestrator.run(&TeamConnections::new(deps)).await,
        JobKind::StrategicConnections => orchestrator.run(&StrategicConnections::new(deps)).await,
        JobKind::StrategicPeople => orchestrator.run(&StrategicPeople::new(deps)).await,
    }
}

/// Saturating `usize` to counter conversion.
pub(crate) fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Handles a pagination error: fatal ones stop the target, the others
/// are recorded and the pages gathered so far are kept.
pub(crate) fn page_failure(err: SyncError, target: &str, stats: &mut RunStats) -> Result<(), SyncError> {
    if err.is_account_fatal() {
        return Err(err);
    }
    tracing::warn!(account = %target, error = %err, "pagination aborted, keeping fetched pages");
    stats.record(ErrorRecord::from_error(&err, target));
    Ok(())
}

/// Records reportable element rejections of one page.
///
/// The subject is the element's display name, or `index-{n}` with `n`
/// the element's position in the whole run.
pub(crate) fn record_rejections(
    rejected: &[(usize, Rejected)],
    first_index: usize,
    message: &str,
    stats: &mut RunStats,
) {
    for (idx, rejection) in rejected {
        if let Rejected::MissingIdentifier(name) = rejection {
            let subject = if name.is_empty() {
                format!("index-{}", first_index + idx)
            } else {
                name.clone()
            };
            tracing::warn!(subject = %subject, "{message}");
            stats.record(ErrorRecord::new(
                ErrorCategory::MissingIdentifier,
                "missing",
                message,
                subject,
            ));
        }
    }
}

/// Folds an upsert report into the target's counters.
pub(crate) fn absorb_upsert(stats: &mut RunStats, report: UpsertReport) {
    stats.inserted += report.inserted;
    stats.skipped += report.skipped;
    stats.errors.extend(report.errors);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_rejections_use_run_index() {
        let mut stats = RunStats::default();
        record_rejections(
            &[
                (0, Rejected::MissingIdentifier(String::new())),
                (1, Rejected::Anonymous),
                (2, Rejected::MissingIdentifier("Jane Doe".to_string())),
            ],
            10,
            "no public profile URL",
            &mut stats,
        );
        let subjects: Vec<_> = stats.errors.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["index-10", "Jane Doe"]);
        assert!(stats.errors.iter().all(|e| e.code == "missing"));
    }

    #[test]
    fn non_fatal_page_errors_are_recorded() {
        let mut stats = RunStats::default();
        let limited = SyncError::RateLimited {
            operation: "page 2".to_string(),
            attempts: 3,
        };
        assert!(page_failure(limited, "jane", &mut stats).is_ok());
        assert_eq!(stats.errored(), 1);

        let expired = SyncError::AuthExpired {
            operation: "page 0".to_string(),
            status: 401,
        };
        assert!(page_failure(expired, "jane", &mut stats).is_err());
        assert_eq!(stats.errored(), 1);
    }
}
