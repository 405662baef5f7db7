//! Job listing and run payloads.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{JobKind, RunStats, RunSummary};
use crate::service::JobSnapshot;

/// One entry of `GET /api/v1/jobs`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobStatusDto {
    /// Job name used in URLs.
    pub job: JobKind,
    /// Label used in notifications.
    pub label: String,
    /// Whether a run is in progress.
    pub running: bool,
    /// Summary of the last completed run.
    pub last_run: Option<RunSummaryDto>,
}

impl From<JobSnapshot> for JobStatusDto {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            job: snapshot.job,
            label: snapshot.job.label().to_string(),
            running: snapshot.running,
            last_run: snapshot.last_run.map(RunSummaryDto::from),
        }
    }
}

/// Response of `GET /api/v1/jobs`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JobListResponse {
    /// Every registered job.
    pub data: Vec<JobStatusDto>,
}

/// A run summary with its folded totals.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunSummaryDto {
    /// The full summary.
    #[serde(flatten)]
    pub summary: RunSummary,
    /// Counters folded over every target.
    pub totals: RunStats,
    /// Targets that reached `Done`.
    pub succeeded: usize,
    /// Targets that ended `Failed`.
    pub failed: usize,
    /// Errors across targets and setup.
    pub error_count: usize,
}

impl From<RunSummary> for RunSummaryDto {
    fn from(summary: RunSummary) -> Self {
        Self {
            totals: summary.totals(),
            succeeded: summary.succeeded(),
            failed: summary.failed(),
            error_count: summary.error_count(),
            summary,
        }
    }
}
