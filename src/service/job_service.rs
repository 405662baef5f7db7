//! Job service: runs jobs on demand and remembers their last summary.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::SlackConfig;
use crate::domain::{JobKind, RunSummary};
use crate::error::SyncError;
use crate::jobs::{JobDeps, run_job};
use crate::notify::Notifier;

/// Point-in-time view of one job.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    /// The job.
    pub job: JobKind,
    /// Whether a run is in progress.
    pub running: bool,
    /// Summary of the last completed run.
    pub last_run: Option<RunSummary>,
}

/// Coordinates job runs for the trigger API and `RUN_ONCE`.
///
/// A job runs at most once at a time; a second request while it runs is
/// refused with [`SyncError::JobAlreadyRunning`]. Different jobs may run
/// concurrently. Each run is bounded by the wall-clock budget.
#[derive(Debug)]
pub struct JobService {
    deps: JobDeps,
    slack: SlackConfig,
    budget: Duration,
    running: Mutex<HashSet<JobKind>>,
    latest: RwLock<HashMap<JobKind, RunSummary>>,
}

/// Releases the job's running slot when dropped, including on timeout.
struct RunSlot<'a> {
    running: &'a Mutex<HashSet<JobKind>>,
    job: JobKind,
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            running.remove(&self.job);
        }
    }
}

impl JobService {
    /// Creates a service running jobs against `deps`.
    #[must_use]
    pub fn new(deps: JobDeps, slack: SlackConfig, budget: Duration) -> Self {
        Self {
            deps,
            slack,
            budget,
            running: Mutex::new(HashSet::new()),
            latest: RwLock::new(HashMap::new()),
        }
    }

    fn claim(&self, job: JobKind) -> Result<RunSlot<'_>, SyncError> {
        let mut running = self
            .running
            .lock()
            .map_err(|_| SyncError::Internal("job registry lock poisoned".to_string()))?;
        if !running.insert(job) {
            return Err(SyncError::JobAlreadyRunning(job.to_string()));
        }
        Ok(RunSlot {
            running: &self.running,
            job,
        })
    }

    /// Runs `job` to completion and returns its summary.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JobAlreadyRunning`] if `job` is in progress and
    /// [`SyncError::JobTimedOut`] if the run exceeds its budget. Failures
    /// inside the run are reported in the summary, not here.
    pub async fn run(&self, job: JobKind) -> Result<RunSummary, SyncError> {
        let _slot = self.claim(job)?;
        let notifier = Notifier::for_job(job, &self.slack);

        let summary = tokio::time::timeout(self.budget, run_job(job, &self.deps, &notifier))
            .await
            .map_err(|_| {
                tracing::error!(job = %job, budget = ?self.budget, "run exceeded its budget");
                SyncError::JobTimedOut {
                    job: job.to_string(),
                    secs: self.budget.as_secs(),
                }
            })?;

        self.latest.write().await.insert(job, summary.clone());
        Ok(summary)
    }

    /// Summary of the last completed run of `job`.
    pub async fn latest(&self, job: JobKind) -> Option<RunSummary> {
        self.latest.read().await.get(&job).cloned()
    }

    /// Every job with its state, in declaration order.
    pub async fn list(&self) -> Vec<JobSnapshot> {
        let running = self.running.lock().map(|r| r.clone()).unwrap_or_default();
        let latest = self.latest.read().await;
        JobKind::ALL
            .iter()
            .map(|&job| JobSnapshot {
                job,
                running: running.contains(&job),
                last_run: latest.get(&job).cloned(),
            })
            .collect()
    }
}
