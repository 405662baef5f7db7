//! Sequential per-target execution with partial-failure semantics.
//!
//! Targets (team accounts, saved searches) run one after another with a
//! fixed pause between them. A failing target is recorded and the run
//! moves on; the run itself always ends with a [`RunSummary`] and a
//! best-effort notification.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::pacing::{Clock, Pacer};
use crate::domain::{
    ErrorRecord, JobKind, RunId, RunStats, RunSummary, StageTracker, TargetReport,
};
use crate::error::SyncError;
use crate::notify::Notifier;

/// One scraping pipeline, as seen by the [`Orchestrator`].
#[async_trait]
pub trait AccountPipeline: Send + Sync + fmt::Debug {
    /// What one iteration processes.
    type Target: Send + Sync;

    /// Job this pipeline implements.
    fn job(&self) -> JobKind;

    /// Loads the targets for this run.
    ///
    /// # Errors
    ///
    /// Any error here is recorded as a setup error and ends the run.
    async fn targets(&self) -> Result<Vec<Self::Target>, SyncError>;

    /// Display label of a target.
    fn label(&self, target: &Self::Target) -> String;

    /// Processes one target, advancing `stage` and filling `stats`.
    ///
    /// Per-item problems go into `stats.errors`; only errors that stop
    /// the target are returned.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the target.
    async fn run_target(
        &self,
        target: &Self::Target,
        stage: &mut StageTracker,
        stats: &mut RunStats,
    ) -> Result<(), SyncError>;

    /// Pause between two targets.
    fn between_targets(&self) -> Duration;
}

/// Runs pipelines and reports on them.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrator<'a> {
    pacer: &'a dyn Pacer,
    clock: &'a dyn Clock,
    notifier: &'a Notifier,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator.
    #[must_use]
    pub const fn new(pacer: &'a dyn Pacer, clock: &'a dyn Clock, notifier: &'a Notifier) -> Self {
        Self {
            pacer,
            clock,
            notifier,
        }
    }

    /// Runs every target of `pipeline` and notifies.
    pub async fn run<P: AccountPipeline>(&self, pipeline: &P) -> RunSummary {
        let run_id = RunId::new();
        let job = pipeline.job();
        let started_at = self.clock.now();
        tracing::info!(run_id = %run_id, job = %job, "run started");

        let mut targets = Vec::new();
        let mut setup_errors = Vec::new();

        match pipeline.targets().await {
            Ok(list) => {
                tracing::info!(run_id = %run_id, job = %job, targets = list.len(), "targets loaded");
                let total = list.len();
                for (idx, target) in list.iter().enumerate() {
                    if idx > 0 {
                        self.pacer.pause(pipeline.between_targets(), "account").await;
                    }
                    let label = pipeline.label(target);
                    tracing::info!(run_id = %run_id, account = %label, "target {}/{}", idx + 1, total);
                    targets.push(run_one(pipeline, target, label).await);
                }
            }
            Err(err) => {
                tracing::error!(run_id = %run_id, job = %job, error = %err, "could not load targets");
                setup_errors.push(ErrorRecord::from_error(&err, "setup"));
            }
        }

        let summary = RunSummary {
            run_id,
            job,
            started_at,
            finished_at: self.clock.now(),
            targets,
            setup_errors,
        };
        let totals = summary.totals();
        tracing::info!(
            run_id = %run_id,
            job = %job,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            inserted = totals.inserted,
            duplicates = totals.duplicates,
            enriched = totals.enriched,
            errors = summary.error_count(),
            "run finished"
        );

        self.notifier.notify(&summary).await;
        summary
    }
}

async fn run_one<P: AccountPipeline>(pipeline: &P, target: &P::Target, label: String) -> TargetReport {
    let mut stage = StageTracker::new(label.clone());
    let mut stats = RunStats::default();

    match pipeline.run_target(target, &mut stage, &mut stats).await {
        Ok(()) => stage.finish(),
        Err(err) => {
            stats.record(ErrorRecord::from_error(&err, label.clone()));
            if err.is_account_fatal() {
                tracing::error!(account = %label, error = %err, "target failed");
                stage.fail();
            } else {
                tracing::warn!(account = %label, error = %err, "target stopped early");
                stage.finish();
            }
        }
    }
    tracing::info!(
        account = %label,
        stage = %stage.stage(),
        inserted = stats.inserted,
        duplicates = stats.duplicates,
        errors = stats.errored(),
        "target done"
    );

    TargetReport {
        label,
        stage: stage.stage(),
        stats,
    }
}
