//! New 1st-degree connections of each team member.
//!
//! Relations come most recent first, so the scan stops at the first page
//! whose relations are all already stored for the owner. Every fetched
//! relation is still upserted, which refreshes headlines of known ones.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::sources::RelationFeed;
use super::{JobDeps, absorb_upsert, count, page_failure, record_rejections};
use crate::config::PacingConfig;
use crate::domain::{AccountStage, ExternalAccount, JobKind, NormalizedView, RunStats, StageTracker};
use crate::error::SyncError;
use crate::persistence::KeyLookup;
use crate::persistence::models::{ConnectionRow, SCRAPPED_CONNECTION};
use crate::pipeline::dedup::{dedupe_most_recent, partition_known};
use crate::pipeline::normalize::{normalize_page, relation};
use crate::pipeline::{AccountPipeline, Paginator, RetryPolicy, StopReason, UpsertSink};

/// Relations requested per page.
pub const PAGE_SIZE: u32 = 10;

/// Page ceiling per account.
pub const MAX_PAGES: u32 = 10;

const REACTION_TYPE: &str = "connection";

/// The team connections job.
#[derive(Debug)]
pub struct TeamConnections<'a> {
    deps: &'a JobDeps,
    pacing: PacingConfig,
}

impl<'a> TeamConnections<'a> {
    /// Creates the job with its default pacing.
    #[must_use]
    pub const fn new(deps: &'a JobDeps) -> Self {
        Self {
            deps,
            pacing: PacingConfig::team_connections(),
        }
    }
}

fn connection_row(view: &NormalizedView, owner_url: &str, today: NaiveDate) -> ConnectionRow {
    ConnectionRow {
        type_reaction: REACTION_TYPE.to_string(),
        profil_linkedin_url_connection: view.subject_id.clone(),
        profil_fullname: view.subject_name.clone(),
        linkedin_url_owner_post: owner_url.to_string(),
        headline: view.subject_headline.clone(),
        created_at: today,
        connected_at: view.calculated_date,
        contact_urn: view.member_urn.clone(),
    }
}

#[async_trait]
impl AccountPipeline for TeamConnections<'_> {
    type Target = ExternalAccount;

    fn job(&self) -> JobKind {
        JobKind::TeamConnections
    }

    async fn targets(&self) -> Result<Vec<ExternalAccount>, SyncError> {
        Ok(self
            .deps
            .store
            .team_accounts()
            .await?
            .into_iter()
            .filter(ExternalAccount::has_linkedin_owner)
            .collect())
    }

    fn label(&self, target: &ExternalAccount) -> String {
        target.label().to_string()
    }

    async fn run_target(
        &self,
        account: &ExternalAccount,
        stage: &mut StageTracker,
        stats: &mut RunStats,
    ) -> Result<(), SyncError> {
        let label = account.label();
        let now = self.deps.clock.now();
        let today = now.date_naive();
        let source = RelationFeed::new(self.deps.linkedin.as_ref(), &account.account_id, PAGE_SIZE);
        let mut pages = Paginator::new(
            &source,
            self.deps.pacer.as_ref(),
            RetryPolicy::from_pacing(&self.pacing),
            self.pacing.between_pages,
            MAX_PAGES,
        );
        let sink = UpsertSink::new(
            self.deps.store.as_ref(),
            self.deps.pacer.as_ref(),
            self.pacing.row_pause,
            self.pacing.row_pause_every,
        );

        stage.advance(AccountStage::Fetching);
        while let Some(page) = pages.next_page().await {
            stats.rate_limited = pages.rate_limit_hits();
            let page = match page {
                Ok(page) => page,
                Err(err) => {
                    page_failure(err, label, stats)?;
                    break;
                }
            };
            stats.fetched += count(page.items.len());

            stage.advance(AccountStage::Normalizing);
            let first_index = page.index as usize * PAGE_SIZE as usize;
            let normalized = normalize_page(&page, relation, now);
            record_rejections(&normalized.rejected, first_index, "relation has no public profile URL", stats);
            stats.normalized += count(normalized.views.len());

            stage.advance(AccountStage::Deduplicating);
            let before = normalized.views.len();
            let views = dedupe_most_recent(normalized.views);
            stats.deduplicated += count(before - views.len());
            let keys: Vec<String> = views.iter().map(|v| v.subject_id.clone()).collect();
            let known = self
                .deps
                .store
                .existing_keys(KeyLookup {
                    table: &SCRAPPED_CONNECTION,
                    scope_column: "linkedin_url_owner_post",
                    scope: &account.owner_url,
                    key_column: "profil_linkedin_url_connection",
                    keys: &keys,
                })
                .await?;
            let (fresh, stored) = partition_known(views, &known);
            stats.duplicates += count(stored.len());
            tracing::info!(
                account = %label,
                page = page.index,
                new = fresh.len(),
                known = stored.len(),
                "relations page"
            );

            stage.advance(AccountStage::Enriching);
            stage.advance(AccountStage::Persisting);
            let rows: Vec<ConnectionRow> = fresh
                .iter()
                .chain(&stored)
                .map(|view| connection_row(view, &account.owner_url, today))
                .collect();
            let report = sink.upsert(&rows).await?;
            if report.fell_back {
                // per-row outcomes already tell new rows from refreshed ones
                let refreshed = count(stored.len());
                stats.inserted += report.inserted;
                stats.skipped += report.skipped.saturating_sub(refreshed);
                stats.errors.extend(report.errors);
            } else {
                let mut report = report;
                report.inserted = count(fresh.len());
                absorb_upsert(stats, report);
            }

            if fresh.is_empty() {
                pages.stop(StopReason::AllKnown);
            }
            stage.advance(AccountStage::Fetching);
        }
        stats.rate_limited = pages.rate_limit_hits();
        Ok(())
    }

    fn between_targets(&self) -> Duration {
        self.pacing.between_accounts
    }
}
