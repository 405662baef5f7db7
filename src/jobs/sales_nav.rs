//! Saved-search scanning shared by the strategic jobs.
//!
//! A scan pages through one Sales Navigator saved search restricted to
//! profiles active in the last 72 hours, keeps one result per public
//! identifier and enriches each profile through the contact enrichment
//! endpoint, pausing after every call.

use serde_json::Value;

use super::sources::{SearchFeed, recently_viewed};
use super::{JobDeps, count, page_failure, record_rejections};
use crate::config::PacingConfig;
use crate::domain::{AccountStage, ErrorRecord, NormalizedView, RunStats, StageTracker};
use crate::error::{ErrorCategory, SyncError};
use crate::pipeline::dedup::dedupe_most_recent;
use crate::pipeline::normalize::{normalize_page, search_result, str_at};
use crate::pipeline::{Paginator, RetryPolicy};

/// Page ceiling per search.
pub const MAX_PAGES: u32 = 10;

/// One enriched search result.
#[derive(Debug, Clone)]
pub struct EnrichedProfile {
    /// Public identifier used for enrichment.
    pub identifier: String,
    /// The search result.
    pub view: NormalizedView,
    /// `data` object returned by the enrichment endpoint.
    pub data: Value,
}

impl EnrichedProfile {
    /// String field of the enrichment data.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<String> {
        str_at(&self.data, &format!("/{name}"))
    }

    /// Display label: enriched full name, search result name, or the
    /// identifier.
    #[must_use]
    pub fn display(&self) -> String {
        self.field("full_name")
            .or_else(|| self.view.subject_name.clone())
            .unwrap_or_else(|| self.identifier.clone())
    }
}

/// Scanner bound to one set of collaborators.
#[derive(Debug)]
pub struct SalesNavScan<'a> {
    deps: &'a JobDeps,
    pacing: PacingConfig,
}

impl<'a> SalesNavScan<'a> {
    /// Creates a scanner.
    #[must_use]
    pub const fn new(deps: &'a JobDeps, pacing: PacingConfig) -> Self {
        Self { deps, pacing }
    }

    /// Scans `saved_search_url` with the `account_id` session and enriches
    /// every profile found.
    ///
    /// Stops at [`AccountStage::Enriching`]; persisting is left to the caller.
    ///
    /// # Errors
    ///
    /// Returns account-fatal errors (expired session, missing enrichment
    /// endpoint). Everything else is recorded in `stats`.
    pub async fn scan(
        &self,
        account_id: &str,
        saved_search_url: &str,
        label: &str,
        stage: &mut StageTracker,
        stats: &mut RunStats,
    ) -> Result<Vec<EnrichedProfile>, SyncError> {
        let enricher = self.deps.require_enricher()?;

        stage.advance(AccountStage::Fetching);
        let views = self.collect(account_id, saved_search_url, label, stats).await?;

        stage.advance(AccountStage::Normalizing);
        stats.normalized = count(views.len());

        stage.advance(AccountStage::Deduplicating);
        let unique = dedupe_most_recent(views);
        stats.deduplicated = stats.normalized - count(unique.len());
        tracing::info!(search = %label, profiles = unique.len(), "new profiles found");

        stage.advance(AccountStage::Enriching);
        let retry = RetryPolicy::from_pacing(&self.pacing);
        let mut hits = 0;
        let mut enriched = Vec::with_capacity(unique.len());
        for view in unique {
            let identifier = view.subject_id.clone();
            let call = format!("enrich {identifier}");
            let looked_up = retry
                .run(self.deps.pacer.as_ref(), &call, &mut hits, || enricher.enrich(&identifier))
                .await;
            self.deps.pacer.pause(self.pacing.per_item, "enrichment").await;

            match looked_up {
                Ok(Some(data)) => {
                    stats.enriched += 1;
                    enriched.push(EnrichedProfile {
                        identifier,
                        view,
                        data,
                    });
                }
                Ok(None) => {
                    tracing::warn!(profile = %identifier, "no enrichment data");
                    stats.enrichment_failed += 1;
                    stats.record(ErrorRecord::new(
                        ErrorCategory::EnrichmentFailed,
                        "empty",
                        "no data returned from enrichment",
                        identifier,
                    ));
                }
                Err(err) => {
                    tracing::warn!(profile = %identifier, error = %err, "enrichment failed");
                    stats.enrichment_failed += 1;
                    stats.record(ErrorRecord::new(
                        ErrorCategory::EnrichmentFailed,
                        err.code(),
                        err.to_string(),
                        identifier,
                    ));
                }
            }
        }
        stats.rate_limited += hits;
        Ok(enriched)
    }

    async fn collect(
        &self,
        account_id: &str,
        saved_search_url: &str,
        label: &str,
        stats: &mut RunStats,
    ) -> Result<Vec<NormalizedView>, SyncError> {
        let now = self.deps.clock.now();
        let source = SearchFeed::new(
            self.deps.linkedin.as_ref(),
            account_id,
            recently_viewed(saved_search_url, now),
        );
        let mut pages = Paginator::new(
            &source,
            self.deps.pacer.as_ref(),
            RetryPolicy::from_pacing(&self.pacing),
            self.pacing.between_pages,
            MAX_PAGES,
        );

        let mut views = Vec::new();
        let mut seen = 0;
        let mut failure = None;
        while let Some(page) = pages.next_page().await {
            match page {
                Ok(page) => {
                    stats.fetched += count(page.items.len());
                    let normalized = normalize_page(&page, search_result, now);
                    record_rejections(
                        &normalized.rejected,
                        seen,
                        "no public identifier or profile slug",
                        stats,
                    );
                    seen += page.items.len();
                    tracing::info!(search = %label, page = page.index, profiles = page.items.len(), "search page");
                    views.extend(normalized.views);
                }
                Err(err) => failure = Some(err),
            }
        }
        stats.rate_limited += pages.rate_limit_hits();
        tracing::debug!(
            search = %label,
            pages = pages.pages_fetched(),
            reason = ?pages.stop_reason(),
            "search pagination done"
        );
        if let Some(err) = failure {
            page_failure(err, label, stats)?;
        }
        Ok(views)
    }
}
