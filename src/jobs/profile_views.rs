//! Who viewed each team member's profile in the last 24 hours.
//!
//! Pages through the viewer feed until a page holds no recent viewer,
//! keeps the most recent view per viewer inside the window, resolves
//! opaque `/in/ACo…` viewer URLs through the enrichment cache and upserts
//! one `scrapped_visit` row per viewer, owner and day.

use async_trait::async_trait;

use super::sources::ViewerFeed;
use super::{JobDeps, absorb_upsert, count, page_failure, record_rejections};
use crate::config::PacingConfig;
use crate::domain::account::profile_url;
use crate::domain::{AccountStage, ExternalAccount, JobKind, NormalizedView, RunStats, StageTracker};
use crate::error::SyncError;
use crate::persistence::models::VisitRow;
use crate::pipeline::dedup::{PROFILE_VIEW_WINDOW_HOURS, dedupe_most_recent, has_recent, retain_within};
use crate::pipeline::normalize::{normalize_page, profile_viewer};
use crate::pipeline::{
    AccountPipeline, EnrichmentCache, Paginator, Resolution, RetryPolicy, StopReason, UpsertSink,
};

/// Viewers requested per page.
pub const PAGE_SIZE: u32 = 10;

/// Page ceiling per account.
pub const MAX_PAGES: u32 = 10;

/// `type_reaction` of every visit row.
const REACTION_TYPE: &str = "visit_profil";

/// The profile views job.
#[derive(Debug)]
pub struct ProfileViews<'a> {
    deps: &'a JobDeps,
    pacing: PacingConfig,
}

impl<'a> ProfileViews<'a> {
    /// Creates the job with its default pacing.
    #[must_use]
    pub const fn new(deps: &'a JobDeps) -> Self {
        Self {
            deps,
            pacing: PacingConfig::profile_views(),
        }
    }

    /// Pages through the viewer feed, stopping on the first page without
    /// a recent viewer.
    async fn collect(
        &self,
        account: &ExternalAccount,
        label: &str,
        stats: &mut RunStats,
    ) -> Result<Vec<NormalizedView>, SyncError> {
        let now = self.deps.clock.now();
        let source = ViewerFeed::new(self.deps.linkedin.as_ref(), &account.account_id, PAGE_SIZE);
        let mut pages = Paginator::new(
            &source,
            self.deps.pacer.as_ref(),
            RetryPolicy::from_pacing(&self.pacing),
            self.pacing.between_pages,
            MAX_PAGES,
        );

        let mut views = Vec::new();
        let mut failure = None;
        while let Some(page) = pages.next_page().await {
            match page {
                Ok(page) => {
                    stats.fetched += count(page.items.len());
                    let first_index = page.index as usize * PAGE_SIZE as usize;
                    let normalized = normalize_page(&page, profile_viewer, now);
                    record_rejections(&normalized.rejected, first_index, "viewer has no profile id", stats);
                    let recent = has_recent(&normalized.views, PROFILE_VIEW_WINDOW_HOURS);
                    tracing::info!(
                        account = %label,
                        page = page.index,
                        viewers = normalized.views.len(),
                        recent,
                        "viewer page"
                    );
                    views.extend(normalized.views);
                    if !recent {
                        pages.stop(StopReason::NoRelevantItems);
                    }
                }
                Err(err) => failure = Some(err),
            }
        }
        stats.rate_limited += pages.rate_limit_hits();
        tracing::debug!(
            account = %label,
            pages = pages.pages_fetched(),
            reason = ?pages.stop_reason(),
            "viewer pagination done"
        );
        if let Some(err) = failure {
            page_failure(err, label, stats)?;
        }
        Ok(views)
    }

    /// Replaces opaque viewer URLs with canonical ones where possible.
    async fn enrich(&self, account: &ExternalAccount, views: &mut [NormalizedView], stats: &mut RunStats) {
        let cache = EnrichmentCache::new(
            self.deps.store.as_ref(),
            self.deps.linkedin.as_ref(),
            self.deps.pacer.as_ref(),
            self.pacing.per_item,
            RetryPolicy::from_pacing(&self.pacing),
        );
        let mut hits = 0;
        for view in views.iter_mut() {
            let Some(url) = view.subject_url.clone() else {
                continue;
            };
            match cache.resolve(&url, &account.account_id, &mut hits).await {
                Resolution::NotEligible => {}
                Resolution::Cached(canonical) | Resolution::Resolved(canonical) => {
                    view.resolved_url = Some(canonical);
                    stats.enriched += 1;
                }
                Resolution::Unresolved { error } => {
                    stats.enrichment_failed += 1;
                    if let Some(error) = error {
                        stats.record(error);
                    }
                }
            }
        }
        stats.rate_limited += hits;
    }
}

/// Visit row for `view`, owned by `owner_url`.
fn visit_row(view: &NormalizedView, owner_url: &str) -> VisitRow {
    VisitRow {
        type_reaction: REACTION_TYPE.to_string(),
        profil_linkedin_url_reaction: view
            .storage_url()
            .map_or_else(|| profile_url(&view.subject_id), str::to_string),
        profil_fullname: view.subject_name.clone().unwrap_or_default(),
        headline: view.subject_headline.clone().unwrap_or_default(),
        linkedin_url_profil_visited: owner_url.to_string(),
        date_scrapped: view.relative_text.clone().unwrap_or_default(),
        date_scrapped_calculated: view.calculated_date,
    }
}

#[async_trait]
impl AccountPipeline for ProfileViews<'_> {
    type Target = ExternalAccount;

    fn job(&self) -> JobKind {
        JobKind::ProfileViews
    }

    async fn targets(&self) -> Result<Vec<ExternalAccount>, SyncError> {
        let accounts = self.deps.store.team_accounts().await?;
        let total = accounts.len();
        let accounts: Vec<_> = accounts
            .into_iter()
            .filter(ExternalAccount::has_linkedin_owner)
            .collect();
        if accounts.len() < total {
            tracing::info!(ignored = total - accounts.len(), "accounts without a LinkedIn owner URL");
        }
        Ok(accounts)
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

        stage.advance(AccountStage::Fetching);
        let views = self.collect(account, label, stats).await?;

        stage.advance(AccountStage::Normalizing);
        stats.normalized = count(views.len());

        stage.advance(AccountStage::Deduplicating);
        let unique = dedupe_most_recent(views);
        let (mut recent, too_old) = retain_within(unique, PROFILE_VIEW_WINDOW_HOURS);
        stats.deduplicated = stats.normalized - count(recent.len());
        tracing::info!(account = %label, viewers = recent.len(), too_old, "viewers in window");

        stage.advance(AccountStage::Enriching);
        self.enrich(account, &mut recent, stats).await;

        stage.advance(AccountStage::Persisting);
        let rows: Vec<VisitRow> = recent
            .iter()
            .map(|view| visit_row(view, &account.owner_url))
            .collect();
        let sink = UpsertSink::new(
            self.deps.store.as_ref(),
            self.deps.pacer.as_ref(),
            self.pacing.row_pause,
            self.pacing.row_pause_every,
        );
        let report = sink.upsert(&rows).await?;
        absorb_upsert(stats, report);
        Ok(())
    }

    fn between_targets(&self) -> std::time::Duration {
        self.pacing.between_accounts
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::client::mock::{MockEnricher, MockLinkedIn, Reply};
    use crate::error::ErrorCategory;
    use crate::jobs::JobSettings;
    use crate::jobs::fixtures::{Harness, account};
    use crate::persistence::memory::MemoryStore;
    use crate::persistence::models::SCRAPPED_VISIT;

    fn legacy(id: Option<&str>, age: &str) -> Value {
        json!({
            "profile": {
                "id": id,
                "full_name": "Jane Doe",
                "url": id.map(|id| format!("https://www.linkedin.com/in/{id}")),
                "headline": "CTO"
            },
            "last_viewed_time": age
        })
    }

    fn lockup(slug: &str, caption: &str) -> Value {
        json!({
            "content": { "analyticsEntityLockup": { "entityLockup": {
                "navigationUrl": format!("https://www.linkedin.com/in/{slug}?miniProfileUrn=x"),
                "title": { "text": "Jane Doe" },
                "subtitle": { "text": "CTO at Acme" },
                "caption": { "text": caption }
            }}}
        })
    }

    fn empty() -> Result<Value, SyncError> {
        Ok(json!({ "data": [] }))
    }

    fn field<'v>(row: &'v Value, column: &str) -> &'v str {
        row.get(column).and_then(Value::as_str).unwrap_or_default()
    }

    fn harness(store: MemoryStore, linkedin: MockLinkedIn) -> Harness {
        Harness::new(
            store.with_accounts(vec![account("1", "owner")]),
            linkedin,
            MockEnricher::new(),
            JobSettings::default(),
        )
    }

    fn single_report(summary: &crate::domain::RunSummary) -> &crate::domain::TargetReport {
        let Some(report) = summary.targets.first() else {
            panic!("one target");
        };
        report
    }

    #[tokio::test]
    async fn duplicate_viewer_keeps_most_recent_and_drops_null_id() {
        let h = harness(
            MemoryStore::new(),
            MockLinkedIn::new().with_bodies(vec![Ok(json!({ "data": [
                legacy(Some("u1"), "3 hours"),
                legacy(None, "1 hour"),
                legacy(Some("u1"), "1 hour"),
            ]}))]),
        );
        let summary = h.run(JobKind::ProfileViews).await;
        let report = single_report(&summary);
        assert_eq!(report.stage, AccountStage::Done);
        assert_eq!(report.stats.fetched, 3);
        assert_eq!(report.stats.normalized, 2);
        assert_eq!(report.stats.inserted, 1);

        let rows = h.store.rows(&SCRAPPED_VISIT);
        assert_eq!(rows.len(), 1);
        let Some(row) = rows.first() else {
            panic!("one row");
        };
        assert_eq!(field(row, "profil_linkedin_url_reaction"), "https://www.linkedin.com/in/u1");
        assert_eq!(field(row, "linkedin_url_profil_visited"), "https://www.linkedin.com/in/owner");
        assert_eq!(field(row, "date_scrapped"), "1 hours");
        assert_eq!(field(row, "date_scrapped_calculated"), "2026-03-10");
        assert_eq!(field(row, "type_reaction"), "visit_profil");
    }

    #[tokio::test]
    async fn second_run_over_same_data_adds_no_rows() {
        let page = || Ok(json!({ "data": [legacy(Some("u1"), "2 hours"), legacy(Some("u2"), "5 hours")] }));
        let h = harness(
            MemoryStore::new(),
            MockLinkedIn::new().with_bodies(vec![page(), empty(), page()]),
        );
        h.run(JobKind::ProfileViews).await;
        assert_eq!(h.store.row_count(&SCRAPPED_VISIT), 2);
        let second = h.run(JobKind::ProfileViews).await;
        assert_eq!(h.store.row_count(&SCRAPPED_VISIT), 2);
        assert_eq!(second.error_count(), 0);
    }

    #[tokio::test]
    async fn stops_on_first_page_without_recent_viewers() {
        let h = harness(
            MemoryStore::new(),
            MockLinkedIn::new().with_bodies(vec![
                Ok(json!({ "data": [legacy(Some("u1"), "2 hours")] })),
                Ok(json!({ "data": [legacy(Some("u2"), "3 days")] })),
                Ok(json!({ "data": [legacy(Some("u3"), "1 hour")] })),
            ]),
        );
        let summary = h.run(JobKind::ProfileViews).await;
        assert_eq!(h.linkedin.count("raw_route"), 2);
        assert_eq!(h.pacer.count("page"), 1);
        let report = single_report(&summary);
        assert_eq!(report.stats.deduplicated, 1);
        assert_eq!(h.store.row_count(&SCRAPPED_VISIT), 1);
    }

    #[tokio::test]
    async fn opaque_viewer_urls_are_resolved_once() {
        let page = || Ok(json!({ "data": { "data": { "premiumDashAnalyticsObjectByAnalyticsEntity": {
            "elements": [lockup("ACoAAB12", "Viewed 5h ago"), lockup("john-smith", "Viewed 1h ago")]
        }}}}));
        let h = harness(
            MemoryStore::new(),
            MockLinkedIn::new()
                .with_bodies(vec![page(), empty(), page()])
                .with_user("ACoAAB12", Reply::Found(json!({ "public_identifier": "jane-doe" }))),
        );
        let first = h.run(JobKind::ProfileViews).await;
        assert_eq!(single_report(&first).stats.enriched, 1);
        assert_eq!(h.linkedin.count("get_user"), 1);
        assert_eq!(h.pacer.count("enrichment"), 1);

        let urls: Vec<String> = h
            .store
            .rows(&SCRAPPED_VISIT)
            .iter()
            .map(|r| field(r, "profil_linkedin_url_reaction").to_string())
            .collect();
        assert!(urls.contains(&"https://www.linkedin.com/in/jane-doe".to_string()));
        assert!(urls.contains(&"https://www.linkedin.com/in/john-smith".to_string()));

        let second = h.run(JobKind::ProfileViews).await;
        assert_eq!(single_report(&second).stats.enriched, 1);
        assert_eq!(h.linkedin.count("get_user"), 1);
        assert_eq!(h.store.cache_writes(), 1);
    }

    #[tokio::test]
    async fn expired_session_fails_the_account_only() {
        let h = Harness::new(
            MemoryStore::new().with_accounts(vec![account("1", "jane"), account("2", "bob")]),
            MockLinkedIn::new().with_bodies(vec![
                Err(SyncError::AuthExpired {
                    operation: "raw_route".to_string(),
                    status: 401,
                }),
                Ok(json!({ "data": [legacy(Some("u1"), "2 hours")] })),
            ]),
            MockEnricher::new(),
            JobSettings::default(),
        );
        let summary = h.run(JobKind::ProfileViews).await;
        let stages: Vec<_> = summary.targets.iter().map(|t| t.stage).collect();
        assert_eq!(stages, vec![AccountStage::Failed, AccountStage::Done]);
        assert_eq!(summary.totals().inserted, 1);
        assert_eq!(h.pacer.count("account"), 1);
    }

    #[tokio::test]
    async fn malformed_page_keeps_earlier_pages() {
        let h = harness(
            MemoryStore::new(),
            MockLinkedIn::new().with_bodies(vec![
                Ok(json!({ "data": [legacy(Some("u1"), "2 hours")] })),
                Ok(json!({ "message": "unexpected" })),
            ]),
        );
        let summary = h.run(JobKind::ProfileViews).await;
        let report = single_report(&summary);
        assert_eq!(report.stage, AccountStage::Done);
        assert_eq!(report.stats.inserted, 1);
        let Some(error) = report.stats.errors.first() else {
            panic!("malformed page recorded");
        };
        assert_eq!(error.category, ErrorCategory::MalformedResponse);
    }

    #[tokio::test]
    async fn owners_outside_linkedin_are_ignored() {
        let mut outsider = account("2", "bob");
        outsider.owner_url = "bob@example.com".to_string();
        let h = Harness::new(
            MemoryStore::new().with_accounts(vec![outsider]),
            MockLinkedIn::new(),
            MockEnricher::new(),
            JobSettings::default(),
        );
        let summary = h.run(JobKind::ProfileViews).await;
        assert!(summary.targets.is_empty());
        assert!(h.linkedin.calls().is_empty());
    }
}
