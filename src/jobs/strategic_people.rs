//! Recently active profiles from our own saved searches.
//!
//! All searches run with one proxy session, resolved once from the
//! configured ghost account before the first search.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::sales_nav::{EnrichedProfile, SalesNavScan};
use super::{JobDeps, absorb_upsert};
use crate::config::{PacingConfig, SavedSearch};
use crate::domain::account::profile_url;
use crate::domain::{AccountStage, JobKind, RunStats, StageTracker};
use crate::error::SyncError;
use crate::persistence::models::StrategicPersonRow;
use crate::pipeline::{AccountPipeline, UpsertSink};

/// A saved search bound to the proxy account that runs it.
#[derive(Debug, Clone)]
pub struct PeopleSearch {
    /// Proxy account id.
    pub account_id: String,
    /// The saved search.
    pub search: SavedSearch,
}

/// The strategic people job.
#[derive(Debug)]
pub struct StrategicPeople<'a> {
    deps: &'a JobDeps,
    pacing: PacingConfig,
}

impl<'a> StrategicPeople<'a> {
    /// Creates the job with its default pacing.
    #[must_use]
    pub const fn new(deps: &'a JobDeps) -> Self {
        Self {
            deps,
            pacing: PacingConfig::strategic(),
        }
    }
}

fn person_row(profile: &EnrichedProfile, search: &SavedSearch, today: NaiveDate) -> StrategicPersonRow {
    StrategicPersonRow {
        linkedin_private_url: profile
            .field("linkedin_private_url")
            .unwrap_or_else(|| profile.identifier.clone()),
        linkedin_profile_url: profile
            .field("linkedin_profile_url")
            .unwrap_or_else(|| profile_url(&profile.identifier)),
        scraping_date: today,
        saved_search_id: search.saved_search_id.clone(),
        saved_search_name: search.name.clone(),
    }
}

#[async_trait]
impl AccountPipeline for StrategicPeople<'_> {
    type Target = PeopleSearch;

    fn job(&self) -> JobKind {
        JobKind::StrategicPeople
    }

    async fn targets(&self) -> Result<Vec<PeopleSearch>, SyncError> {
        self.deps.require_enricher()?;
        let config = &self.deps.settings.strategic_people;
        if config.ghost_account_id.trim().is_empty() {
            return Err(SyncError::Config("STRATEGIC_PEOPLE_ACCOUNT is not set".to_string()));
        }
        let account_id = self
            .deps
            .store
            .account_by_ghost_id(&config.ghost_account_id)
            .await?
            .ok_or_else(|| {
                SyncError::Config(format!(
                    "no proxy account for ghost account {}",
                    config.ghost_account_id
                ))
            })?;
        tracing::info!(account_id = %account_id, searches = config.searches.len(), "account resolved");

        Ok(config
            .searches
            .iter()
            .map(|search| PeopleSearch {
                account_id: account_id.clone(),
                search: search.clone(),
            })
            .collect())
    }

    fn label(&self, target: &PeopleSearch) -> String {
        target.search.name.clone()
    }

    async fn run_target(
        &self,
        target: &PeopleSearch,
        stage: &mut StageTracker,
        stats: &mut RunStats,
    ) -> Result<(), SyncError> {
        let search = &target.search;
        let profiles = SalesNavScan::new(self.deps, self.pacing)
            .scan(&target.account_id, &search.saved_search_url, &search.name, stage, stats)
            .await?;

        stage.advance(AccountStage::Persisting);
        let today = self.deps.clock.now().date_naive();
        let rows: Vec<StrategicPersonRow> = profiles
            .iter()
            .map(|profile| person_row(profile, search, today))
            .collect();
        let sink = UpsertSink::new(
            self.deps.store.as_ref(),
            self.deps.pacer.as_ref(),
            self.pacing.row_pause,
            self.pacing.row_pause_every,
        );
        absorb_upsert(stats, sink.upsert(&rows).await?);
        Ok(())
    }

    fn between_targets(&self) -> Duration {
        self.pacing.between_accounts
    }
}
