//! Recently active profiles from competitors' saved searches.
//!
//! Each configured search runs with the proxy session of the team member
//! holding the search's ghost account. Profiles without a private member
//! id after enrichment are reported and not stored.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::sales_nav::{EnrichedProfile, SalesNavScan};
use super::{JobDeps, absorb_upsert};
use crate::config::{PacingConfig, StrategicConnectionSearch};
use crate::domain::account::profile_url;
use crate::domain::{AccountStage, ErrorRecord, JobKind, RunStats, StageTracker};
use crate::error::{ErrorCategory, SyncError};
use crate::persistence::models::StrategicConnectionRow;
use crate::pipeline::{AccountPipeline, UpsertSink};

/// The strategic connections job.
#[derive(Debug)]
pub struct StrategicConnections<'a> {
    deps: &'a JobDeps,
    pacing: PacingConfig,
}

impl<'a> StrategicConnections<'a> {
    /// Creates the job with its default pacing.
    #[must_use]
    pub const fn new(deps: &'a JobDeps) -> Self {
        Self {
            deps,
            pacing: PacingConfig::strategic(),
        }
    }
}

/// Scalar field as text; member ids come back as strings or numbers.
fn scalar(data: &Value, name: &str) -> Option<String> {
    match data.get(name) {
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Shared connections as a JSON string, or `None` when there are none.
fn connected_with(data: &Value) -> Option<String> {
    data.get("connected_with")
        .filter(|v| v.as_array().is_some_and(|list| !list.is_empty()))
        .map(Value::to_string)
}

fn strategic_row(
    profile: &EnrichedProfile,
    private_id: String,
    search: &StrategicConnectionSearch,
    today: NaiveDate,
) -> StrategicConnectionRow {
    StrategicConnectionRow {
        scraping_date: today,
        sales_nav_source: search.key.clone(),
        sales_nav_description: search.description.clone(),
        linkedin_private_url: profile.field("linkedin_private_url"),
        first_name: profile.field("first_name"),
        last_name: profile.field("last_name"),
        full_name: profile.field("full_name"),
        linkedin_headline: profile.field("linkedin_headline"),
        linkedin_job_title: profile.field("linkedin_job_title"),
        company_linkedin_private_url: profile.field("company_linkedin_private_url"),
        company_name: profile.field("company_name"),
        location: profile.field("location"),
        linkedin_profile_picture_url: profile.field("linkedin_profile_picture_url"),
        linkedin_profile_url: profile
            .field("linkedin_profile_url")
            .unwrap_or_else(|| profile_url(&profile.identifier)),
        country: profile.field("country"),
        linkedin_private_id: private_id,
        connected_with: connected_with(&profile.data),
        job_strategic_role: profile.field("job_strategic_role"),
    }
}

#[async_trait]
impl AccountPipeline for StrategicConnections<'_> {
    type Target = StrategicConnectionSearch;

    fn job(&self) -> JobKind {
        JobKind::StrategicConnections
    }

    async fn targets(&self) -> Result<Vec<StrategicConnectionSearch>, SyncError> {
        self.deps.require_enricher()?;
        Ok(self.deps.settings.strategic_connection_searches.clone())
    }

    fn label(&self, target: &StrategicConnectionSearch) -> String {
        target.key.clone()
    }

    async fn run_target(
        &self,
        search: &StrategicConnectionSearch,
        stage: &mut StageTracker,
        stats: &mut RunStats,
    ) -> Result<(), SyncError> {
        let account_id = self
            .deps
            .store
            .account_by_ghost_id(&search.ghost_account_id)
            .await?
            .ok_or_else(|| {
                SyncError::Config(format!(
                    "no proxy account for ghost account {}",
                    search.ghost_account_id
                ))
            })?;
        tracing::info!(search = %search.key, description = %search.description, account_id = %account_id, "account resolved");

        let profiles = SalesNavScan::new(self.deps, self.pacing)
            .scan(&account_id, &search.saved_search_url, &search.key, stage, stats)
            .await?;

        stage.advance(AccountStage::Persisting);
        let today = self.deps.clock.now().date_naive();
        let mut rows = Vec::with_capacity(profiles.len());
        for profile in &profiles {
            match scalar(&profile.data, "linkedin_private_id") {
                Some(private_id) => rows.push(strategic_row(profile, private_id, search, today)),
                None => {
                    tracing::warn!(profile = %profile.display(), "no linkedin_private_id, skipping");
                    stats.record(ErrorRecord::new(
                        ErrorCategory::EnrichmentFailed,
                        "missing_id",
                        "linkedin_private_id missing",
                        profile.display(),
                    ));
                }
            }
        }

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

    fn between_targets(&self) -> Duration {
        self.pacing.between_accounts
    }
}
