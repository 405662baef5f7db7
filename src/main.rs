//! outreach-sync entry point.
//!
//! Serves the job trigger API, or runs a single job and exits when
//! `RUN_ONCE` names one.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use outreach_sync::api;
use outreach_sync::app_state::AppState;
use outreach_sync::client::{ContactEnricher, EnrichClient, LinkedInSource, UnipileClient};
use outreach_sync::config::SyncConfig;
use outreach_sync::domain::JobKind;
use outreach_sync::jobs::{JobDeps, JobSettings};
use outreach_sync::persistence::{PostgresStore, SyncStore};
use outreach_sync::pipeline::{SystemClock, TokioPacer};
use outreach_sync::service::JobService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SyncConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Storage
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connecting to PostgreSQL")?;
    sqlx::migrate!()
        .run(&pool)
        .await
        .context("running migrations")?;

    // Vendors
    let linkedin: Arc<dyn LinkedInSource> = Arc::new(UnipileClient::new(&config.unipile)?);
    let enricher = match &config.enrich {
        Some(enrich) => Some(Arc::new(EnrichClient::new(enrich)?) as Arc<dyn ContactEnricher>),
        None => {
            tracing::warn!("ENRICH_URL/ENRICH_TOKEN unset, strategic jobs will refuse to run");
            None
        }
    };

    let deps = JobDeps {
        store: Arc::new(PostgresStore::new(pool)) as Arc<dyn SyncStore>,
        linkedin,
        enricher,
        pacer: Arc::new(TokioPacer),
        clock: Arc::new(SystemClock),
        settings: JobSettings::from_config(&config),
    };
    let job_service = Arc::new(JobService::new(
        deps,
        config.slack.clone(),
        Duration::from_secs(config.job_timeout_secs),
    ));

    if let Some(name) = &config.run_once {
        let job: JobKind = name.parse()?;
        tracing::info!(job = %job, "running once");
        let summary = job_service.run(job).await?;
        tracing::info!(
            job = %job,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            errors = summary.error_count(),
            "run finished"
        );
        return Ok(());
    }

    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { job_service });

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
