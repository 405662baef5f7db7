//! Job trigger handlers: list, run, latest summary.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{JobListResponse, JobStatusDto, RunSummaryDto};
use crate::app_state::AppState;
use crate::domain::JobKind;
use crate::error::{ErrorResponse, SyncError};

/// `GET /jobs` — List jobs with their last run.
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    tag = "Jobs",
    summary = "List jobs",
    description = "Returns every scraping job, whether it is running, and the summary of its last completed run.",
    responses(
        (status = 200, description = "Job list", body = JobListResponse),
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    let data = state
        .job_service
        .list()
        .await
        .into_iter()
        .map(JobStatusDto::from)
        .collect();
    Json(JobListResponse { data })
}

/// `POST /jobs/:job/run` — Run a job to completion.
///
/// # Errors
///
/// Returns [`SyncError::JobNotFound`] for an unknown job,
/// [`SyncError::JobAlreadyRunning`] if it is in progress and
/// [`SyncError::JobTimedOut`] if it overruns its budget.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/{job}/run",
    tag = "Jobs",
    summary = "Run a job",
    description = "Runs the job over all its targets and returns the run summary. Per-target failures are part of the summary; the request only fails when the run cannot start or overruns its budget.",
    params(
        ("job" = String, Path, description = "Job name, e.g. `profile-views`"),
    ),
    responses(
        (status = 200, description = "Run finished", body = RunSummaryDto),
        (status = 404, description = "Unknown job", body = ErrorResponse),
        (status = 409, description = "Job already running", body = ErrorResponse),
        (status = 504, description = "Run exceeded its budget", body = ErrorResponse),
    )
)]
pub async fn run_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> Result<impl IntoResponse, SyncError> {
    let job: JobKind = job.parse()?;
    tracing::info!(job = %job, "run requested");
    let summary = state.job_service.run(job).await?;
    Ok(Json(RunSummaryDto::from(summary)))
}

/// `GET /jobs/:job/runs/latest` — Last run summary.
///
/// # Errors
///
/// Returns [`SyncError::JobNotFound`] for an unknown job or one that has
/// not completed a run yet.
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{job}/runs/latest",
    tag = "Jobs",
    summary = "Latest run",
    description = "Returns the summary of the last completed run of the job.",
    params(
        ("job" = String, Path, description = "Job name, e.g. `team-connections`"),
    ),
    responses(
        (status = 200, description = "Last run summary", body = RunSummaryDto),
        (status = 404, description = "Unknown job or never run", body = ErrorResponse),
    )
)]
pub async fn latest_run(
    State(state): State<AppState>,
    Path(job): Path<String>,
) -> Result<impl IntoResponse, SyncError> {
    let job: JobKind = job.parse()?;
    let summary = state
        .job_service
        .latest(job)
        .await
        .ok_or_else(|| SyncError::JobNotFound(format!("{job} has not run yet")))?;
    Ok(Json(RunSummaryDto::from(summary)))
}

/// Job routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{job}/run", post(run_job))
        .route("/jobs/{job}/runs/latest", get(latest_run))
}
