//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Job endpoints are mounted under `/api/v1`; `/health` sits at the root.
//! With the `swagger-ui` feature the OpenAPI document is served at
//! `/api-docs/openapi.json` and browsable under `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI document of the trigger surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "outreach-sync",
        description = "Trigger surface for the LinkedIn activity sync jobs."
    ),
    paths(
        handlers::system::health_handler,
        handlers::jobs::list_jobs,
        handlers::jobs::run_job,
        handlers::jobs::latest_run,
    ),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Jobs", description = "Run scraping jobs and read their summaries"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::service::job_service::tests::service;

    fn app() -> Router {
        let state = AppState {
            job_service: Arc::new(service(Duration::from_secs(5))),
        };
        build_router().with_state(state)
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let Ok(request) = Request::builder().method(method).uri(uri).body(Body::empty()) else {
            panic!("valid request");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("infallible router");
        };
        let status = response.status();
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("readable body");
        };
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = call(app(), "GET", "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.get("status").and_then(Value::as_str), Some("healthy"));
    }

    #[tokio::test]
    async fn lists_every_job() {
        let (status, body) = call(app(), "GET", "/api/v1/jobs").await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<_> = body
            .pointer("/data")
            .and_then(Value::as_array)
            .map(|jobs| jobs.iter().filter_map(|j| j.get("job").and_then(Value::as_str)).collect())
            .unwrap_or_default();
        assert_eq!(
            names,
            vec!["profile-views", "team-connections", "strategic-connections", "strategic-people"]
        );
    }

    #[tokio::test]
    async fn run_then_read_latest() {
        let app = app();
        let (status, _) = call(app.clone(), "GET", "/api/v1/jobs/team-connections/runs/latest").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, run) = call(app.clone(), "POST", "/api/v1/jobs/team-connections/run").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run.get("job").and_then(Value::as_str), Some("team-connections"));
        assert_eq!(run.get("succeeded").and_then(Value::as_u64), Some(2));

        let (status, latest) = call(app, "GET", "/api/v1/jobs/team-connections/runs/latest").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest.get("run_id"), run.get("run_id"));
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let (status, body) = call(app(), "POST", "/api/v1/jobs/mass-mailer/run").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.pointer("/error/code").and_then(Value::as_u64), Some(2001));
    }

    #[test]
    fn openapi_lists_job_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/v1/jobs",
            "/api/v1/jobs/{job}/run",
            "/api/v1/jobs/{job}/runs/latest",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} documented");
        }
    }
}
