//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::service::JobService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Job runner and last-run registry.
    pub job_service: Arc<JobService>,
}
