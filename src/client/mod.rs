//! Outbound HTTP clients.
//!
//! [`LinkedInSource`] is the scraping proxy seen by the pipelines: the
//! paginated reads plus the point lookup used as enrichment resolver.
//! [`ContactEnricher`] is the contact enrichment endpoint used by the
//! strategic jobs. Both are traits so pipelines run against scripted
//! fakes in tests.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::SyncError;

pub mod enrich;
#[cfg(test)]
pub(crate) mod mock;
pub mod unipile;

pub use enrich::EnrichClient;
pub use unipile::UnipileClient;

/// Longest response excerpt kept in an error message.
const MAX_BODY_EXCERPT: usize = 200;

/// Scraping proxy operations, each bound to one proxy account session.
#[async_trait]
pub trait LinkedInSource: Send + Sync + fmt::Debug {
    /// Proxies a GET to a LinkedIn internal API URL and returns its body.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RateLimited`] on 429, [`SyncError::AuthExpired`]
    /// on 401/403, [`SyncError::MalformedResponse`] on an undecodable body.
    async fn raw_route(&self, account_id: &str, request_url: &str) -> Result<Value, SyncError>;

    /// Looks up a profile by slug or opaque member id.
    ///
    /// Returns `Ok(None)` when the profile does not exist (404).
    ///
    /// # Errors
    ///
    /// Same classification as [`Self::raw_route`].
    async fn get_user(&self, account_id: &str, identifier: &str)
    -> Result<Option<Value>, SyncError>;

    /// Runs a Sales Navigator search URL, one page per call.
    ///
    /// # Errors
    ///
    /// Same classification as [`Self::raw_route`].
    async fn search(
        &self,
        account_id: &str,
        search_url: &str,
        cursor: Option<&str>,
    ) -> Result<Value, SyncError>;

    /// Lists 1st-degree relations, most recent first.
    ///
    /// # Errors
    ///
    /// Same classification as [`Self::raw_route`].
    async fn relations(
        &self,
        account_id: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Value, SyncError>;
}

/// Contact enrichment endpoint.
#[async_trait]
pub trait ContactEnricher: Send + Sync + fmt::Debug {
    /// Enriches a profile by its public identifier and returns the
    /// `data` object, or `None` when the endpoint has nothing.
    ///
    /// # Errors
    ///
    /// Returns a classified [`SyncError`] when the call fails.
    async fn enrich(&self, public_identifier: &str) -> Result<Option<Value>, SyncError>;
}

/// Maps a non-success status to the error taxonomy.
#[must_use]
pub fn classify_status(status: StatusCode, operation: &str, body: &str) -> SyncError {
    match status.as_u16() {
        429 => SyncError::RateLimited {
            operation: operation.to_string(),
            attempts: 1,
        },
        code @ (401 | 403) => SyncError::AuthExpired {
            operation: operation.to_string(),
            status: code,
        },
        code => SyncError::Http {
            status: code,
            message: excerpt(body),
        },
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => body.get(..idx).unwrap_or(body).to_string(),
        None => body.to_string(),
    }
}

/// Reads a response as JSON, classifying failures.
pub(crate) async fn read_json(
    response: reqwest::Response,
    operation: &str,
) -> Result<Value, SyncError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status, operation, &body));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| SyncError::MalformedResponse(format!("{operation}: {e}")))
}
