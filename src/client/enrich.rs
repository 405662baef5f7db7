//! Contact enrichment endpoint client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use super::{ContactEnricher, read_json};
use crate::config::EnrichConfig;
use crate::domain::account::profile_url;
use crate::error::SyncError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Calls the enrichment function with a bearer token.
#[derive(Debug, Clone)]
pub struct EnrichClient {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl EnrichClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &EnrichConfig) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }
}

/// Request body for one profile.
fn request_body(public_identifier: &str) -> Value {
    json!({
        "parameter": "all",
        "contact_linkedin_url": profile_url(public_identifier)
            .replacen("https://www.", "http://", 1),
    })
}

/// The `data` object of an enrichment response, if non-null.
fn data_of(body: Value) -> Option<Value> {
    match body {
        Value::Object(mut map) => map.remove("data").filter(|d| d.is_object()),
        _ => None,
    }
}

#[async_trait]
impl ContactEnricher for EnrichClient {
    async fn enrich(&self, public_identifier: &str) -> Result<Option<Value>, SyncError> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&request_body(public_identifier))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = read_json(response, "enrich").await?;
        Ok(data_of(body))
    }
}
