//! Unipile REST client.
//!
//! Every request carries the `X-API-KEY` header. Retrying is not done
//! here: a 429 is returned as [`SyncError::RateLimited`] and the caller's
//! [`crate::pipeline::RetryPolicy`] decides what to do with it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};

use super::{LinkedInSource, read_json};
use crate::config::UnipileConfig;
use crate::error::SyncError;

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Scraping proxy client.
#[derive(Debug, Clone)]
pub struct UnipileClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl UnipileClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Config`] if the base URL cannot be parsed or
    /// the HTTP client cannot be built.
    pub fn new(config: &UnipileConfig) -> Result<Self, SyncError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SyncError::Config(format!("UNIPILE_BASE_URL: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SyncError::Config("UNIPILE_BASE_URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("X-API-KEY", &self.api_key)
            .header("Accept", "application/json")
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("X-API-KEY", &self.api_key)
            .header("Accept", "application/json")
    }
}

#[async_trait]
impl LinkedInSource for UnipileClient {
    async fn raw_route(&self, account_id: &str, request_url: &str) -> Result<Value, SyncError> {
        let url = self.endpoint(&["linkedin"])?;
        let response = self
            .post(url)
            .json(&json!({
                "account_id": account_id,
                "request_url": request_url,
                "method": "GET",
                "encoding": false,
            }))
            .send()
            .await?;
        read_json(response, "raw_route").await
    }

    async fn get_user(
        &self,
        account_id: &str,
        identifier: &str,
    ) -> Result<Option<Value>, SyncError> {
        let url = self.endpoint(&["users", identifier])?;
        let response = self
            .get(url)
            .query(&[("account_id", account_id)])
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(identifier, "profile not found");
            return Ok(None);
        }
        read_json(response, "get_user").await.map(Some)
    }

    async fn search(
        &self,
        account_id: &str,
        search_url: &str,
        cursor: Option<&str>,
    ) -> Result<Value, SyncError> {
        let url = self.endpoint(&["linkedin", "search"])?;
        let mut body = json!({ "url": search_url });
        if let (Some(cursor), Some(map)) = (cursor, body.as_object_mut()) {
            map.insert("cursor".to_string(), Value::String(cursor.to_string()));
        }
        let response = self
            .post(url)
            .query(&[("account_id", account_id)])
            .json(&body)
            .send()
            .await?;
        read_json(response, "search").await
    }

    async fn relations(
        &self,
        account_id: &str,
        limit: u32,
        cursor: Option<&str>,
    ) -> Result<Value, SyncError> {
        let url = self.endpoint(&["users", "relations"])?;
        let mut request = self
            .get(url)
            .query(&[("account_id", account_id)])
            .query(&[("limit", limit)]);
        if let Some(cursor) = cursor {
            request = request.query(&[("cursor", cursor)]);
        }
        let response = request.send().await?;
        read_json(response, "relations").await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn client(base: &str) -> UnipileClient {
        let Ok(client) = UnipileClient::new(&UnipileConfig {
            base_url: base.to_string(),
            api_key: "key".to_string(),
        }) else {
            panic!("client should build");
        };
        client
    }

    #[test]
    fn endpoints_append_to_base_path() {
        let c = client("https://api8.unipile.com:13851/api/v1");
        let Ok(url) = c.endpoint(&["users", "relations"]) else {
            panic!("endpoint");
        };
        assert_eq!(url.as_str(), "https://api8.unipile.com:13851/api/v1/users/relations");
    }

    #[test]
    fn identifiers_are_percent_encoded() {
        let c = client("https://api.example.com/api/v1/");
        let Ok(url) = c.endpoint(&["users", "jane doe/x"]) else {
            panic!("endpoint");
        };
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/users/jane%20doe%2Fx");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let result = UnipileClient::new(&UnipileConfig {
            base_url: "not a url".to_string(),
            api_key: "key".to_string(),
        });
        assert!(matches!(result, Err(SyncError::Config(_))));
    }
}
