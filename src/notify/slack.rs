//! Slack incoming-webhook sink.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{Delivery, NotificationSink};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts `{text, unfurl_links: false}` to an incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackWebhook {
    name: String,
    webhook_url: String,
    http: reqwest::Client,
}

impl SlackWebhook {
    /// Creates a sink for `webhook_url`.
    #[must_use]
    pub fn new(name: &str, webhook_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            name: name.to_string(),
            webhook_url,
            http,
        }
    }
}

#[async_trait]
impl NotificationSink for SlackWebhook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, text: &str) -> Delivery {
        let payload = json!({
            "text": text,
            "unfurl_links": false,
        });
        let response = match self.http.post(&self.webhook_url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => return Delivery::Failed(e.to_string()),
        };
        let status = response.status();
        if status.is_success() {
            Delivery::Sent
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Slack webhook returned non-success");
            Delivery::Failed(format!("Slack webhook returned {status}"))
        }
    }
}

/// Sink for an unconfigured channel.
#[derive(Debug, Clone)]
pub struct NoopSink {
    name: String,
}

impl NoopSink {
    /// Creates a no-op sink.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl NotificationSink for NoopSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, _text: &str) -> Delivery {
        Delivery::Skipped
    }
}
