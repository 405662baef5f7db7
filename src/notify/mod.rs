//! Run notifications.
//!
//! Delivery is best-effort: a sink returns a [`Delivery`] that the
//! [`Notifier`] logs and hands back, and nothing here can fail a run.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SlackConfig;
use crate::domain::{JobKind, RunSummary};

pub mod report;
pub mod slack;

pub use slack::{NoopSink, SlackWebhook};

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the sink.
    Sent,
    /// Nothing was sent (sink not configured).
    Skipped,
    /// Sending failed; never retried.
    Failed(String),
}

/// Accepts a single text payload.
#[async_trait]
pub trait NotificationSink: Send + Sync + fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Sends `text`.
    async fn send(&self, text: &str) -> Delivery;
}

/// Builds a webhook sink, or a no-op one when `url` is unset.
#[must_use]
pub fn webhook_or_noop(name: &str, url: Option<&String>) -> Arc<dyn NotificationSink> {
    match url {
        Some(url) => Arc::new(SlackWebhook::new(name, url.clone())),
        None => Arc::new(NoopSink::new(name)),
    }
}

/// Routes run summaries to the alert and recap channels.
#[derive(Debug, Clone)]
pub struct Notifier {
    alerts: Vec<Arc<dyn NotificationSink>>,
    recap: Option<Arc<dyn NotificationSink>>,
}

impl Notifier {
    /// Error alerts go to every sink in `alerts`; success recaps to `recap`.
    #[must_use]
    pub fn new(
        alerts: Vec<Arc<dyn NotificationSink>>,
        recap: Option<Arc<dyn NotificationSink>>,
    ) -> Self {
        Self { alerts, recap }
    }

    /// A notifier that sends nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Vec::new(), None)
    }

    /// Channels used for `job`.
    ///
    /// Every job alerts the script-logs channel. The scraping jobs that
    /// watch third-party accounts also alert the concurrent channel, and
    /// profile views sends a success recap.
    #[must_use]
    pub fn for_job(job: JobKind, slack: &SlackConfig) -> Self {
        let mut alerts = vec![webhook_or_noop("script-logs", slack.script_logs.as_ref())];
        if matches!(
            job,
            JobKind::TeamConnections | JobKind::StrategicConnections | JobKind::StrategicPeople
        ) {
            alerts.push(webhook_or_noop("concurrent", slack.concurrent.as_ref()));
        }
        let recap = (job == JobKind::ProfileViews).then(|| {
            webhook_or_noop(
                "profile-views-success",
                slack.profile_views_success.as_ref(),
            )
        });
        Self::new(alerts, recap)
    }

    /// Sends the error alert (when the run recorded errors) and the
    /// success recap (when at least one target succeeded).
    pub async fn notify(&self, summary: &RunSummary) -> Vec<Delivery> {
        let mut deliveries = Vec::new();

        if summary.error_count() > 0 {
            let text = report::error_alert(summary);
            for sink in &self.alerts {
                deliveries.push(deliver(sink.as_ref(), &text).await);
            }
        } else {
            tracing::debug!(job = %summary.job, "no errors, skipping alert");
        }

        if let Some(sink) = &self.recap {
            if summary.succeeded() > 0 {
                let text = report::success_recap(summary);
                deliveries.push(deliver(sink.as_ref(), &text).await);
            }
        }
        deliveries
    }
}

async fn deliver(sink: &dyn NotificationSink, text: &str) -> Delivery {
    let delivery = sink.send(text).await;
    match &delivery {
        Delivery::Sent => tracing::info!(sink = sink.name(), "notification sent"),
        Delivery::Skipped => tracing::debug!(sink = sink.name(), "notification skipped"),
        Delivery::Failed(reason) => {
            tracing::warn!(sink = sink.name(), reason = %reason, "notification failed");
        }
    }
    delivery
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::domain::{AccountStage, ErrorRecord, RunId, RunStats, TargetReport};
    use crate::error::ErrorCategory;

    /// Sink remembering every payload.
    #[derive(Debug, Default)]
    pub(crate) struct CapturingSink {
        pub(crate) sent: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CapturingSink {
        pub(crate) fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub(crate) fn texts(&self) -> Vec<String> {
            self.sent.lock().map(|s| s.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl NotificationSink for CapturingSink {
        fn name(&self) -> &str {
            "capture"
        }

        async fn send(&self, text: &str) -> Delivery {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push(text.to_string());
            }
            if self.fail {
                Delivery::Failed("HTTP 500".to_string())
            } else {
                Delivery::Sent
            }
        }
    }

    fn summary(errors: usize) -> RunSummary {
        let mut stats = RunStats {
            inserted: 3,
            ..RunStats::default()
        };
        for i in 0..errors {
            stats.record(ErrorRecord::new(ErrorCategory::Http, "500", "boom", format!("p{i}")));
        }
        RunSummary {
            run_id: RunId::new(),
            job: JobKind::ProfileViews,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            targets: vec![TargetReport {
                label: "jane".to_string(),
                stage: AccountStage::Done,
                stats,
            }],
            setup_errors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn clean_run_sends_recap_only() {
        let alert = Arc::new(CapturingSink::default());
        let recap = Arc::new(CapturingSink::default());
        let notifier = Notifier::new(vec![Arc::clone(&alert) as _], Some(Arc::clone(&recap) as _));
        let deliveries = notifier.notify(&summary(0)).await;
        assert_eq!(deliveries, vec![Delivery::Sent]);
        assert!(alert.texts().is_empty());
        assert_eq!(recap.texts().len(), 1);
    }

    #[tokio::test]
    async fn errors_trigger_alert_on_every_channel() {
        let first = Arc::new(CapturingSink::default());
        let second = Arc::new(CapturingSink::failing());
        let notifier = Notifier::new(vec![Arc::clone(&first) as _, Arc::clone(&second) as _], None);
        let deliveries = notifier.notify(&summary(2)).await;
        assert_eq!(
            deliveries,
            vec![Delivery::Sent, Delivery::Failed("HTTP 500".to_string())]
        );
        let texts = first.texts();
        let Some(text) = texts.first() else {
            panic!("alert sent");
        };
        assert!(text.contains("Erreurs (2)"));
    }

    #[tokio::test]
    async fn unconfigured_channels_are_skipped() {
        let notifier = Notifier::for_job(JobKind::StrategicConnections, &SlackConfig::default());
        let deliveries = notifier.notify(&summary(1)).await;
        assert_eq!(deliveries, vec![Delivery::Skipped, Delivery::Skipped]);
    }
}
