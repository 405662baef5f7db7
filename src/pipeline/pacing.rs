//! Injectable pauses and clock.
//!
//! Every rate-limit pause goes through a [`Pacer`] and every "now" through
//! a [`Clock`], so production wiring sleeps for real while tests run with
//! zero delay and a frozen time.

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Suspends the current task between vendor calls.
#[async_trait]
pub trait Pacer: Send + Sync + fmt::Debug {
    /// Waits for `duration`. `reason` is a short label for logs and tests.
    async fn pause(&self, duration: Duration, reason: &'static str);
}

/// Real pacer backed by [`tokio::time::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration, reason: &'static str) {
        if duration.is_zero() {
            return;
        }
        tracing::trace!(?duration, reason, "pausing");
        tokio::time::sleep(duration).await;
    }
}

/// Pacer that never sleeps and remembers every requested pause.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<(&'static str, Duration)>>,
}

impl RecordingPacer {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All pauses requested so far, in order.
    #[must_use]
    pub fn pauses(&self) -> Vec<(&'static str, Duration)> {
        self.pauses
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Number of pauses requested with the given reason.
    #[must_use]
    pub fn count(&self, reason: &str) -> usize {
        self.pauses().iter().filter(|(r, _)| *r == reason).count()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, duration: Duration, reason: &'static str) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push((reason, duration));
        }
    }
}

/// Source of the processing time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
