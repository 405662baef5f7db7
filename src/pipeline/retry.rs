//! Bounded retry for rate-limited vendor calls.
//!
//! Only [`SyncError::RateLimited`] is retried, after a fixed backoff and
//! at most [`RetryPolicy::max_retries`] times. Auth failures and malformed
//! bodies are returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use super::pacing::Pacer;
use crate::config::PacingConfig;
use crate::error::SyncError;

/// Re-attempts allowed after the first 429.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Fixed-backoff retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Re-attempts after the first failure.
    pub max_retries: u32,
    /// Wait before each re-attempt.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Policy using the pipeline's 429 backoff and two re-attempts.
    #[must_use]
    pub const fn from_pacing(pacing: &PacingConfig) -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: pacing.rate_limit_backoff,
        }
    }

    /// Runs `op`, retrying whole on rate limiting.
    ///
    /// `hits` is incremented for every 429 observed, including the last
    /// one, so run summaries can report rate-limit pressure.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RateLimited`] carrying `label` and the total
    /// attempt count once retries are exhausted, or the first
    /// non-rate-limit error unchanged.
    pub async fn run<T, F, Fut>(
        &self,
        pacer: &dyn Pacer,
        label: &str,
        hits: &mut u32,
        mut op: F,
    ) -> Result<T, SyncError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op().await {
                Err(SyncError::RateLimited { .. }) => {
                    *hits += 1;
                    if attempt > self.max_retries {
                        return Err(SyncError::RateLimited {
                            operation: label.to_string(),
                            attempts: attempt,
                        });
                    }
                    tracing::warn!(
                        operation = label,
                        attempt,
                        backoff_ms = self.backoff.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    pacer.pause(self.backoff, "rate_limit").await;
                }
                other => return other,
            }
        }
    }
}
