//! Drives repeated fetches against a cursor- or offset-paginated source.
//!
//! A [`Paginator`] is single-use: it owns the continuation state of one
//! pagination run and stops for good on the first stop condition. The
//! caller decodes each page and may stop it early with
//! [`StopReason::NoRelevantItems`] or [`StopReason::AllKnown`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::pacing::Pacer;
use super::retry::RetryPolicy;
use crate::domain::{Continuation, RawPage};
use crate::error::SyncError;

/// One page as returned by a [`PageSource`].
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    /// Vendor elements.
    pub items: Vec<Value>,
    /// Continuation for the following page.
    pub next: Option<Continuation>,
}

/// A paginated vendor endpoint bound to one account.
#[async_trait]
pub trait PageSource: Send + Sync + fmt::Debug {
    /// Fetches the page at `continuation` (`None` for the first page).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RateLimited`] on a single 429 (the paginator
    /// retries), [`SyncError::AuthExpired`] on 401/403 and
    /// [`SyncError::MalformedResponse`] when the body has no element list.
    async fn fetch(&self, continuation: Option<&Continuation>) -> Result<SourcePage, SyncError>;
}

/// Why a pagination run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The vendor returned a page without elements.
    EmptyPage,
    /// The last page carried no continuation.
    NoContinuation,
    /// The page ceiling was reached.
    MaxPages,
    /// The caller found nothing relevant on the last page.
    NoRelevantItems,
    /// Every item on the last page already exists in storage.
    AllKnown,
    /// The body could not be decoded.
    Malformed,
    /// 429 retries were exhausted.
    RateLimited,
    /// The session was rejected.
    AuthExpired,
    /// Any other fetch failure.
    Failed,
}

impl StopReason {
    const fn from_error(err: &SyncError) -> Self {
        match err {
            SyncError::RateLimited { .. } => Self::RateLimited,
            SyncError::AuthExpired { .. } => Self::AuthExpired,
            SyncError::MalformedResponse(_) => Self::Malformed,
            _ => Self::Failed,
        }
    }

    /// Short snake_case name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyPage => "empty_page",
            Self::NoContinuation => "no_continuation",
            Self::MaxPages => "max_pages",
            Self::NoRelevantItems => "no_relevant_items",
            Self::AllKnown => "all_known",
            Self::Malformed => "malformed",
            Self::RateLimited => "rate_limited",
            Self::AuthExpired => "auth_expired",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page size and ceiling for one pagination run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Elements requested per page.
    pub page_size: u32,
    /// Hard ceiling on fetched pages.
    pub max_pages: u32,
}

/// Lazy, finite, non-restartable sequence of [`RawPage`]s.
#[derive(Debug)]
pub struct Paginator<'a> {
    source: &'a dyn PageSource,
    pacer: &'a dyn Pacer,
    retry: RetryPolicy,
    between_pages: Duration,
    max_pages: u32,
    continuation: Option<Continuation>,
    pages_fetched: u32,
    rate_limit_hits: u32,
    stopped: Option<StopReason>,
}

impl<'a> Paginator<'a> {
    /// Starts a pagination run against `source`.
    #[must_use]
    pub fn new(
        source: &'a dyn PageSource,
        pacer: &'a dyn Pacer,
        retry: RetryPolicy,
        between_pages: Duration,
        max_pages: u32,
    ) -> Self {
        Self {
            source,
            pacer,
            retry,
            between_pages,
            max_pages,
            continuation: None,
            pages_fetched: 0,
            rate_limit_hits: 0,
            stopped: None,
        }
    }

    /// Fetches the next page.
    ///
    /// Returns `None` once a stop condition has fired. A fetch error is
    /// yielded once and then ends the run; pages yielded before it stay
    /// valid.
    pub async fn next_page(&mut self) -> Option<Result<RawPage, SyncError>> {
        if self.stopped.is_some() {
            return None;
        }
        if self.pages_fetched >= self.max_pages {
            self.stop(StopReason::MaxPages);
            return None;
        }
        if self.pages_fetched > 0 {
            if self.continuation.is_none() {
                self.stop(StopReason::NoContinuation);
                return None;
            }
            self.pacer.pause(self.between_pages, "page").await;
        }

        let index = self.pages_fetched;
        let label = format!("page {index}");
        let source = self.source;
        let continuation = self.continuation.clone();
        let continuation = continuation.as_ref();
        let fetched = self
            .retry
            .run(self.pacer, &label, &mut self.rate_limit_hits, move || {
                source.fetch(continuation)
            })
            .await;

        match fetched {
            Ok(page) => {
                self.pages_fetched += 1;
                if page.items.is_empty() {
                    self.stop(StopReason::EmptyPage);
                    return None;
                }
                tracing::debug!(page = index, items = page.items.len(), "page fetched");
                self.continuation = page.next.clone();
                Some(Ok(RawPage {
                    index,
                    items: page.items,
                    next: page.next,
                }))
            }
            Err(err) => {
                self.stop(StopReason::from_error(&err));
                Some(Err(err))
            }
        }
    }

    /// Ends the run. The first reason wins.
    pub fn stop(&mut self, reason: StopReason) {
        if self.stopped.is_none() {
            tracing::debug!(reason = %reason, pages = self.pages_fetched, "pagination stopped");
            self.stopped = Some(reason);
        }
    }

    /// Why the run ended, if it has.
    #[must_use]
    pub const fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Pages successfully fetched so far.
    #[must_use]
    pub const fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// 429 responses observed so far, retried ones included.
    #[must_use]
    pub const fn rate_limit_hits(&self) -> u32 {
        self.rate_limit_hits
    }
}
