//! [`PageSource`] adapters over the scraping proxy.
//!
//! Each adapter binds one proxy account to one listing and knows where
//! that listing keeps its elements and its continuation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::client::LinkedInSource;
use crate::domain::Continuation;
use crate::error::SyncError;
use crate::pipeline::dedup::SEARCH_WINDOW_HOURS;
use crate::pipeline::normalize::{ITEMS_PATHS, VIEWER_ELEMENTS_PATHS, locate_items, str_at};
use crate::pipeline::{PageSource, SourcePage};

/// GraphQL query id of the "who viewed your profile" analytics feed.
const VIEWERS_QUERY_ID: &str = "voyagerPremiumDashAnalyticsObject.c31102e906e7098910f44e0cecaa5b5c";

/// Internal API URL of one page of the profile viewers feed.
#[must_use]
pub fn viewers_url(start: u32, count: u32) -> String {
    format!(
        "https://www.linkedin.com/voyager/api/graphql?includeWebMetadata=true\
         &variables=(start:{start},count:{count},query:(),\
         analyticsEntityUrn:(activityUrn:urn%3Ali%3Adummy%3A-1),surfaceType:WVMP)\
         &queryId={VIEWERS_QUERY_ID}"
    )
}

/// Saved search URL restricted to profiles active in the last 72 hours.
#[must_use]
pub fn recently_viewed(saved_search_url: &str, now: DateTime<Utc>) -> String {
    let since = now.timestamp_millis() - SEARCH_WINDOW_HOURS * 3_600_000;
    let separator = if saved_search_url.contains('?') { '&' } else { '?' };
    format!("{saved_search_url}{separator}lastViewedAt={since}")
}

fn cursor_of(continuation: Option<&Continuation>) -> Option<&str> {
    match continuation {
        Some(Continuation::Cursor(cursor)) => Some(cursor),
        Some(Continuation::Offset(_)) | None => None,
    }
}

fn next_cursor(body: &Value) -> Option<Continuation> {
    str_at(body, "/cursor").map(Continuation::Cursor)
}

/// Offset-paginated profile viewers, through the raw route.
#[derive(Debug)]
pub struct ViewerFeed<'a> {
    linkedin: &'a dyn LinkedInSource,
    account_id: &'a str,
    page_size: u32,
}

impl<'a> ViewerFeed<'a> {
    /// Viewers of the account owning the `account_id` session.
    #[must_use]
    pub const fn new(linkedin: &'a dyn LinkedInSource, account_id: &'a str, page_size: u32) -> Self {
        Self {
            linkedin,
            account_id,
            page_size,
        }
    }
}

#[async_trait]
impl PageSource for ViewerFeed<'_> {
    async fn fetch(&self, continuation: Option<&Continuation>) -> Result<SourcePage, SyncError> {
        let start = match continuation {
            Some(Continuation::Offset(start)) => *start,
            Some(Continuation::Cursor(_)) | None => 0,
        };
        let body = self
            .linkedin
            .raw_route(self.account_id, &viewers_url(start, self.page_size))
            .await?;
        let items = locate_items(&body, VIEWER_ELEMENTS_PATHS)?;
        let next = (!items.is_empty()).then(|| Continuation::Offset(start + self.page_size));
        Ok(SourcePage { items, next })
    }
}

/// Cursor-paginated 1st-degree relations, most recent first.
#[derive(Debug)]
pub struct RelationFeed<'a> {
    linkedin: &'a dyn LinkedInSource,
    account_id: &'a str,
    page_size: u32,
}

impl<'a> RelationFeed<'a> {
    /// Relations of the account owning the `account_id` session.
    #[must_use]
    pub const fn new(linkedin: &'a dyn LinkedInSource, account_id: &'a str, page_size: u32) -> Self {
        Self {
            linkedin,
            account_id,
            page_size,
        }
    }
}

#[async_trait]
impl PageSource for RelationFeed<'_> {
    async fn fetch(&self, continuation: Option<&Continuation>) -> Result<SourcePage, SyncError> {
        let body = self
            .linkedin
            .relations(self.account_id, self.page_size, cursor_of(continuation))
            .await?;
        Ok(SourcePage {
            items: locate_items(&body, ITEMS_PATHS)?,
            next: next_cursor(&body),
        })
    }
}

/// Cursor-paginated Sales Navigator search results.
#[derive(Debug)]
pub struct SearchFeed<'a> {
    linkedin: &'a dyn LinkedInSource,
    account_id: &'a str,
    search_url: String,
}

impl<'a> SearchFeed<'a> {
    /// Results of `search_url`, run with the `account_id` session.
    #[must_use]
    pub const fn new(linkedin: &'a dyn LinkedInSource, account_id: &'a str, search_url: String) -> Self {
        Self {
            linkedin,
            account_id,
            search_url,
        }
    }
}

#[async_trait]
impl PageSource for SearchFeed<'_> {
    async fn fetch(&self, continuation: Option<&Continuation>) -> Result<SourcePage, SyncError> {
        let body = self
            .linkedin
            .search(self.account_id, &self.search_url, cursor_of(continuation))
            .await?;
        Ok(SourcePage {
            items: locate_items(&body, ITEMS_PATHS)?,
            next: next_cursor(&body),
        })
    }
}
