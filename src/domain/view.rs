//! Normalized observations and the raw pages they come from.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

/// How to ask the vendor for the page after this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// `start`/`offset` based paging.
    Offset(u32),
    /// Opaque cursor returned by the vendor.
    Cursor(String),
}

/// One fetched page of vendor data.
///
/// Transient: consumed by the normalizer right after it is fetched.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Zero-based page index within the pagination run.
    pub index: u32,
    /// Vendor elements, located through the source's documented path.
    pub items: Vec<Value>,
    /// Continuation for the next page, if the vendor offered one.
    pub next: Option<Continuation>,
}

impl RawPage {
    /// Whether the page carried no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What kind of event a [`NormalizedView`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Someone viewed the owner's profile.
    ProfileView,
    /// Someone is a 1st-degree connection of the owner.
    Connection,
    /// Someone surfaced in a saved search.
    Contact,
}

/// One event observed on an external account.
///
/// Created by the normalizer from one raw vendor element. A view without
/// a `subject_id` is never constructed, so it can never reach storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedView {
    /// Event kind.
    pub kind: ViewKind,
    /// Natural key of the other party (profile slug, opaque member id or
    /// normalized profile URL depending on the feed).
    pub subject_id: String,
    /// Profile URL as reported by the vendor.
    pub subject_url: Option<String>,
    /// Display name.
    pub subject_name: Option<String>,
    /// Display headline.
    pub subject_headline: Option<String>,
    /// Vendor member URN, when the feed exposes one.
    pub member_urn: Option<String>,
    /// Age of the event in hours at processing time.
    pub age_hours: Option<f64>,
    /// Vendor wording of the age, normalized (e.g. `"5 hours"`).
    pub relative_text: Option<String>,
    /// Calendar day of the event, derived from `age_hours`.
    pub calculated_date: Option<NaiveDate>,
    /// Canonical URL resolved by enrichment; supersedes `subject_url`.
    pub resolved_url: Option<String>,
}

impl NormalizedView {
    /// Creates a view with only the natural key set.
    #[must_use]
    pub fn new(kind: ViewKind, subject_id: impl Into<String>) -> Self {
        Self {
            kind,
            subject_id: subject_id.into(),
            subject_url: None,
            subject_name: None,
            subject_headline: None,
            member_urn: None,
            age_hours: None,
            relative_text: None,
            calculated_date: None,
            resolved_url: None,
        }
    }

    /// URL to persist: the resolved one when enrichment succeeded.
    #[must_use]
    pub fn storage_url(&self) -> Option<&str> {
        self.resolved_url
            .as_deref()
            .or(self.subject_url.as_deref())
    }

    /// Whether this view is strictly more recent than `other`.
    ///
    /// A view without a recency signal is older than any view with one.
    #[must_use]
    pub fn is_more_recent_than(&self, other: &Self) -> bool {
        match (self.age_hours, other.age_hours) {
            (Some(mine), Some(theirs)) => mine < theirs,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
