//! Vendor payloads to [`NormalizedView`]s.
//!
//! Vendor shapes vary between endpoints and over time, so every lookup
//! that has more than one possible location is an ordered list of
//! extractor functions tried with [`first_of`]. Elements that do not
//! describe an identifiable person are rejected one by one; a bad element
//! never fails its page.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::account::{profile_slug, profile_url};
use crate::domain::recency::{
    Recency, age_hours_from_epoch_ms, calculated_date, date_from_epoch_ms, parse_recency,
    relative_text,
};
use crate::domain::{NormalizedView, RawPage, ViewKind};
use crate::error::SyncError;

/// Pulls one string out of a JSON value, or nothing.
pub type Extractor = fn(&Value) -> Option<String>;

/// Converts one vendor element into a view.
pub type ElementNormalizer = fn(&Value, DateTime<Utc>) -> Result<NormalizedView, Rejected>;

/// Element list of the GraphQL profile viewers feed.
pub const VIEWER_ELEMENTS_PATHS: &[&str] = &[
    "/data/data/premiumDashAnalyticsObjectByAnalyticsEntity/elements",
    "/data/premiumDashAnalyticsObjectByAnalyticsEntity/elements",
    "/data",
];

/// Element list of relation and search listings.
pub const ITEMS_PATHS: &[&str] = &["/items"];

/// Legacy viewer id used for hidden viewers.
const ANONYMOUS_ID: &str = "Anonyme";

/// Why an element was not turned into a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejected {
    /// Not a person element (promotional slot, company page, bad shape).
    NotAProfile,
    /// Semi-anonymous viewer whose link points at a search page.
    SearchRedirect,
    /// Hidden viewer without identifier.
    Anonymous,
    /// A person element without natural-key material; worth reporting.
    /// Carries the best display label available.
    MissingIdentifier(String),
}

impl Rejected {
    /// Whether this rejection should be recorded as a run error.
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        matches!(self, Self::MissingIdentifier(_))
    }
}

/// Result of normalizing one page.
#[derive(Debug, Default)]
pub struct NormalizedPage {
    /// Views in vendor order.
    pub views: Vec<NormalizedView>,
    /// Rejected elements, paired with their index on the page.
    pub rejected: Vec<(usize, Rejected)>,
}

/// Returns the first non-empty value produced by `extractors`, in order.
#[must_use]
pub fn first_of(value: &Value, extractors: &[Extractor]) -> Option<String> {
    extractors.iter().find_map(|extract| {
        extract(value)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// String at a JSON pointer, if it is a non-empty string.
#[must_use]
pub fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Locates the element list of a response body.
///
/// The first pointer that resolves wins: an array yields its elements and
/// an explicit `null` yields an empty page.
///
/// # Errors
///
/// Returns [`SyncError::MalformedResponse`] when no pointer resolves or
/// the resolved value is neither an array nor `null`.
pub fn locate_items(body: &Value, pointers: &[&str]) -> Result<Vec<Value>, SyncError> {
    for pointer in pointers {
        match body.pointer(pointer) {
            Some(Value::Array(items)) => return Ok(items.clone()),
            Some(Value::Null) => return Ok(Vec::new()),
            Some(_) => {
                return Err(SyncError::MalformedResponse(format!(
                    "{pointer} is not a list"
                )));
            }
            None => {}
        }
    }
    Err(SyncError::MalformedResponse(format!(
        "no element list at {}",
        pointers.join(" | ")
    )))
}

/// Normalizes every element of `page`, keeping vendor order.
#[must_use]
pub fn normalize_page(
    page: &RawPage,
    normalize: ElementNormalizer,
    now: DateTime<Utc>,
) -> NormalizedPage {
    let mut out = NormalizedPage::default();
    for (idx, element) in page.items.iter().enumerate() {
        match normalize(element, now) {
            Ok(view) => out.views.push(view),
            Err(rejected) => {
                tracing::debug!(page = page.index, element = idx, ?rejected, "element skipped");
                out.rejected.push((idx, rejected));
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Profile viewers
// ---------------------------------------------------------------------------

type ViewerShape = fn(&Value, DateTime<Utc>) -> Option<Result<NormalizedView, Rejected>>;

/// Known viewer element shapes, newest first.
const VIEWER_SHAPES: &[ViewerShape] = &[lockup_viewer, legacy_viewer];

/// Normalizes one profile-viewer element.
///
/// # Errors
///
/// Rejects promotional slots, search-redirect viewers, non-profile links
/// and anonymous viewers.
pub fn profile_viewer(element: &Value, now: DateTime<Utc>) -> Result<NormalizedView, Rejected> {
    VIEWER_SHAPES
        .iter()
        .find_map(|shape| shape(element, now))
        .unwrap_or(Err(Rejected::NotAProfile))
}

/// `content.analyticsEntityLockup.entityLockup` (GraphQL analytics feed).
fn lockup_viewer(element: &Value, now: DateTime<Utc>) -> Option<Result<NormalizedView, Rejected>> {
    let lockup = element.pointer("/content/analyticsEntityLockup/entityLockup")?;
    Some(viewer_from_lockup(lockup, now))
}

fn viewer_from_lockup(lockup: &Value, now: DateTime<Utc>) -> Result<NormalizedView, Rejected> {
    let url = str_at(lockup, "/navigationUrl").ok_or(Rejected::NotAProfile)?;
    if url.contains("/search/") {
        return Err(Rejected::SearchRedirect);
    }
    if !url.contains("/in/") {
        return Err(Rejected::NotAProfile);
    }
    let slug = profile_slug(&url).ok_or(Rejected::Anonymous)?;

    let mut view = NormalizedView::new(ViewKind::ProfileView, slug);
    view.subject_url = Some(profile_url(slug));
    view.subject_name = str_at(lockup, "/title/text");
    view.subject_headline = str_at(lockup, "/subtitle/text");
    if let Some(caption) = str_at(lockup, "/caption/text") {
        apply_recency(&mut view, parse_recency(&caption), now);
    }
    Ok(view)
}

/// `{profile: {id, full_name, url, headline}, last_viewed_time}`.
fn legacy_viewer(element: &Value, now: DateTime<Utc>) -> Option<Result<NormalizedView, Rejected>> {
    let profile = element.get("profile").filter(|p| p.is_object())?;

    let Some(id) = str_at(profile, "/id").filter(|id| id != ANONYMOUS_ID) else {
        return Some(Err(Rejected::Anonymous));
    };
    let mut view = NormalizedView::new(ViewKind::ProfileView, id);
    view.subject_url = str_at(profile, "/url");
    view.subject_name = str_at(profile, "/full_name");
    view.subject_headline = str_at(profile, "/headline");

    let recency = str_at(element, "/last_viewed_time")
        .and_then(|text| parse_recency(&text))
        .or_else(|| {
            element
                .get("viewed_at")
                .or_else(|| element.get("viewedAt"))
                .and_then(Value::as_i64)
                .and_then(|ms| age_hours_from_epoch_ms(ms, now))
                .map(|hours| Recency {
                    hours,
                    relative_text: relative_text(hours),
                })
        });
    apply_recency(&mut view, recency, now);
    Some(Ok(view))
}

fn apply_recency(view: &mut NormalizedView, recency: Option<Recency>, now: DateTime<Utc>) {
    if let Some(recency) = recency {
        view.calculated_date = calculated_date(recency.hours, now);
        view.age_hours = Some(recency.hours);
        view.relative_text = Some(recency.relative_text);
    }
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// Normalizes one 1st-degree relation.
///
/// The natural key is the public profile URL without trailing `/`.
/// `created_at` (epoch ms) becomes both the age and the connection day.
///
/// # Errors
///
/// Returns [`Rejected::MissingIdentifier`] when the relation has no
/// public profile URL.
pub fn relation(element: &Value, now: DateTime<Utc>) -> Result<NormalizedView, Rejected> {
    let name = display_name(element);
    let url = str_at(element, "/public_profile_url")
        .map(|u| u.trim_end_matches('/').to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Rejected::MissingIdentifier(name.clone().unwrap_or_default()))?;

    let mut view = NormalizedView::new(ViewKind::Connection, url.clone());
    view.subject_url = Some(url);
    view.subject_name = name;
    view.subject_headline = str_at(element, "/headline");
    view.member_urn = str_at(element, "/member_id");
    if let Some(ms) = element.get("created_at").and_then(Value::as_i64) {
        view.age_hours = age_hours_from_epoch_ms(ms, now);
        view.relative_text = view.age_hours.map(relative_text);
        view.calculated_date = date_from_epoch_ms(ms);
    }
    Ok(view)
}

// ---------------------------------------------------------------------------
// Saved-search results
// ---------------------------------------------------------------------------

/// Where a search result's identifier may live, in priority order.
pub const SEARCH_IDENTIFIER: &[Extractor] = &[
    |v| str_at(v, "/public_identifier"),
    |v| str_at(v, "/public_profile_url").and_then(|u| profile_slug(&u).map(str::to_string)),
];

/// Normalizes one saved-search result.
///
/// # Errors
///
/// Returns [`Rejected::MissingIdentifier`] when neither a public
/// identifier nor a profile slug is present.
pub fn search_result(element: &Value, _now: DateTime<Utc>) -> Result<NormalizedView, Rejected> {
    let name = display_name(element);
    let id = first_of(element, SEARCH_IDENTIFIER)
        .ok_or_else(|| Rejected::MissingIdentifier(name.clone().unwrap_or_default()))?;

    let mut view = NormalizedView::new(ViewKind::Contact, id.clone());
    view.subject_url =
        str_at(element, "/public_profile_url").or_else(|| Some(profile_url(&id)));
    view.subject_name = name;
    view.subject_headline = str_at(element, "/headline");
    Ok(view)
}

fn display_name(element: &Value) -> Option<String> {
    let first = str_at(element, "/first_name").unwrap_or_default();
    let last = str_at(element, "/last_name").unwrap_or_default();
    let full = format!("{first} {last}").trim().to_string();
    (!full.is_empty()).then_some(full)
}
