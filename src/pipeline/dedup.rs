//! In-run duplicate collapsing and recency/storage filters.

use std::collections::{HashMap, HashSet};

use crate::domain::NormalizedView;

/// Recency window for profile views, in hours.
pub const PROFILE_VIEW_WINDOW_HOURS: f64 = 24.0;

/// `lastViewedAt` window applied to saved searches, in hours.
pub const SEARCH_WINDOW_HOURS: i64 = 72;

/// Collapses views sharing a `subject_id`, keeping the most recent one.
///
/// Output follows the order in which each subject was first seen. On a
/// recency tie the first occurrence wins.
#[must_use]
pub fn dedupe_most_recent(views: Vec<NormalizedView>) -> Vec<NormalizedView> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(views.len());
    let mut out: Vec<NormalizedView> = Vec::with_capacity(views.len());

    for view in views {
        match index.get(&view.subject_id) {
            Some(&pos) => {
                if let Some(kept) = out.get_mut(pos) {
                    if view.is_more_recent_than(kept) {
                        *kept = view;
                    }
                }
            }
            None => {
                index.insert(view.subject_id.clone(), out.len());
                out.push(view);
            }
        }
    }
    out
}

/// Keeps views aged at most `window_hours` (boundary inclusive).
///
/// Views without a recency signal are kept: their age is unknown, not old.
/// Returns the kept views and the number dropped.
#[must_use]
pub fn retain_within(views: Vec<NormalizedView>, window_hours: f64) -> (Vec<NormalizedView>, usize) {
    let before = views.len();
    let kept: Vec<_> = views
        .into_iter()
        .filter(|v| v.age_hours.is_none_or(|age| age <= window_hours))
        .collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

/// Whether at least one view has a known age within `window_hours`.
///
/// Used as the "no more relevant items" stop predicate on recency-ordered
/// feeds.
#[must_use]
pub fn has_recent(views: &[NormalizedView], window_hours: f64) -> bool {
    views
        .iter()
        .any(|v| v.age_hours.is_some_and(|age| age <= window_hours))
}

/// Splits views into (new, already stored) by membership of their
/// `subject_id` in `known`.
#[must_use]
pub fn partition_known(
    views: Vec<NormalizedView>,
    known: &HashSet<String>,
) -> (Vec<NormalizedView>, Vec<NormalizedView>) {
    views
        .into_iter()
        .partition(|v| !known.contains(&v.subject_id))
}
