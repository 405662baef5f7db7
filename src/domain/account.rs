//! Team accounts whose scraping-proxy sessions are used for a run.

use serde::{Deserialize, Serialize};

/// Base URL for canonical LinkedIn member profiles.
pub const PROFILE_URL_PREFIX: &str = "https://www.linkedin.com/in/";

/// A team member account connected to the scraping proxy.
///
/// Loaded once per run from the `workspace_team` table and read-only
/// for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccount {
    /// Internal row id in `workspace_team`.
    pub id: String,
    /// Session identifier on the scraping proxy.
    pub account_id: String,
    /// Public profile URL of the team member owning the session.
    pub owner_url: String,
}

impl ExternalAccount {
    /// Short display name: the profile slug when the owner URL has one.
    #[must_use]
    pub fn label(&self) -> &str {
        profile_slug(&self.owner_url).unwrap_or(&self.owner_url)
    }

    /// Whether the owner URL points at a LinkedIn profile at all.
    #[must_use]
    pub fn has_linkedin_owner(&self) -> bool {
        self.owner_url.contains("linkedin.com")
    }
}

/// Extracts the member slug from a `/in/{slug}` profile URL.
///
/// Stops at the first `/`, `?` or `#` after the slug.
#[must_use]
pub fn profile_slug(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("/in/")?;
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let slug = rest.get(..end)?;
    (!slug.is_empty()).then_some(slug)
}

/// Builds the canonical profile URL for a slug or opaque member id.
#[must_use]
pub fn profile_url(slug: &str) -> String {
    format!("{PROFILE_URL_PREFIX}{slug}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(owner_url: &str) -> ExternalAccount {
        ExternalAccount {
            id: "1".to_string(),
            account_id: "acc-1".to_string(),
            owner_url: owner_url.to_string(),
        }
    }

    #[test]
    fn slug_extraction_stops_at_separators() {
        assert_eq!(
            profile_slug("https://www.linkedin.com/in/jane-doe/"),
            Some("jane-doe")
        );
        assert_eq!(
            profile_slug("https://www.linkedin.com/in/ACoAAB123?miniProfileUrn=x"),
            Some("ACoAAB123")
        );
        assert_eq!(profile_slug("https://www.linkedin.com/company/acme"), None);
        assert_eq!(profile_slug("https://www.linkedin.com/in/"), None);
    }

    #[test]
    fn label_prefers_slug() {
        assert_eq!(account("https://www.linkedin.com/in/jane").label(), "jane");
        assert_eq!(account("jane@example.com").label(), "jane@example.com");
    }

    #[test]
    fn linkedin_owner_check() {
        assert!(account("https://www.linkedin.com/in/jane").has_linkedin_owner());
        assert!(!account("https://example.com/jane").has_linkedin_owner());
    }
}
