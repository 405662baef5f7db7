//! Look-aside cache from opaque profile URLs to canonical ones.
//!
//! Only `/in/ACo…` member-id URLs are eligible. A hit in
//! `enriched_contacts` short-circuits the resolver; a miss costs one
//! paced resolver call and, on success, one cache write. Nothing here
//! ever fails the caller: every error degrades to keeping the original
//! URL.

use std::time::Duration;

use serde_json::Value;

use super::normalize::{Extractor, first_of, str_at};
use super::pacing::Pacer;
use super::retry::RetryPolicy;
use crate::client::LinkedInSource;
use crate::domain::ErrorRecord;
use crate::domain::account::{profile_slug, profile_url};
use crate::error::ErrorCategory;
use crate::persistence::{EnrichmentEntry, SyncStore};

/// Prefix of opaque member ids in `/in/` URLs.
const OPAQUE_ID_PREFIX: &str = "ACo";

/// Where the canonical URL may live in a resolver payload, in priority order.
pub const CANONICAL_URL: &[Extractor] = &[
    |v| str_at(v, "/data/url"),
    |v| str_at(v, "/url"),
    |v| str_at(v, "/public_identifier").map(|id| profile_url(&id)),
    |v| str_at(v, "/data/public_identifier").map(|id| profile_url(&id)),
    |v| str_at(v, "/public_profile_url"),
];

/// Outcome of [`EnrichmentCache::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Not an opaque URL; used as is.
    NotEligible,
    /// Canonical URL found in the cache.
    Cached(String),
    /// Canonical URL obtained from the resolver and written to the cache.
    Resolved(String),
    /// Kept the original URL. `error` is set when a call failed.
    Unresolved {
        /// Failure worth recording, if any.
        error: Option<ErrorRecord>,
    },
}

impl Resolution {
    /// Canonical URL, when one was found.
    #[must_use]
    pub fn canonical(&self) -> Option<&str> {
        match self {
            Self::Cached(url) | Self::Resolved(url) => Some(url),
            Self::NotEligible | Self::Unresolved { .. } => None,
        }
    }
}

/// Whether `url` is an opaque member-id profile URL.
#[must_use]
pub fn is_opaque(url: &str) -> bool {
    profile_slug(url).is_some_and(|slug| slug.starts_with(OPAQUE_ID_PREFIX))
}

/// Enrichment cache bound to one store and resolver.
#[derive(Debug)]
pub struct EnrichmentCache<'a> {
    store: &'a dyn SyncStore,
    resolver: &'a dyn LinkedInSource,
    pacer: &'a dyn Pacer,
    per_call: Duration,
    retry: RetryPolicy,
}

impl<'a> EnrichmentCache<'a> {
    /// Creates a cache. `per_call` is paused after every resolver call.
    #[must_use]
    pub const fn new(
        store: &'a dyn SyncStore,
        resolver: &'a dyn LinkedInSource,
        pacer: &'a dyn Pacer,
        per_call: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            resolver,
            pacer,
            per_call,
            retry,
        }
    }

    /// Resolves `original_url` using the proxy session `account_id`.
    ///
    /// `hits` accumulates 429 responses for the run summary.
    pub async fn resolve(&self, original_url: &str, account_id: &str, hits: &mut u32) -> Resolution {
        if !is_opaque(original_url) {
            return Resolution::NotEligible;
        }
        let Some(member_id) = profile_slug(original_url) else {
            return Resolution::NotEligible;
        };

        match self.store.cached_enrichment(original_url).await {
            Ok(Some(canonical)) => {
                tracing::debug!(original_url, canonical = %canonical, "enrichment cache hit");
                return Resolution::Cached(canonical);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(original_url, error = %err, "enrichment cache read failed");
            }
        }

        let label = format!("resolve {member_id}");
        let resolver = self.resolver;
        let looked_up = self
            .retry
            .run(self.pacer, &label, hits, move || {
                resolver.get_user(account_id, member_id)
            })
            .await;
        self.pacer.pause(self.per_call, "enrichment").await;

        let payload = match looked_up {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::info!(original_url, "profile not found, keeping original");
                return Resolution::Unresolved { error: None };
            }
            Err(err) => {
                tracing::warn!(original_url, error = %err, "resolver failed, keeping original");
                return Resolution::Unresolved {
                    error: Some(ErrorRecord::new(
                        ErrorCategory::EnrichmentFailed,
                        err.code(),
                        err.to_string(),
                        original_url,
                    )),
                };
            }
        };

        let Some(canonical) = first_of(&payload, CANONICAL_URL) else {
            return Resolution::Unresolved {
                error: Some(ErrorRecord::new(
                    ErrorCategory::EnrichmentFailed,
                    "no_url",
                    "resolver payload has no profile URL",
                    original_url,
                )),
            };
        };
        if canonical == original_url {
            return Resolution::Unresolved { error: None };
        }

        self.write_through(original_url, &canonical, payload).await;
        Resolution::Resolved(canonical)
    }

    async fn write_through(&self, original_url: &str, canonical: &str, payload: Value) {
        let entry = EnrichmentEntry {
            original_url: original_url.to_string(),
            enriched_url: canonical.to_string(),
            profile_data: payload,
        };
        if let Err(err) = self.store.save_enrichment(&entry).await {
            tracing::warn!(original_url, error = %err, "enrichment cache write failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::mock::{MockLinkedIn, Reply};
    use crate::config::PacingConfig;
    use crate::persistence::memory::MemoryStore;
    use crate::pipeline::pacing::RecordingPacer;

    const OPAQUE: &str = "https://www.linkedin.com/in/ACoAAB12xyz";

    fn retry() -> RetryPolicy {
        RetryPolicy::from_pacing(&PacingConfig::immediate())
    }

    async fn resolve(store: &MemoryStore, resolver: &MockLinkedIn, pacer: &RecordingPacer) -> Resolution {
        let cache = EnrichmentCache::new(store, resolver, pacer, Duration::from_millis(1500), retry());
        let mut hits = 0;
        cache.resolve(OPAQUE, "acc-1", &mut hits).await
    }

    #[test]
    fn only_member_id_urls_are_eligible() {
        assert!(is_opaque(OPAQUE));
        assert!(!is_opaque("https://www.linkedin.com/in/jane-doe"));
        assert!(!is_opaque("https://www.linkedin.com/company/ACoFake"));
    }

    #[test]
    fn canonical_url_extractors_follow_priority() {
        let payload = json!({
            "public_identifier": "from-identifier",
            "public_profile_url": "https://www.linkedin.com/in/from-profile-url",
        });
        assert_eq!(
            first_of(&payload, CANONICAL_URL).as_deref(),
            Some("https://www.linkedin.com/in/from-identifier")
        );
        let nested = json!({"data": {"url": "https://www.linkedin.com/in/nested"}, "url": "x"});
        assert_eq!(
            first_of(&nested, CANONICAL_URL).as_deref(),
            Some("https://www.linkedin.com/in/nested")
        );
    }

    #[tokio::test]
    async fn canonical_urls_pass_through_untouched() {
        let store = MemoryStore::new();
        let resolver = MockLinkedIn::new();
        let pacer = RecordingPacer::new();
        let cache = EnrichmentCache::new(&store, &resolver, &pacer, Duration::ZERO, retry());
        let mut hits = 0;
        let out = cache
            .resolve("https://www.linkedin.com/in/jane", "acc-1", &mut hits)
            .await;
        assert_eq!(out, Resolution::NotEligible);
        assert!(resolver.calls().is_empty());
        assert_eq!(store.cache_reads(), 0);
    }

    #[tokio::test]
    async fn cache_hit_never_calls_resolver() {
        let store = MemoryStore::new().with_cached(OPAQUE, "https://www.linkedin.com/in/jane");
        let resolver = MockLinkedIn::new();
        let pacer = RecordingPacer::new();
        let out = resolve(&store, &resolver, &pacer).await;
        assert_eq!(out, Resolution::Cached("https://www.linkedin.com/in/jane".to_string()));
        assert!(resolver.calls().is_empty());
        assert_eq!(store.cache_writes(), 0);
        assert!(pacer.pauses().is_empty());
    }

    #[tokio::test]
    async fn miss_resolves_once_and_writes_once() {
        let store = MemoryStore::new();
        let resolver = MockLinkedIn::new().with_user(
            "ACoAAB12xyz",
            Reply::Found(json!({"public_identifier": "jane-doe"})),
        );
        let pacer = RecordingPacer::new();
        let out = resolve(&store, &resolver, &pacer).await;
        assert_eq!(
            out,
            Resolution::Resolved("https://www.linkedin.com/in/jane-doe".to_string())
        );
        assert_eq!(resolver.count("get_user:"), 1);
        assert_eq!(store.cache_writes(), 1);
        let Some(entry) = store.cache_entry(OPAQUE) else {
            panic!("cache entry written");
        };
        assert_eq!(entry.enriched_url, "https://www.linkedin.com/in/jane-doe");
        assert_eq!(pacer.count("enrichment"), 1);

        // A second resolution in the same run is served by the cache.
        let again = resolve(&store, &resolver, &pacer).await;
        assert!(matches!(again, Resolution::Cached(_)));
        assert_eq!(resolver.count("get_user:"), 1);
    }

    #[tokio::test]
    async fn not_found_is_never_cached() {
        let store = MemoryStore::new();
        let resolver = MockLinkedIn::new().with_user("ACoAAB12xyz", Reply::NotFound);
        let pacer = RecordingPacer::new();
        for _ in 0..3 {
            let out = resolve(&store, &resolver, &pacer).await;
            assert_eq!(out, Resolution::Unresolved { error: None });
            assert_eq!(out.canonical(), None);
        }
        assert_eq!(resolver.count("get_user:"), 3);
        assert_eq!(store.cache_writes(), 0);
        assert!(store.cache_entry(OPAQUE).is_none());
        assert_eq!(pacer.count("enrichment"), 3);
    }

    #[tokio::test]
    async fn resolver_errors_degrade_with_a_record() {
        let store = MemoryStore::new();
        let resolver = MockLinkedIn::new().with_user("ACoAAB12xyz", Reply::Status(500));
        let pacer = RecordingPacer::new();
        let Resolution::Unresolved { error: Some(record) } = resolve(&store, &resolver, &pacer).await
        else {
            panic!("expected degraded resolution");
        };
        assert_eq!(record.category, ErrorCategory::EnrichmentFailed);
        assert_eq!(record.code, "500");
        assert_eq!(record.subject, OPAQUE);
        assert_eq!(store.cache_writes(), 0);
    }

    #[tokio::test]
    async fn rate_limited_resolver_is_retried_then_degrades() {
        let store = MemoryStore::new();
        let resolver = MockLinkedIn::new().with_user("ACoAAB12xyz", Reply::Status(429));
        let pacer = RecordingPacer::new();
        let cache = EnrichmentCache::new(&store, &resolver, &pacer, Duration::ZERO, retry());
        let mut hits = 0;
        let out = cache.resolve(OPAQUE, "acc-1", &mut hits).await;
        let Resolution::Unresolved { error: Some(record) } = out else {
            panic!("expected degraded resolution");
        };
        assert_eq!(record.code, "429");
        assert_eq!(hits, 3);
        assert_eq!(resolver.count("get_user:"), 3);
        assert_eq!(pacer.count("enrichment"), 1);
    }

    #[tokio::test]
    async fn unreachable_cache_still_resolves() {
        let store = MemoryStore::new().unreachable();
        let resolver = MockLinkedIn::new().with_user(
            "ACoAAB12xyz",
            Reply::Found(json!({"public_profile_url": "https://www.linkedin.com/in/jane"})),
        );
        let pacer = RecordingPacer::new();
        let out = resolve(&store, &resolver, &pacer).await;
        assert_eq!(out.canonical(), Some("https://www.linkedin.com/in/jane"));
    }
}
