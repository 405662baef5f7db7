//! The collection pipeline shared by every scraping job.
//!
//! ```text
//! Orchestrator ─┬─ Paginator ── PageSource (vendor, paced, retried on 429)
//!               ├─ normalize ── vendor element → NormalizedView
//!               ├─ dedup ────── most recent per subject, windows, known keys
//!               ├─ EnrichmentCache ── opaque URL → canonical URL
//!               └─ UpsertSink ──── batch upsert, per-row fallback
//! ```

pub mod dedup;
pub mod enrichment;
pub mod normalize;
pub mod orchestrator;
pub mod pacing;
pub mod paginator;
pub mod retry;
pub mod upsert;

pub use enrichment::{EnrichmentCache, Resolution};
pub use orchestrator::{AccountPipeline, Orchestrator};
pub use pacing::{Clock, FixedClock, Pacer, RecordingPacer, SystemClock, TokioPacer};
pub use paginator::{PageLimits, PageSource, Paginator, SourcePage, StopReason};
pub use retry::RetryPolicy;
pub use upsert::{UpsertReport, UpsertSink};
