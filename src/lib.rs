//! # outreach-sync
//!
//! Scheduled jobs that collect LinkedIn activity through a scraping proxy
//! and sync it into PostgreSQL: who viewed each team member's profile, new
//! 1st-degree connections, and recently active profiles from Sales
//! Navigator saved searches.
//!
//! Every job is the same pipeline over different targets: paginate a
//! vendor listing under rate limits, normalize heterogeneous payloads,
//! drop duplicates, resolve opaque profile URLs, then upsert on natural
//! keys so reruns never duplicate rows. Failures are isolated per target
//! and summarized into one alert per run.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler (HTTP trigger or RUN_ONCE)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── JobService (service/)
//!     │
//!     ├── Jobs (jobs/)
//!     │     └── Orchestrator → Paginator → Normalizer → Dedup
//!     │                      → EnrichmentCache → UpsertSink (pipeline/)
//!     │
//!     ├── Scraping proxy + enrichment clients (client/)
//!     ├── Slack alerts (notify/)
//!     │
//!     └── PostgreSQL Persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod jobs;
pub mod notify;
pub mod persistence;
pub mod pipeline;
pub mod service;
