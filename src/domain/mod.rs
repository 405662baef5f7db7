//! Domain layer: accounts, observations, recency and run bookkeeping.
//!
//! This module contains the model shared by every pipeline: the external
//! accounts a run iterates over, the raw pages and normalized views it
//! produces, recency parsing, the per-account stage machine and the
//! counters that end up in a run summary.

pub mod account;
pub mod job;
pub mod recency;
pub mod run_id;
pub mod stage;
pub mod stats;
pub mod view;

pub use account::ExternalAccount;
pub use job::JobKind;
pub use run_id::RunId;
pub use stage::{AccountStage, StageTracker};
pub use stats::{ErrorRecord, RunStats, RunSummary, TargetReport};
pub use view::{Continuation, NormalizedView, RawPage, ViewKind};
