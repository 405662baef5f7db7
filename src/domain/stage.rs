//! Per-account processing state machine.
//!
//! ```text
//! Idle → Fetching → Normalizing → Deduplicating → Enriching → Persisting → Done
//!                                                                 │
//!                                                                 └→ Fetching (next page)
//! any non-terminal stage → Failed
//! ```

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

/// Where an account currently is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccountStage {
    /// Not started.
    Idle,
    /// Pulling pages from the scrape source.
    Fetching,
    /// Converting vendor elements into normalized views.
    Normalizing,
    /// Collapsing duplicates and applying window/storage filters.
    Deduplicating,
    /// Resolving opaque identifiers or calling the enrichment endpoint.
    Enriching,
    /// Writing rows to the backing store.
    Persisting,
    /// Completed (possibly with recorded per-item errors).
    Done,
    /// Aborted on an unrecoverable error.
    Failed,
}

impl AccountStage {
    /// Whether the account has reached a terminal stage.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Fetching)
                | (Self::Fetching, Self::Normalizing)
                | (Self::Normalizing, Self::Deduplicating)
                | (Self::Deduplicating, Self::Enriching)
                | (Self::Enriching, Self::Persisting)
                | (Self::Persisting, Self::Fetching | Self::Done)
                | (
                    Self::Idle
                        | Self::Fetching
                        | Self::Normalizing
                        | Self::Deduplicating
                        | Self::Enriching
                        | Self::Persisting,
                    Self::Failed
                )
        )
    }

    const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Normalizing => "normalizing",
            Self::Deduplicating => "deduplicating",
            Self::Enriching => "enriching",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AccountStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks one account's stage and rejects out-of-order transitions.
#[derive(Debug, Clone)]
pub struct StageTracker {
    label: String,
    stage: AccountStage,
}

impl StageTracker {
    /// Starts a tracker in [`AccountStage::Idle`].
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            stage: AccountStage::Idle,
        }
    }

    /// Current stage.
    #[must_use]
    pub const fn stage(&self) -> AccountStage {
        self.stage
    }

    /// Moves to `next`.
    ///
    /// Illegal transitions are logged and ignored so a pipeline bug never
    /// aborts a run; tests assert on [`Self::stage`] instead.
    pub fn advance(&mut self, next: AccountStage) {
        if self.stage.can_advance_to(next) {
            tracing::debug!(account = %self.label, from = %self.stage, to = %next, "stage");
            self.stage = next;
        } else {
            tracing::warn!(
                account = %self.label,
                from = %self.stage,
                to = %next,
                "ignoring illegal stage transition"
            );
        }
    }

    /// Walks through the remaining stages of one pass up to `Persisting`.
    pub fn advance_through(&mut self, target: AccountStage) {
        const ORDER: [AccountStage; 5] = [
            AccountStage::Fetching,
            AccountStage::Normalizing,
            AccountStage::Deduplicating,
            AccountStage::Enriching,
            AccountStage::Persisting,
        ];
        for stage in ORDER {
            if self.stage == target {
                break;
            }
            if self.stage.can_advance_to(stage) {
                self.advance(stage);
            }
        }
    }

    /// Marks the account done.
    pub fn finish(&mut self) {
        self.advance_through(AccountStage::Persisting);
        self.advance(AccountStage::Done);
    }

    /// Marks the account failed.
    pub fn fail(&mut self) {
        self.advance(AccountStage::Failed);
    }
}
