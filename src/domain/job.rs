//! Job identity.
//!
//! Every scheduled pipeline is addressed by a [`JobKind`]. The string form
//! is what the hosting scheduler passes on the trigger API and in
//! `RUN_ONCE`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SyncError;

/// One of the scraping pipelines this service knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Who viewed each team member's profile in the last 24 hours.
    ProfileViews,
    /// New 1st-degree connections of each team member.
    TeamConnections,
    /// Recently active profiles from competitor saved searches.
    StrategicConnections,
    /// Recently active profiles from our own saved searches.
    StrategicPeople,
}

impl JobKind {
    /// All jobs in registration order.
    pub const ALL: [Self; 4] = [
        Self::ProfileViews,
        Self::TeamConnections,
        Self::StrategicConnections,
        Self::StrategicPeople,
    ];

    /// Stable kebab-case name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ProfileViews => "profile-views",
            Self::TeamConnections => "team-connections",
            Self::StrategicConnections => "strategic-connections",
            Self::StrategicPeople => "strategic-people",
        }
    }

    /// Human label used in notifications.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ProfileViews => "Profile Views",
            Self::TeamConnections => "Team Connections",
            Self::StrategicConnections => "Strategic Connections",
            Self::StrategicPeople => "Strategic People SalesNav",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SyncError::JobNotFound(s.to_string()))
    }
}
