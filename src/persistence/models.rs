//! Database rows and the table specs that describe their natural keys.
//!
//! Every row type is written through [`TableRow::TABLE`]. A table's
//! `conflict_key` is both the `ON CONFLICT` target and the natural key used
//! for dedup bookkeeping, so the two can never drift apart.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between natural-key parts.
const KEY_SEPARATOR: char = '\u{1f}';

/// Static description of an upsert target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Table name.
    pub name: &'static str,
    /// Columns written on insert and refreshed on conflict.
    pub columns: &'static [&'static str],
    /// Composite natural key, backed by a unique constraint.
    pub conflict_key: &'static [&'static str],
    /// Key columns that must be non-empty for a row to be writable.
    /// Other key columns may be null (`NULLS NOT DISTINCT`).
    pub required: &'static [&'static str],
}

impl TableSpec {
    /// Natural key of a serialized row, or `None` when a required key
    /// column is missing or empty.
    #[must_use]
    pub fn key_of(&self, row: &Value) -> Option<String> {
        let mut parts = Vec::with_capacity(self.conflict_key.len());
        for column in self.conflict_key {
            let text = match row.get(column) {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            if text.is_empty() && self.required.contains(column) {
                return None;
            }
            parts.push(text);
        }
        Some(parts.join(&KEY_SEPARATOR.to_string()))
    }

    /// Columns refreshed on conflict: everything outside the key.
    pub fn update_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns
            .iter()
            .copied()
            .filter(|c| !self.conflict_key.contains(c))
    }
}

/// A row type bound to its table.
pub trait TableRow: Serialize {
    /// Target table.
    const TABLE: TableSpec;
}

/// `scrapped_visit`: one profile view, per viewer, owner and day.
pub const SCRAPPED_VISIT: TableSpec = TableSpec {
    name: "scrapped_visit",
    columns: &[
        "type_reaction",
        "profil_linkedin_url_reaction",
        "profil_fullname",
        "headline",
        "linkedin_url_profil_visited",
        "date_scrapped",
        "date_scrapped_calculated",
    ],
    conflict_key: &[
        "profil_linkedin_url_reaction",
        "linkedin_url_profil_visited",
        "date_scrapped_calculated",
    ],
    required: &["profil_linkedin_url_reaction", "linkedin_url_profil_visited"],
};

/// `scrapped_connection`: one 1st-degree connection per owner.
pub const SCRAPPED_CONNECTION: TableSpec = TableSpec {
    name: "scrapped_connection",
    columns: &[
        "type_reaction",
        "profil_linkedin_url_connection",
        "profil_fullname",
        "linkedin_url_owner_post",
        "headline",
        "created_at",
        "connected_at",
        "contact_urn",
    ],
    conflict_key: &["profil_linkedin_url_connection", "linkedin_url_owner_post"],
    required: &["profil_linkedin_url_connection", "linkedin_url_owner_post"],
};

/// `scrapped_strategic_connection_concurrent`: one profile per competitor search.
pub const STRATEGIC_CONNECTION: TableSpec = TableSpec {
    name: "scrapped_strategic_connection_concurrent",
    columns: &[
        "scraping_date",
        "sales_nav_source",
        "sales_nav_description",
        "linkedin_private_url",
        "first_name",
        "last_name",
        "full_name",
        "linkedin_headline",
        "linkedin_job_title",
        "company_linkedin_private_url",
        "company_name",
        "location",
        "linkedin_profile_picture_url",
        "linkedin_profile_url",
        "country",
        "linkedin_private_id",
        "connected_with",
        "job_strategic_role",
    ],
    conflict_key: &["linkedin_private_id", "sales_nav_description"],
    required: &["linkedin_private_id", "sales_nav_description"],
};

/// `new_scrapp_strategic_people_salesnav`: one profile per saved search.
pub const STRATEGIC_PEOPLE: TableSpec = TableSpec {
    name: "new_scrapp_strategic_people_salesnav",
    columns: &[
        "linkedin_private_url",
        "linkedin_profile_url",
        "scraping_date",
        "saved_search_id",
        "saved_search_name",
    ],
    conflict_key: &["linkedin_private_url", "saved_search_name"],
    required: &["linkedin_private_url", "saved_search_name"],
};

/// All upsert targets.
pub const ALL_TABLES: [TableSpec; 4] = [
    SCRAPPED_VISIT,
    SCRAPPED_CONNECTION,
    STRATEGIC_CONNECTION,
    STRATEGIC_PEOPLE,
];

/// A profile view row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRow {
    /// Always `visit_profil`.
    pub type_reaction: String,
    /// Viewer profile URL (canonical when enrichment succeeded).
    pub profil_linkedin_url_reaction: String,
    /// Viewer name.
    pub profil_fullname: String,
    /// Viewer headline.
    pub headline: String,
    /// Profile URL of the team member who was viewed.
    pub linkedin_url_profil_visited: String,
    /// Normalized relative age at scrape time (e.g. `"5 hours"`).
    pub date_scrapped: String,
    /// Day of the view; null when the age could not be parsed.
    pub date_scrapped_calculated: Option<NaiveDate>,
}

impl TableRow for VisitRow {
    const TABLE: TableSpec = SCRAPPED_VISIT;
}

/// A 1st-degree connection row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRow {
    /// Always `connection`.
    pub type_reaction: String,
    /// Connection profile URL without trailing slash.
    pub profil_linkedin_url_connection: String,
    /// Connection name.
    pub profil_fullname: Option<String>,
    /// Team member owning the connection.
    pub linkedin_url_owner_post: String,
    /// Connection headline.
    pub headline: Option<String>,
    /// Scraping day.
    pub created_at: NaiveDate,
    /// Day the connection was made.
    pub connected_at: Option<NaiveDate>,
    /// Vendor member id.
    pub contact_urn: Option<String>,
}

impl TableRow for ConnectionRow {
    const TABLE: TableSpec = SCRAPPED_CONNECTION;
}

/// A profile found through a competitor's saved search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicConnectionRow {
    /// Scraping day.
    pub scraping_date: NaiveDate,
    /// Search key.
    pub sales_nav_source: String,
    /// Search description; part of the natural key.
    pub sales_nav_description: String,
    /// Private profile URL.
    pub linkedin_private_url: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Full name.
    pub full_name: Option<String>,
    /// Headline.
    pub linkedin_headline: Option<String>,
    /// Current job title.
    pub linkedin_job_title: Option<String>,
    /// Company private URL.
    pub company_linkedin_private_url: Option<String>,
    /// Company name.
    pub company_name: Option<String>,
    /// Location.
    pub location: Option<String>,
    /// Picture URL.
    pub linkedin_profile_picture_url: Option<String>,
    /// Public profile URL.
    pub linkedin_profile_url: String,
    /// Country.
    pub country: Option<String>,
    /// Private member id; part of the natural key.
    pub linkedin_private_id: String,
    /// JSON-encoded list of shared connections, or null.
    pub connected_with: Option<String>,
    /// Strategic role classification.
    pub job_strategic_role: Option<String>,
}

impl TableRow for StrategicConnectionRow {
    const TABLE: TableSpec = STRATEGIC_CONNECTION;
}

/// A profile found through one of our saved searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategicPersonRow {
    /// Private profile URL, or the public identifier when unknown.
    pub linkedin_private_url: String,
    /// Public profile URL.
    pub linkedin_profile_url: String,
    /// Scraping day.
    pub scraping_date: NaiveDate,
    /// Vendor saved search id.
    pub saved_search_id: String,
    /// Saved search name; part of the natural key.
    pub saved_search_name: String,
}

impl TableRow for StrategicPersonRow {
    const TABLE: TableSpec = STRATEGIC_PEOPLE;
}

/// An `enriched_contacts` cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentEntry {
    /// Opaque profile URL as first seen.
    pub original_url: String,
    /// Canonical profile URL.
    pub enriched_url: String,
    /// Raw resolver payload.
    pub profile_data: Value,
}
