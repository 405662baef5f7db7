//! Recency signals: relative-age text to hours, hours to calendar days.
//!
//! Vendors only report how long ago something happened ("5 hours",
//! "2 jours", "Viewed 3h ago"), so the absolute day is always derived
//! from the processing time, truncated to day granularity.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Unit of a relative-age token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    /// `m`, `min`, `minute(s)`.
    Minute,
    /// `h`, `hr`, `hour(s)`, `heure(s)`.
    Hour,
    /// `d`, `day(s)`, `j`, `jour(s)`.
    Day,
    /// `w`, `wk`, `week(s)`, `sem`, `semaine(s)`.
    Week,
    /// `mo`, `month(s)`, `mois`. A month counts as 30 days.
    Month,
}

impl TimeUnit {
    fn from_token(token: &str) -> Option<Self> {
        let unit = match token {
            "m" | "mn" | "min" | "mins" | "minute" | "minutes" => Self::Minute,
            "h" | "hr" | "hrs" | "hour" | "hours" | "heure" | "heures" => Self::Hour,
            "d" | "day" | "days" | "j" | "jour" | "jours" => Self::Day,
            "w" | "wk" | "wks" | "week" | "weeks" | "sem" | "semaine" | "semaines" => Self::Week,
            "mo" | "mos" | "month" | "months" | "mois" => Self::Month,
            _ => return None,
        };
        Some(unit)
    }

    fn to_hours(self, amount: u32) -> f64 {
        let amount = f64::from(amount);
        match self {
            Self::Minute => amount / 60.0,
            Self::Hour => amount,
            Self::Day => amount * 24.0,
            Self::Week => amount * 24.0 * 7.0,
            Self::Month => amount * 24.0 * 30.0,
        }
    }

    const fn plural(self) -> &'static str {
        match self {
            Self::Minute => "minutes",
            Self::Hour => "hours",
            Self::Day => "days",
            Self::Week => "weeks",
            Self::Month => "months",
        }
    }
}

/// A parsed recency signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Recency {
    /// Age in hours.
    pub hours: f64,
    /// Normalized English rendering, e.g. `"5 hours"`.
    pub relative_text: String,
}

/// Parses a free-text relative age into hours.
///
/// Returns `None` when no `<number><unit>` pair with a known unit is found.
#[must_use]
pub fn parse_to_hours(text: &str) -> Option<f64> {
    parse_recency(text).map(|r| r.hours)
}

/// Parses a free-text relative age, keeping a normalized text form.
///
/// The first number followed by a recognized unit wins, so captions like
/// `"Viewed 3h ago"` and `"il y a 2 jours"` both parse.
#[must_use]
pub fn parse_recency(text: &str) -> Option<Recency> {
    let lower = text.to_lowercase();
    let mut rest = lower.as_str();

    while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
        let tail = rest.get(start..)?;
        let digits_end = tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len());
        let amount: u32 = tail.get(..digits_end)?.parse().ok()?;

        let after = tail.get(digits_end..)?.trim_start();
        let unit_end = after
            .find(|c: char| !c.is_alphabetic())
            .unwrap_or(after.len());
        let token = after.get(..unit_end)?;

        if let Some(unit) = TimeUnit::from_token(token) {
            return Some(Recency {
                hours: unit.to_hours(amount),
                relative_text: format!("{amount} {}", unit.plural()),
            });
        }
        rest = after.get(unit_end..)?;
    }

    None
}

/// Calendar day `age_hours` before `now`.
#[must_use]
pub fn calculated_date(age_hours: f64, now: DateTime<Utc>) -> Option<NaiveDate> {
    if !age_hours.is_finite() || age_hours < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = (age_hours * 3_600_000.0).round() as i64;
    let then = now.checked_sub_signed(Duration::try_milliseconds(millis)?)?;
    Some(then.date_naive())
}

/// Age in hours of an epoch-millisecond timestamp relative to `now`.
#[must_use]
pub fn age_hours_from_epoch_ms(epoch_ms: i64, now: DateTime<Utc>) -> Option<f64> {
    let then = DateTime::<Utc>::from_timestamp_millis(epoch_ms)?;
    #[allow(clippy::cast_precision_loss)]
    let hours = (now - then).num_milliseconds() as f64 / 3_600_000.0;
    Some(hours.max(0.0))
}

/// Calendar day of an epoch-millisecond timestamp.
#[must_use]
pub fn date_from_epoch_ms(epoch_ms: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms).map(|dt| dt.date_naive())
}

/// Renders an age as `"N hours"` or, under one hour, `"N minutes"`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn relative_text(age_hours: f64) -> String {
    if age_hours >= 1.0 {
        format!("{} hours", age_hours.floor() as u64)
    } else {
        format!("{} minutes", (age_hours.max(0.0) * 60.0).floor() as u64)
    }
}
