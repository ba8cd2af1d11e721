//! Canonical session records and the scrape task that groups them.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Cost, DataSource, Venue};

/// Court labels containing this (case-insensitively) are mini courts and
/// never reported.
pub const MINI_COURT_MARKER: &str = "mini";

/// Returns `true` if a court label denotes a mini court.
#[must_use]
pub fn is_mini_court(label: &str) -> bool {
    label.to_lowercase().contains(MINI_COURT_MARKER)
}

/// One bookable time interval at a venue.
///
/// Every extractor produces this shape, so nothing downstream of
/// extraction needs to know which website a session came from. Times are
/// local wall-clock times at the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourtSession {
    /// Venue the session belongs to, shared by all its sessions.
    pub venue: Arc<Venue>,
    /// Court or resource name; absent when the site does not expose one.
    pub label: Option<String>,
    /// Price of the interval.
    pub cost: Cost,
    /// Start of the interval.
    pub start_time: NaiveDateTime,
    /// End of the interval, always after `start_time`.
    pub end_time: NaiveDateTime,
    /// Booking page the session was found on.
    pub url: String,
}

impl CourtSession {
    /// Canonical name of the owning venue.
    #[must_use]
    pub fn venue_name(&self) -> &str {
        self.venue.name()
    }

    /// Booking backend the session came from.
    #[must_use]
    pub fn data_source(&self) -> DataSource {
        self.venue.data_source()
    }
}

impl fmt::Display for CourtSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.venue.name())?;
        if let Some(label) = &self.label {
            write!(f, " {label}")?;
        }
        write!(
            f,
            " at {} on {} (£{})",
            self.start_time.format("%H:%M"),
            self.start_time.format("%A %d %B"),
            self.cost
        )
    }
}

/// Database identifier of a persisted [`ScrapeTask`].
pub type TaskId = i64;

/// Summary of one scrape run for one data source.
///
/// Sessions persisted with the most recent task of each data source form
/// the "current" availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeTask {
    /// When the run started.
    pub time_started: DateTime<Utc>,
    /// When the run finished.
    pub time_finished: DateTime<Utc>,
    /// Data source that was scraped.
    pub data_source: DataSource,
    /// Snapshot of the parameters the run used.
    pub params: serde_json::Value,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn mini_marker_is_case_insensitive() {
        assert!(is_mini_court("Mini Court 3"));
        assert!(is_mini_court("MINI-1"));
        assert!(is_mini_court("court (mini)"));
        assert!(!is_mini_court("Court 1"));
    }

    #[test]
    fn display_includes_label_and_cost() {
        let Some(start) = NaiveDate::from_ymd_opt(2024, 6, 1).and_then(|d| d.and_hms_opt(18, 0, 0))
        else {
            panic!("valid datetime");
        };
        let session = CourtSession {
            venue: Arc::new(Venue::new("london-fields", DataSource::ClubSpark)),
            label: Some("Court 2".to_string()),
            cost: Cost::from_minor_units(850),
            start_time: start,
            end_time: start + chrono::Duration::hours(1),
            url: "https://example.test".to_string(),
        };
        assert_eq!(
            session.to_string(),
            "LondonFields Court 2 at 18:00 on Saturday 01 June (£8.50)"
        );
        assert_eq!(session.venue_name(), "LondonFields");
        assert_eq!(session.data_source(), DataSource::ClubSpark);
    }
}
