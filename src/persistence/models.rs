//! Database rows.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::domain::{Cost, CourtSession, DataSource, Venue};
use crate::error::CourtbookerError;

/// A `court_sessions` row joined with its venue.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    /// Venue booking path.
    pub venue_path: String,
    /// Venue data source tag.
    pub data_source: String,
    /// Canonical venue name.
    pub venue_name: String,
    /// Court label, if the site exposes one.
    pub label: Option<String>,
    /// Price in minor units.
    pub cost_minor: i64,
    /// Local start time.
    pub start_time: NaiveDateTime,
    /// Local end time.
    pub end_time: NaiveDateTime,
    /// Booking page link.
    pub url: String,
}

/// Converts joined rows into sessions, sharing one [`Venue`] between all
/// rows of the same venue.
///
/// # Errors
///
/// Returns [`CourtbookerError::PersistenceError`] if a row holds an unknown
/// data source or a negative cost.
pub fn sessions_from_rows(rows: Vec<SessionRow>) -> Result<Vec<CourtSession>, CourtbookerError> {
    let mut venues: HashMap<(String, DataSource), Arc<Venue>> = HashMap::new();

    rows.into_iter()
        .map(|row| {
            let data_source: DataSource = row
                .data_source
                .parse()
                .map_err(|_| {
                    CourtbookerError::PersistenceError(format!(
                        "unknown data source {:?}",
                        row.data_source
                    ))
                })?;
            let cost = u32::try_from(row.cost_minor)
                .map(Cost::from_minor_units)
                .map_err(|_| {
                    CourtbookerError::PersistenceError(format!(
                        "invalid stored cost {}",
                        row.cost_minor
                    ))
                })?;
            let venue = venues
                .entry((row.venue_path.clone(), data_source))
                .or_insert_with(|| {
                    Arc::new(Venue::from_stored(
                        row.venue_path,
                        data_source,
                        row.venue_name,
                    ))
                });

            Ok(CourtSession {
                venue: Arc::clone(venue),
                label: row.label,
                cost,
                start_time: row.start_time,
                end_time: row.end_time,
                url: row.url,
            })
        })
        .collect()
}
