//! Court query DTOs.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Cost, CourtSession, DataSource};
use crate::error::CourtbookerError;
use crate::location::Origin;
use crate::service::{CourtFilter, LocationFilter};

/// Query parameters for `GET /api/v1/courts`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CourtsQuery {
    /// Comma-separated canonical venue names.
    #[serde(default)]
    pub venues: Option<String>,
    /// Only sessions starting at or after this local time.
    #[serde(default)]
    pub start_time_after: Option<NaiveDateTime>,
    /// Only sessions starting at or before this local time.
    #[serde(default)]
    pub start_time_before: Option<NaiveDateTime>,
    /// Only sessions with a neighbouring session an hour apart.
    #[serde(default)]
    pub only_double_headers: bool,
    /// Drop weekday sessions inside working hours.
    #[serde(default)]
    pub exclude_working_hours: bool,
    /// Select venues by walking distance instead of by name.
    #[serde(default)]
    pub use_location: bool,
    /// Origin latitude, required with `use_location`.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Origin longitude, required with `use_location`.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Walking radius in kilometres, required with `use_location`.
    #[serde(default)]
    pub distance_km: Option<f64>,
}

impl CourtsQuery {
    /// Validates the parameters and builds the service filter.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::InvalidRequest`] when `use_location` is
    /// set without latitude, longitude and distance, or together with
    /// `venues`, or when the radius is negative.
    pub fn into_filter(self) -> Result<CourtFilter, CourtbookerError> {
        let venues = self.venues.as_deref().map(split_names).filter(|v| !v.is_empty());

        let location = if self.use_location {
            let (Some(latitude), Some(longitude), Some(distance_km)) =
                (self.latitude, self.longitude, self.distance_km)
            else {
                return Err(CourtbookerError::InvalidRequest(
                    "latitude, longitude and distance_km must be provided when using location"
                        .to_string(),
                ));
            };
            if venues.is_some() {
                return Err(CourtbookerError::InvalidRequest(
                    "venues cannot be provided when using location".to_string(),
                ));
            }
            if !distance_km.is_finite() || distance_km < 0.0 {
                return Err(CourtbookerError::InvalidRequest(format!(
                    "invalid distance_km {distance_km}"
                )));
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let radius_m = (distance_km * 1000.0).round() as u64;
            Some(LocationFilter {
                origin: Origin::Coordinates { latitude, longitude },
                radius_m,
            })
        } else {
            None
        };

        Ok(CourtFilter {
            venues,
            start_after: self.start_time_after,
            start_before: self.start_time_before,
            only_double_headers: self.only_double_headers,
            exclude_working_hours: self.exclude_working_hours,
            location,
        })
    }
}

/// Splits a comma-separated name list, dropping blanks.
#[must_use]
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// One available session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourtSessionDto {
    /// Canonical venue name.
    pub venue: String,
    /// Booking backend.
    pub data_source: DataSource,
    /// Court label, if known.
    pub label: Option<String>,
    /// Price as a decimal string, e.g. `"5.50"`.
    #[schema(value_type = String, example = "5.50")]
    pub cost: Cost,
    /// Local start time.
    pub start_time: NaiveDateTime,
    /// Local end time.
    pub end_time: NaiveDateTime,
    /// Booking page.
    pub url: String,
    /// Whether the session starts at a peak time.
    pub is_peak: bool,
}

impl CourtSessionDto {
    /// Builds the DTO; `is_peak` comes from the caller's policy.
    #[must_use]
    pub fn new(session: &CourtSession, is_peak: bool) -> Self {
        Self {
            venue: session.venue_name().to_string(),
            data_source: session.data_source(),
            label: session.label.clone(),
            cost: session.cost,
            start_time: session.start_time,
            end_time: session.end_time,
            url: session.url.clone(),
            is_peak,
        }
    }
}

/// Response body for `GET /api/v1/courts`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CourtsResponse {
    /// Status message.
    pub message: String,
    /// Number of sessions returned.
    pub count: usize,
    /// Matching sessions ordered by start time.
    pub courts: Vec<CourtSessionDto>,
}

/// Response body for `GET /api/v1/venues`.
#[derive(Debug, Serialize, ToSchema)]
pub struct VenuesResponse {
    /// Canonical venue names, sorted.
    pub venues: Vec<String>,
}

/// Response body for `GET /api/v1/status`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// When the latest scrape finished.
    pub last_update_time: Option<DateTime<Utc>>,
    /// A run still in progress, if any.
    pub active_run: Option<uuid::Uuid>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn location_query() -> CourtsQuery {
        CourtsQuery {
            use_location: true,
            latitude: Some(51.54),
            longitude: Some(-0.087),
            distance_km: Some(1.5),
            ..CourtsQuery::default()
        }
    }

    #[test]
    fn location_query_builds_radius_in_metres() {
        let Ok(filter) = location_query().into_filter() else {
            panic!("valid query");
        };
        let Some(location) = filter.location else {
            panic!("location expected");
        };
        assert_eq!(location.radius_m, 1_500);
        assert!(filter.venues.is_none());
    }

    #[test]
    fn location_requires_all_coordinates() {
        let query = CourtsQuery {
            longitude: None,
            ..location_query()
        };
        assert!(matches!(query.into_filter(), Err(CourtbookerError::InvalidRequest(_))));
    }

    #[test]
    fn location_forbids_venues() {
        let query = CourtsQuery {
            venues: Some("LondonFields".to_string()),
            ..location_query()
        };
        assert!(matches!(query.into_filter(), Err(CourtbookerError::InvalidRequest(_))));
    }

    #[test]
    fn venue_list_is_split_and_trimmed() {
        let query = CourtsQuery {
            venues: Some("LondonFields, ClissoldPark,,".to_string()),
            ..CourtsQuery::default()
        };
        let Ok(filter) = query.into_filter() else {
            panic!("valid query");
        };
        assert_eq!(
            filter.venues,
            Some(vec!["LondonFields".to_string(), "ClissoldPark".to_string()])
        );
    }
}
