//! Walking-distance filter over venues.
//!
//! Distances come from the Google Distance Matrix API. Each venue is looked
//! up by its name on Google Maps; several venues can share one place.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CourtbookerError;

/// Google Maps place name → canonical names of the venues at that place.
pub const MAPS_PLACES: &[(&str, &[&str])] = &[
    ("Joe White Gardens Tennis Court", &["Askegardens"]),
    ("Bethnal Green Gardens Tennis Courts", &["BethnalGreenGardens"]),
    ("Clissold Park Tennis Courts", &["ClissoldPark"]),
    ("Finsbury Park Tennis Courts", &["Finsburypark"]),
    ("Hackney Downs Tennis Courts", &["HackneyDowns"]),
    ("Haggerston Park Tennis Courts", &["HaggerstonPark"]),
    ("Highbury Fields Tennis Courts", &["HighburyTennis"]),
    (
        "Islington Tennis Centre and Gym",
        &["IslingtonTennisCentreOutdoor", "IslingtonTennisCentreIndoor"],
    ),
    ("London Fields Tennis Courts", &["LondonFields"]),
    ("Millfields Tennis Courts", &["Millfieldsparkmiddlesex"]),
    ("Spring Hill Tennis Courts", &["Springhillparktennis"]),
    ("Rosemary Gardens Tennis Court", &["RosemaryGardensTennis"]),
    ("Britannia Leisure Centre", &["ShoreditchPark"]),
    ("Tower Hamlets Tennis - Victoria Park, East London", &["VictoriaPark"]),
];

/// Where distances are measured from.
#[derive(Debug, Clone, PartialEq)]
pub enum Origin {
    /// A point on the map.
    Coordinates {
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
    /// Free-form address resolved by the provider.
    Address(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinates { latitude, longitude } => write!(f, "{latitude},{longitude}"),
            Self::Address(address) => f.write_str(address),
        }
    }
}

/// Source of walking distances to venues.
#[async_trait]
pub trait DistanceProvider: Send + Sync + fmt::Debug {
    /// Walking distance in metres from `origin` to every venue the provider
    /// can reach, keyed by canonical venue name.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::Location`] if the lookup fails.
    async fn walking_distances(
        &self,
        origin: &Origin,
    ) -> Result<HashMap<String, u64>, CourtbookerError>;
}

/// Canonical names of the venues within `radius_m` metres' walk of
/// `origin`, with their distances.
///
/// # Errors
///
/// Propagates the provider's error.
pub async fn venues_within(
    provider: &dyn DistanceProvider,
    origin: &Origin,
    radius_m: u64,
) -> Result<HashMap<String, u64>, CourtbookerError> {
    let distances = provider.walking_distances(origin).await?;
    let nearby: HashMap<String, u64> = distances
        .into_iter()
        .filter(|(_, metres)| *metres <= radius_m)
        .collect();
    tracing::debug!(%origin, radius_m, venues = nearby.len(), "venues within walking distance");
    Ok(nearby)
}

const DISTANCE_MATRIX_URL: &str = "https://maps.googleapis.com/maps/api/distancematrix/json";

/// Google Distance Matrix client in walking mode.
#[derive(Clone)]
pub struct GoogleDistanceMatrix {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl fmt::Debug for GoogleDistanceMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleDistanceMatrix")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl GoogleDistanceMatrix {
    /// Creates a client using `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            endpoint: DISTANCE_MATRIX_URL.to_string(),
        }
    }
}

#[async_trait]
impl DistanceProvider for GoogleDistanceMatrix {
    async fn walking_distances(
        &self,
        origin: &Origin,
    ) -> Result<HashMap<String, u64>, CourtbookerError> {
        let destinations: Vec<&str> = MAPS_PLACES.iter().map(|(place, _)| *place).collect();
        let origin_param = origin.to_string();
        let destinations_param = destinations.join("|");

        let response: DistanceMatrixResponse = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("origins", origin_param.as_str()),
                ("destinations", destinations_param.as_str()),
                ("mode", "walking"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| CourtbookerError::Location(e.to_string()))?
            .json()
            .await
            .map_err(|e| CourtbookerError::Location(e.to_string()))?;

        distances_by_venue(&response)
    }
}

/// Body of a Distance Matrix response.
#[derive(Debug, Clone, Deserialize)]
pub struct DistanceMatrixResponse {
    /// Top-level status, `"OK"` on success.
    pub status: String,
    /// One row per origin.
    #[serde(default)]
    pub rows: Vec<MatrixRow>,
}

/// Distances from one origin.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixRow {
    /// One element per destination, in request order.
    #[serde(default)]
    pub elements: Vec<MatrixElement>,
}

/// Distance to one destination.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixElement {
    /// Element status, `"OK"` when a route was found.
    pub status: String,
    /// Route length, present when a route was found.
    pub distance: Option<MatrixValue>,
}

/// A measured quantity.
#[derive(Debug, Clone, Deserialize)]
pub struct MatrixValue {
    /// Value in base units (metres for distance).
    pub value: u64,
}

/// Maps a response for [`MAPS_PLACES`] back to canonical venue names.
///
/// Elements without a distance are skipped.
///
/// # Errors
///
/// Returns [`CourtbookerError::Location`] if the response status is not
/// `OK` or it has no rows.
pub fn distances_by_venue(
    response: &DistanceMatrixResponse,
) -> Result<HashMap<String, u64>, CourtbookerError> {
    if response.status != "OK" {
        return Err(CourtbookerError::Location(format!(
            "distance matrix status {}",
            response.status
        )));
    }
    let Some(row) = response.rows.first() else {
        return Err(CourtbookerError::Location("distance matrix returned no rows".to_string()));
    };

    let mut distances = HashMap::new();
    for ((place, venues), element) in MAPS_PLACES.iter().zip(&row.elements) {
        let Some(distance) = &element.distance else {
            tracing::warn!(place, status = %element.status, "no walking distance to venue");
            continue;
        };
        for venue in *venues {
            distances.insert((*venue).to_string(), distance.value);
        }
    }
    Ok(distances)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedDistances(HashMap<String, u64>);

    #[async_trait]
    impl DistanceProvider for FixedDistances {
        async fn walking_distances(
            &self,
            _origin: &Origin,
        ) -> Result<HashMap<String, u64>, CourtbookerError> {
            Ok(self.0.clone())
        }
    }

    fn fixed(pairs: &[(&str, u64)]) -> FixedDistances {
        FixedDistances(pairs.iter().map(|(n, d)| ((*n).to_string(), *d)).collect())
    }

    fn origin() -> Origin {
        Origin::Coordinates {
            latitude: 51.5074,
            longitude: 0.1278,
        }
    }

    #[tokio::test]
    async fn keeps_venues_within_radius() {
        let cases: &[(&[(&str, u64)], u64, &[(&str, u64)])] = &[
            (&[("venue1", 100), ("venue2", 200), ("venue3", 300)], 150, &[("venue1", 100)]),
            (&[("venue1", 200), ("venue2", 100), ("venue3", 300)], 199, &[("venue2", 100)]),
            (
                &[("venue1", 300), ("venue2", 200), ("venue3", 100)],
                240,
                &[("venue2", 200), ("venue3", 100)],
            ),
            (&[("venue1", 200), ("venue2", 100), ("venue3", 200)], 99, &[]),
            (&[("venue1", 200)], 200, &[("venue1", 200)]),
        ];
        for (distances, radius, expected) in cases {
            let Ok(found) = venues_within(&fixed(distances), &origin(), *radius).await else {
                panic!("lookup failed");
            };
            assert_eq!(found, fixed(expected).0, "radius {radius}");
        }
    }

    #[test]
    fn origin_formats_as_query_parameter() {
        assert_eq!(origin().to_string(), "51.5074,0.1278");
        assert_eq!(Origin::Address("E8 3EU".into()).to_string(), "E8 3EU");
    }

    #[test]
    fn shared_places_fan_out_to_every_venue() {
        let elements: Vec<serde_json::Value> = MAPS_PLACES
            .iter()
            .enumerate()
            .map(|(i, (place, _))| {
                if place.starts_with("Spring Hill") {
                    serde_json::json!({ "status": "ZERO_RESULTS" })
                } else {
                    serde_json::json!({
                        "status": "OK",
                        "distance": { "text": "", "value": 100 * (i + 1) }
                    })
                }
            })
            .collect();
        let body = serde_json::json!({ "status": "OK", "rows": [{ "elements": elements }] });
        let Ok(response) = serde_json::from_value::<DistanceMatrixResponse>(body) else {
            panic!("valid response");
        };
        let Ok(distances) = distances_by_venue(&response) else {
            panic!("mapping failed");
        };

        assert_eq!(distances.get("Askegardens"), Some(&100));
        assert_eq!(distances.get("IslingtonTennisCentreOutdoor"), Some(&800));
        assert_eq!(distances.get("IslingtonTennisCentreIndoor"), Some(&800));
        assert_eq!(distances.get("VictoriaPark"), Some(&1400));
        assert!(!distances.contains_key("Springhillparktennis"));
        assert_eq!(distances.len(), 14);
    }

    #[test]
    fn failed_lookup_is_an_error() {
        let Ok(response) = serde_json::from_value::<DistanceMatrixResponse>(
            serde_json::json!({ "status": "REQUEST_DENIED", "rows": [] }),
        ) else {
            panic!("valid response");
        };
        assert!(matches!(distances_by_venue(&response), Err(CourtbookerError::Location(_))));
    }
}
