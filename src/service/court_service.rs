//! Court service: answers availability queries over stored sessions.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::{CourtSession, PeakTimePolicy, filter_multi_session};
use crate::error::CourtbookerError;
use crate::location::{DistanceProvider, Origin, venues_within};
use crate::persistence::{SessionQuery, SessionStore};

/// Restricts results to venues within walking distance of a point.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFilter {
    /// Where to measure from.
    pub origin: Origin,
    /// Maximum walking distance in metres.
    pub radius_m: u64,
}

/// A court availability query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourtFilter {
    /// Canonical venue names to keep.
    pub venues: Option<Vec<String>>,
    /// Keep sessions starting at or after this time.
    pub start_after: Option<NaiveDateTime>,
    /// Keep sessions starting at or before this time.
    pub start_before: Option<NaiveDateTime>,
    /// Keep only sessions with another session an hour before or after at
    /// the same venue.
    pub only_double_headers: bool,
    /// Drop sessions starting within weekday working hours.
    pub exclude_working_hours: bool,
    /// Replace the venue list with the venues near a point.
    pub location: Option<LocationFilter>,
}

/// Read side of the service.
#[derive(Debug, Clone)]
pub struct CourtService {
    store: Arc<dyn SessionStore>,
    distances: Option<Arc<dyn DistanceProvider>>,
    policy: PeakTimePolicy,
}

impl CourtService {
    /// Creates a new `CourtService`. Location queries are refused when
    /// `distances` is `None`.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        distances: Option<Arc<dyn DistanceProvider>>,
        policy: PeakTimePolicy,
    ) -> Self {
        Self {
            store,
            distances,
            policy,
        }
    }

    /// Peak and working-hours thresholds.
    #[must_use]
    pub const fn policy(&self) -> &PeakTimePolicy {
        &self.policy
    }

    /// Returns `true` if `session` starts at a peak time.
    #[must_use]
    pub fn is_peak(&self, session: &CourtSession) -> bool {
        self.policy.is_peak_time(session.start_time)
    }

    /// Current sessions matching `filter`, ordered by start time.
    ///
    /// Working hours are removed before double headers are looked for, so
    /// a neighbour inside working hours does not count.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::InvalidRequest`] for a location query
    /// when no distance provider is configured, or propagates storage and
    /// lookup errors.
    pub async fn find_sessions(
        &self,
        filter: &CourtFilter,
    ) -> Result<Vec<CourtSession>, CourtbookerError> {
        let venues = match &filter.location {
            Some(location) => {
                let provider = self
                    .distances
                    .as_deref()
                    .ok_or_else(|| {
                        CourtbookerError::InvalidRequest(
                            "location search is not configured".to_string(),
                        )
                    })?;
                let nearby = venues_within(provider, &location.origin, location.radius_m).await?;
                if nearby.is_empty() {
                    return Ok(Vec::new());
                }
                let mut names: Vec<String> = nearby.into_keys().collect();
                names.sort();
                Some(names)
            }
            None => filter.venues.clone().filter(|v| !v.is_empty()),
        };

        let query = SessionQuery {
            task_ids: None,
            venues,
            start_after: filter.start_after,
            start_before: filter.start_before,
        };
        let mut sessions = self.store.query_sessions(&query).await?;

        if filter.exclude_working_hours {
            sessions.retain(|s| !self.policy.is_working_hours(s.start_time));
        }
        if filter.only_double_headers {
            sessions = filter_multi_session(sessions);
        }

        tracing::debug!(sessions = sessions.len(), "court query answered");
        Ok(sessions)
    }

    /// All known venue names, sorted.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn venues(&self) -> Result<Vec<String>, CourtbookerError> {
        self.store.list_venues().await
    }

    /// When the most recent scrape finished.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub async fn latest_update_time(&self) -> Result<Option<DateTime<Utc>>, CourtbookerError> {
        self.store.latest_update_time().await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{Cost, DataSource, ScrapeTask, Venue};
    use crate::normalize::SessionBatch;
    use crate::persistence::MemoryStore;

    #[derive(Debug)]
    struct Fixed(HashMap<String, u64>);

    #[async_trait]
    impl DistanceProvider for Fixed {
        async fn walking_distances(
            &self,
            _origin: &Origin,
        ) -> Result<HashMap<String, u64>, CourtbookerError> {
            Ok(self.0.clone())
        }
    }

    // 2024-05-17 is a Friday.
    fn at(h: u32) -> NaiveDateTime {
        let Some(dt) = NaiveDate::from_ymd_opt(2024, 5, 17).and_then(|d| d.and_hms_opt(h, 0, 0))
        else {
            panic!("valid datetime");
        };
        dt
    }

    fn session(venue: &Arc<Venue>, h: u32) -> CourtSession {
        CourtSession {
            venue: Arc::clone(venue),
            label: None,
            cost: Cost::from_minor_units(500),
            start_time: at(h),
            end_time: at(h + 1),
            url: "https://x.test".to_string(),
        }
    }

    async fn service(distances: Option<Arc<dyn DistanceProvider>>) -> CourtService {
        let store = Arc::new(MemoryStore::new());
        let fields = Arc::new(Venue::new("london-fields", DataSource::ClubSpark));
        let downs = Arc::new(Venue::new("hackney-downs", DataSource::ClubSpark));
        let batch = SessionBatch::new(
            ScrapeTask {
                time_started: Utc::now(),
                time_finished: Utc::now(),
                data_source: DataSource::ClubSpark,
                params: serde_json::json!({}),
            },
            vec![
                session(&fields, 8),
                session(&fields, 17),
                session(&fields, 18),
                session(&fields, 20),
                session(&downs, 19),
            ],
        );
        let Ok(_) = store.save_run(&batch).await else {
            panic!("save failed");
        };
        CourtService::new(store, distances, PeakTimePolicy::default())
    }

    fn starts(sessions: &[CourtSession]) -> Vec<(String, u32)> {
        use chrono::Timelike;
        sessions
            .iter()
            .map(|s| (s.venue_name().to_string(), s.start_time.hour()))
            .collect()
    }

    #[tokio::test]
    async fn double_headers_ignore_neighbours_in_working_hours() {
        let svc = service(None).await;
        let Ok(doubles) = svc
            .find_sessions(&CourtFilter {
                only_double_headers: true,
                ..CourtFilter::default()
            })
            .await
        else {
            panic!("query failed");
        };
        assert_eq!(
            starts(&doubles),
            vec![("LondonFields".to_string(), 17), ("LondonFields".to_string(), 18)]
        );

        let Ok(evening) = svc
            .find_sessions(&CourtFilter {
                only_double_headers: true,
                exclude_working_hours: true,
                ..CourtFilter::default()
            })
            .await
        else {
            panic!("query failed");
        };
        assert!(evening.is_empty());
    }

    #[tokio::test]
    async fn location_replaces_venue_filter() {
        let provider: Arc<dyn DistanceProvider> = Arc::new(Fixed(HashMap::from([
            ("HackneyDowns".to_string(), 900),
            ("LondonFields".to_string(), 2_500),
        ])));
        let svc = service(Some(provider)).await;
        let filter = |radius_m| CourtFilter {
            location: Some(LocationFilter {
                origin: Origin::Address("E8".to_string()),
                radius_m,
            }),
            ..CourtFilter::default()
        };

        let Ok(near) = svc.find_sessions(&filter(1_000)).await else {
            panic!("query failed");
        };
        assert_eq!(starts(&near), vec![("HackneyDowns".to_string(), 19)]);

        let Ok(none) = svc.find_sessions(&filter(100)).await else {
            panic!("query failed");
        };
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn location_without_provider_is_rejected() {
        let svc = service(None).await;
        let result = svc
            .find_sessions(&CourtFilter {
                location: Some(LocationFilter {
                    origin: Origin::Address("E8".to_string()),
                    radius_m: 1_000,
                }),
                ..CourtFilter::default()
            })
            .await;
        assert!(matches!(result, Err(CourtbookerError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn peak_flag_uses_policy() {
        let svc = service(None).await;
        let Ok(all) = svc.find_sessions(&CourtFilter::default()).await else {
            panic!("query failed");
        };
        let peak: Vec<bool> = all.iter().map(|s| svc.is_peak(s)).collect();
        assert_eq!(peak, vec![false, false, true, true, true]);
    }
}
