//! In-process store.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{SessionQuery, SessionStore};
use crate::domain::{CourtSession, DataSource, ScrapeTask, TaskId, Venue};
use crate::error::CourtbookerError;
use crate::normalize::SessionBatch;

#[derive(Debug, Default)]
struct Tables {
    venues: Vec<Arc<Venue>>,
    tasks: Vec<(TaskId, ScrapeTask)>,
    sessions: Vec<(TaskId, CourtSession)>,
}

impl Tables {
    /// Most recent task id per data source, by start time.
    fn latest_task_ids(&self) -> Vec<TaskId> {
        DataSource::ALL
            .into_iter()
            .filter_map(|source| {
                self.tasks
                    .iter()
                    .filter(|(_, task)| task.data_source == source)
                    .max_by_key(|(id, task)| (task.time_started, *id))
                    .map(|(id, _)| *id)
            })
            .collect()
    }
}

/// Keeps everything in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn fetch_or_create_venues(
        &self,
        data_source: DataSource,
        paths: &[String],
    ) -> Result<Vec<Arc<Venue>>, CourtbookerError> {
        let mut tables = self.tables.write().await;
        let mut found = Vec::with_capacity(paths.len());
        for path in paths {
            let existing = tables
                .venues
                .iter()
                .find(|v| v.path() == path && v.data_source() == data_source)
                .map(Arc::clone);
            let venue = match existing {
                Some(venue) => venue,
                None => {
                    let venue = Arc::new(Venue::new(path.as_str(), data_source));
                    tables.venues.push(Arc::clone(&venue));
                    venue
                }
            };
            found.push(venue);
        }
        Ok(found)
    }

    async fn save_run(&self, batch: &SessionBatch) -> Result<TaskId, CourtbookerError> {
        let mut tables = self.tables.write().await;
        let task_id = tables.tasks.iter().map(|(id, _)| *id).max().unwrap_or(0) + 1;

        for session in batch.sessions() {
            let known = tables
                .venues
                .iter()
                .any(|v| {
                    v.path() == session.venue.path() && v.data_source() == session.data_source()
                });
            if !known {
                tables.venues.push(Arc::clone(&session.venue));
            }
        }

        tables.tasks.push((task_id, batch.task().clone()));
        tables
            .sessions
            .extend(batch.sessions().iter().cloned().map(|s| (task_id, s)));
        Ok(task_id)
    }

    async fn query_sessions(
        &self,
        query: &SessionQuery,
    ) -> Result<Vec<CourtSession>, CourtbookerError> {
        let tables = self.tables.read().await;
        let task_ids = match &query.task_ids {
            Some(ids) => ids.clone(),
            None => tables.latest_task_ids(),
        };

        let mut sessions: Vec<CourtSession> = tables
            .sessions
            .iter()
            .filter(|(task_id, _)| task_ids.contains(task_id))
            .map(|(_, session)| session)
            .filter(|s| {
                query
                    .venues
                    .as_ref()
                    .is_none_or(|names| names.iter().any(|n| n == s.venue_name()))
            })
            .filter(|s| query.start_after.is_none_or(|after| s.start_time >= after))
            .filter(|s| query.start_before.is_none_or(|before| s.start_time <= before))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.start_time);
        Ok(sessions)
    }

    async fn list_venues(&self) -> Result<Vec<String>, CourtbookerError> {
        let tables = self.tables.read().await;
        let names: BTreeSet<String> = tables.venues.iter().map(|v| v.name().to_string()).collect();
        Ok(names.into_iter().collect())
    }

    async fn latest_update_time(&self) -> Result<Option<DateTime<Utc>>, CourtbookerError> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.iter().map(|(_, task)| task.time_finished).max())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    use super::*;
    use crate::domain::Cost;

    fn at(h: u32) -> NaiveDateTime {
        let Some(dt) = NaiveDate::from_ymd_opt(2024, 5, 17).and_then(|d| d.and_hms_opt(h, 0, 0))
        else {
            panic!("valid datetime");
        };
        dt
    }

    fn session(venue: &Arc<Venue>, start: u32) -> CourtSession {
        CourtSession {
            venue: Arc::clone(venue),
            label: None,
            cost: Cost::from_minor_units(500),
            start_time: at(start),
            end_time: at(start + 1),
            url: "https://x.test".to_string(),
        }
    }

    fn batch(
        source: DataSource,
        started: DateTime<Utc>,
        sessions: Vec<CourtSession>,
    ) -> SessionBatch {
        SessionBatch::new(
            ScrapeTask {
                time_started: started,
                time_finished: started + Duration::minutes(5),
                data_source: source,
                params: serde_json::json!({}),
            },
            sessions,
        )
    }

    #[tokio::test]
    async fn venues_are_created_once() {
        let store = MemoryStore::new();
        let paths = vec!["london-fields".to_string(), "clissold-park".to_string()];
        let Ok(first) = store.fetch_or_create_venues(DataSource::ClubSpark, &paths).await else {
            panic!("fetch failed");
        };
        let Ok(second) = store.fetch_or_create_venues(DataSource::ClubSpark, &paths).await else {
            panic!("fetch failed");
        };
        assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
        assert_eq!(
            store.list_venues().await.ok(),
            Some(vec!["ClissoldPark".to_string(), "LondonFields".to_string()])
        );
    }

    #[tokio::test]
    async fn default_query_reads_latest_task_per_source() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let fields = Arc::new(Venue::new("LondonFields", DataSource::ClubSpark));
        let better = Arc::new(Venue::new(
            "islington-tennis-centre/tennis-court-outdoor",
            DataSource::Better,
        ));

        let Ok(old) = store
            .save_run(&batch(
                DataSource::ClubSpark,
                now - Duration::hours(2),
                vec![session(&fields, 8)],
            ))
            .await
        else {
            panic!("save failed");
        };
        let _ = store
            .save_run(&batch(
                DataSource::ClubSpark,
                now,
                vec![session(&fields, 10), session(&fields, 9)],
            ))
            .await;
        let _ = store
            .save_run(&batch(
                DataSource::Better,
                now - Duration::hours(3),
                vec![session(&better, 7)],
            ))
            .await;

        let Ok(current) = store.query_sessions(&SessionQuery::default()).await else {
            panic!("query failed");
        };
        let starts: Vec<_> = current.iter().map(|s| s.start_time).collect();
        assert_eq!(starts, vec![at(7), at(9), at(10)]);

        let Ok(explicit) = store
            .query_sessions(&SessionQuery {
                task_ids: Some(vec![old]),
                ..SessionQuery::default()
            })
            .await
        else {
            panic!("query failed");
        };
        assert_eq!(explicit.len(), 1);

        assert_eq!(
            store.latest_update_time().await.ok().flatten(),
            Some(now + Duration::minutes(5))
        );
    }

    #[tokio::test]
    async fn venue_and_time_filters_apply() {
        let store = MemoryStore::new();
        let a = Arc::new(Venue::new("london-fields", DataSource::ClubSpark));
        let b = Arc::new(Venue::new("clissold-park", DataSource::ClubSpark));
        let _ = store
            .save_run(&batch(
                DataSource::ClubSpark,
                Utc::now(),
                vec![session(&a, 8), session(&b, 9), session(&a, 12), session(&a, 18)],
            ))
            .await;

        let Ok(found) = store
            .query_sessions(&SessionQuery {
                venues: Some(vec!["LondonFields".to_string()]),
                start_after: Some(at(9)),
                start_before: Some(at(12)),
                ..SessionQuery::default()
            })
            .await
        else {
            panic!("query failed");
        };
        assert_eq!(found.iter().map(|s| s.start_time).collect::<Vec<_>>(), vec![at(12)]);
    }

    #[tokio::test]
    async fn empty_store_has_no_update_time() {
        let store = MemoryStore::new();
        assert_eq!(store.latest_update_time().await.ok(), Some(None));
        assert_eq!(store.query_sessions(&SessionQuery::default()).await.ok(), Some(vec![]));
    }
}
