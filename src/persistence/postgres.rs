//! PostgreSQL implementation of the persistence layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{SessionRow, sessions_from_rows};
use super::{SessionQuery, SessionStore};
use crate::config::DatabaseConfig;
use crate::domain::{CourtSession, DataSource, TaskId, Venue};
use crate::error::CourtbookerError;
use crate::normalize::SessionBatch;

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn db_error(e: impl std::fmt::Display) -> CourtbookerError {
    CourtbookerError::PersistenceError(e.to_string())
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the configured database and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`CourtbookerError::PersistenceError`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, CourtbookerError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(db_error)?;

        sqlx::migrate!("./migrations").run(&pool).await.map_err(db_error)?;
        tracing::info!("database migrations applied");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn fetch_or_create_venues(
        &self,
        data_source: DataSource,
        paths: &[String],
    ) -> Result<Vec<Arc<Venue>>, CourtbookerError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        for path in paths {
            let venue = Venue::new(path.as_str(), data_source);
            sqlx::query(
                "INSERT INTO venues (path, data_source, name) VALUES ($1, $2, $3) \
                 ON CONFLICT (path, data_source) DO NOTHING",
            )
            .bind(venue.path())
            .bind(data_source.as_str())
            .bind(venue.name())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT path, name FROM venues WHERE data_source = $1 AND path = ANY($2)",
        )
        .bind(data_source.as_str())
        .bind(paths)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        let mut stored: HashMap<String, String> = rows.into_iter().collect();
        paths
            .iter()
            .map(|path| {
                let name = stored
                    .remove(path)
                    .ok_or_else(|| db_error(format!("venue {path} missing after insert")))?;
                Ok(Arc::new(Venue::from_stored(path.clone(), data_source, name)))
            })
            .collect()
    }

    async fn save_run(&self, batch: &SessionBatch) -> Result<TaskId, CourtbookerError> {
        let task = batch.task();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let task_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO scrape_tasks (time_started, time_finished, data_source, params) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(task.time_started)
        .bind(task.time_finished)
        .bind(task.data_source.as_str())
        .bind(&task.params)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        let mut venue_ids: HashMap<(String, DataSource), i64> = HashMap::new();
        for session in batch.sessions() {
            let key = (session.venue.path().to_string(), session.data_source());
            let venue_id = match venue_ids.get(&key) {
                Some(id) => *id,
                None => {
                    let id = sqlx::query_scalar::<_, i64>(
                        "INSERT INTO venues (path, data_source, name) VALUES ($1, $2, $3) \
                         ON CONFLICT (path, data_source) DO UPDATE SET path = EXCLUDED.path \
                         RETURNING id",
                    )
                    .bind(session.venue.path())
                    .bind(session.data_source().as_str())
                    .bind(session.venue_name())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_error)?;
                    venue_ids.insert(key, id);
                    id
                }
            };

            sqlx::query(
                "INSERT INTO court_sessions \
                 (task_id, venue_id, label, cost_minor, start_time, end_time, url) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(task_id)
            .bind(venue_id)
            .bind(session.label.as_deref())
            .bind(i64::from(session.cost.minor_units()))
            .bind(session.start_time)
            .bind(session.end_time)
            .bind(&session.url)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        tracing::debug!(task_id, sessions = batch.sessions().len(), "scrape task stored");

        Ok(task_id)
    }

    async fn query_sessions(
        &self,
        query: &SessionQuery,
    ) -> Result<Vec<CourtSession>, CourtbookerError> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "WITH latest AS ( \
                 SELECT DISTINCT ON (data_source) id FROM scrape_tasks \
                 ORDER BY data_source, time_started DESC, id DESC \
             ) \
             SELECT v.path AS venue_path, v.data_source, v.name AS venue_name, \
                    s.label, s.cost_minor, s.start_time, s.end_time, s.url \
             FROM court_sessions s JOIN venues v ON v.id = s.venue_id \
             WHERE (($1::BIGINT[] IS NULL AND s.task_id IN (SELECT id FROM latest)) \
                    OR s.task_id = ANY($1)) \
               AND ($2::TEXT[] IS NULL OR v.name = ANY($2)) \
               AND ($3::TIMESTAMP IS NULL OR s.start_time >= $3) \
               AND ($4::TIMESTAMP IS NULL OR s.start_time <= $4) \
             ORDER BY s.start_time, s.id",
        )
        .bind(query.task_ids.as_deref())
        .bind(query.venues.as_deref())
        .bind(query.start_after)
        .bind(query.start_before)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        sessions_from_rows(rows)
    }

    async fn list_venues(&self) -> Result<Vec<String>, CourtbookerError> {
        sqlx::query_scalar::<_, String>("SELECT DISTINCT name FROM venues ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn latest_update_time(&self) -> Result<Option<DateTime<Utc>>, CourtbookerError> {
        sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(time_finished) FROM scrape_tasks",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)
    }
}
