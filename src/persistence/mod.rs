//! Persistence layer: venues, scrape tasks and the sessions they found.
//!
//! [`SessionStore`] is the storage seam. [`PostgresStore`] keeps everything
//! in PostgreSQL through `sqlx::PgPool`; [`MemoryStore`] keeps it in process
//! memory and is used when persistence is disabled and in tests.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::{CourtSession, DataSource, TaskId, Venue};
use crate::error::CourtbookerError;
use crate::normalize::SessionBatch;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Filters for [`SessionStore::query_sessions`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionQuery {
    /// Tasks to read; `None` means the most recent task of each data source.
    pub task_ids: Option<Vec<TaskId>>,
    /// Canonical venue names to keep; `None` keeps every venue.
    pub venues: Option<Vec<String>>,
    /// Keep sessions starting at or after this time.
    pub start_after: Option<NaiveDateTime>,
    /// Keep sessions starting at or before this time.
    pub start_before: Option<NaiveDateTime>,
}

/// Durable storage for scrape results.
#[async_trait]
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// Returns the stored venues for `paths`, creating missing ones.
    ///
    /// The result follows the order of `paths`.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::PersistenceError`] on storage failure.
    async fn fetch_or_create_venues(
        &self,
        data_source: DataSource,
        paths: &[String],
    ) -> Result<Vec<Arc<Venue>>, CourtbookerError>;

    /// Stores a task and all of its sessions atomically.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::PersistenceError`] on storage failure;
    /// nothing from the batch is stored in that case.
    async fn save_run(&self, batch: &SessionBatch) -> Result<TaskId, CourtbookerError>;

    /// Returns the matching sessions ordered by start time.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::PersistenceError`] on storage failure.
    async fn query_sessions(
        &self,
        query: &SessionQuery,
    ) -> Result<Vec<CourtSession>, CourtbookerError>;

    /// Distinct canonical venue names, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::PersistenceError`] on storage failure.
    async fn list_venues(&self) -> Result<Vec<String>, CourtbookerError>;

    /// When the most recent task finished, if any task exists.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::PersistenceError`] on storage failure.
    async fn latest_update_time(&self) -> Result<Option<DateTime<Utc>>, CourtbookerError>;
}
