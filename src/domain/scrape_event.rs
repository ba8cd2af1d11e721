//! Events announcing the progress and outcome of scrape runs.
//!
//! The scrape service publishes a [`ScrapeEvent`] through the
//! [`super::EventBus`] at each run transition; the notifier subscribes to
//! them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CourtSession, DataSource, RunId, TaskId};

/// Domain event emitted by the scrape service.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ScrapeEvent {
    /// A run was registered and is about to launch its browser.
    RunStarted {
        /// Run identifier.
        run_id: RunId,
        /// Data source being scraped.
        data_source: DataSource,
        /// Start timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A run persisted its sessions.
    RunCompleted {
        /// Run identifier.
        run_id: RunId,
        /// Data source that was scraped.
        data_source: DataSource,
        /// Persisted task row.
        task_id: TaskId,
        /// Sessions stored with the task.
        #[serde(skip)]
        sessions: Arc<[CourtSession]>,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A run aborted.
    RunFailed {
        /// Run identifier.
        run_id: RunId,
        /// Data source that was being scraped.
        data_source: DataSource,
        /// Error message.
        error: String,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl ScrapeEvent {
    /// Returns the run this event belongs to.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::RunCompleted { run_id, .. }
            | Self::RunFailed { run_id, .. } => *run_id,
        }
    }

    /// Returns the data source of the run.
    #[must_use]
    pub const fn data_source(&self) -> DataSource {
        match self {
            Self::RunStarted { data_source, .. }
            | Self::RunCompleted { data_source, .. }
            | Self::RunFailed { data_source, .. } => *data_source,
        }
    }

    /// Returns the snake_case event type string.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::RunCompleted { .. } => "run_completed",
            Self::RunFailed { .. } => "run_failed",
        }
    }
}
