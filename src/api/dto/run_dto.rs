//! Refresh and run status DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{DataSource, RunEntry, RunId, RunStatus};

/// A started run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunRef {
    /// Run identifier, usable with `GET /api/v1/runs/{id}`.
    pub run_id: uuid::Uuid,
    /// Data source the run scrapes.
    pub data_source: DataSource,
}

/// Response body for `POST /api/v1/refresh` (202 Accepted).
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    /// Status message.
    pub message: String,
    /// One run per data source.
    pub runs: Vec<RunRef>,
}

impl RefreshResponse {
    /// Builds the response for freshly started runs.
    #[must_use]
    pub fn started(runs: &[(DataSource, RunId)]) -> Self {
        Self {
            message: "Refresh task started".to_string(),
            runs: runs
                .iter()
                .map(|&(data_source, run_id)| RunRef {
                    run_id: *run_id.as_uuid(),
                    data_source,
                })
                .collect(),
        }
    }
}

/// Response body for `GET /api/v1/runs/{id}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunDto {
    /// Run identifier.
    pub run_id: uuid::Uuid,
    /// Data source the run scrapes.
    pub data_source: DataSource,
    /// `running`, `completed`, `skipped` or `failed`.
    pub state: String,
    /// When the run was registered.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: Option<DateTime<Utc>>,
    /// Stored task row of a completed run.
    pub task_id: Option<i64>,
    /// Sessions stored by a completed run.
    pub sessions: Option<usize>,
    /// Error message of a failed run.
    pub error: Option<String>,
}

impl From<RunEntry> for RunDto {
    fn from(entry: RunEntry) -> Self {
        let (state, task_id, sessions, error) = match entry.status {
            RunStatus::Running => ("running", None, None, None),
            RunStatus::Completed { task_id, sessions } => {
                ("completed", Some(task_id), Some(sessions), None)
            }
            RunStatus::Skipped => ("skipped", None, None, None),
            RunStatus::Failed { error } => ("failed", None, None, Some(error)),
        };
        Self {
            run_id: *entry.run_id.as_uuid(),
            data_source: entry.data_source,
            state: state.to_string(),
            started_at: entry.started_at,
            finished_at: entry.finished_at,
            task_id,
            sessions,
            error,
        }
    }
}
