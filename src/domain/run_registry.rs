//! Registry of scrape runs and their outcomes.
//!
//! [`RunRegistry`] answers "is a refresh already running?" and "what
//! happened to run X?" for the refresh endpoint. State lives in this
//! explicitly shared value, keyed by [`RunId`], never in a process-wide
//! variable.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::{DataSource, RunId, TaskId};
use crate::error::CourtbookerError;

/// Lifecycle state of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    /// The run is still scraping.
    Running,
    /// The run finished and its sessions were persisted.
    Completed {
        /// Persisted task row.
        task_id: TaskId,
        /// Number of sessions stored with the task.
        sessions: usize,
    },
    /// The data source had nothing configured to scrape.
    Skipped,
    /// The run aborted.
    Failed {
        /// Error message.
        error: String,
    },
}

/// A registered run with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEntry {
    /// Run identifier.
    pub run_id: RunId,
    /// Data source being scraped.
    pub data_source: DataSource,
    /// Registration time.
    pub started_at: DateTime<Utc>,
    /// Time the run left the `Running` state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Current state.
    pub status: RunStatus,
}

/// Store of all runs started by this process.
///
/// # Concurrency
///
/// A single `RwLock` guards the map. [`RunRegistry::begin`] checks for an
/// active run and registers new ones under the same write lock, so two
/// concurrent refresh requests cannot both start.
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: RwLock<HashMap<RunId, RunEntry>>,
}

impl RunRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one running run per data source.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::AlreadyRunning`] with the id of an
    /// active run if any run is still in progress.
    pub async fn begin(&self, sources: &[DataSource]) -> Result<Vec<RunId>, CourtbookerError> {
        let mut map = self.runs.write().await;
        if let Some(active) = map.values().find(|entry| entry.status == RunStatus::Running) {
            return Err(CourtbookerError::AlreadyRunning(active.run_id));
        }

        let now = Utc::now();
        let ids = sources
            .iter()
            .map(|&data_source| {
                let run_id = RunId::new();
                map.insert(
                    run_id,
                    RunEntry {
                        run_id,
                        data_source,
                        started_at: now,
                        finished_at: None,
                        status: RunStatus::Running,
                    },
                );
                run_id
            })
            .collect();
        Ok(ids)
    }

    /// Moves a run out of `Running` into `status`.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::RunNotFound`] for an unknown run.
    pub async fn finish(&self, run_id: RunId, status: RunStatus) -> Result<(), CourtbookerError> {
        let mut map = self.runs.write().await;
        let entry = map
            .get_mut(&run_id)
            .ok_or(CourtbookerError::RunNotFound(*run_id.as_uuid()))?;
        entry.status = status;
        entry.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Returns a snapshot of one run.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::RunNotFound`] for an unknown run.
    pub async fn get(&self, run_id: RunId) -> Result<RunEntry, CourtbookerError> {
        self.runs
            .read()
            .await
            .get(&run_id)
            .cloned()
            .ok_or(CourtbookerError::RunNotFound(*run_id.as_uuid()))
    }

    /// Returns the id of a run still in progress, if any.
    pub async fn active(&self) -> Option<RunId> {
        self.runs
            .read()
            .await
            .values()
            .find(|entry| entry.status == RunStatus::Running)
            .map(|entry| entry.run_id)
    }

    /// Returns all runs, oldest first.
    pub async fn list(&self) -> Vec<RunEntry> {
        let mut entries: Vec<RunEntry> = self.runs.read().await.values().cloned().collect();
        entries.sort_by_key(|entry| entry.started_at);
        entries
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn begin_registers_one_run_per_source() {
        let registry = RunRegistry::new();
        let Ok(ids) = registry.begin(&DataSource::ALL).await else {
            panic!("begin failed");
        };
        assert_eq!(ids.len(), 3);
        assert_eq!(registry.list().await.len(), 3);
        assert!(registry.active().await.is_some());
    }

    #[tokio::test]
    async fn second_begin_is_rejected_while_running() {
        let registry = RunRegistry::new();
        let Ok(ids) = registry.begin(&[DataSource::Better]).await else {
            panic!("begin failed");
        };

        let result = registry.begin(&[DataSource::ClubSpark]).await;
        let Err(CourtbookerError::AlreadyRunning(active)) = result else {
            panic!("expected AlreadyRunning");
        };
        assert_eq!(Some(&active), ids.first());
    }

    #[tokio::test]
    async fn finished_runs_allow_a_new_begin() {
        let registry = RunRegistry::new();
        let Ok(ids) = registry.begin(&[DataSource::Better]).await else {
            panic!("begin failed");
        };
        for id in ids {
            let finished = registry
                .finish(id, RunStatus::Completed { task_id: 7, sessions: 12 })
                .await;
            assert!(finished.is_ok());
        }
        assert!(registry.active().await.is_none());
        assert!(registry.begin(&[DataSource::Better]).await.is_ok());
    }

    #[tokio::test]
    async fn get_reports_status_and_finish_time() {
        let registry = RunRegistry::new();
        let Ok(ids) = registry.begin(&[DataSource::TowerHamlets]).await else {
            panic!("begin failed");
        };
        let Some(&id) = ids.first() else {
            panic!("no run id");
        };
        let _ = registry
            .finish(id, RunStatus::Failed { error: "boom".to_string() })
            .await;

        let Ok(entry) = registry.get(id).await else {
            panic!("run not found");
        };
        assert_eq!(entry.data_source, DataSource::TowerHamlets);
        assert!(entry.finished_at.is_some());
        assert_eq!(entry.status, RunStatus::Failed { error: "boom".to_string() });
    }

    #[tokio::test]
    async fn unknown_runs_are_not_found() {
        let registry = RunRegistry::new();
        assert!(registry.get(RunId::new()).await.is_err());
        assert!(registry.finish(RunId::new(), RunStatus::Skipped).await.is_err());
    }
}
