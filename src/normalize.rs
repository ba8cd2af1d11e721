//! The hand-off from extraction to storage.

use tracing::warn;

use crate::domain::{CourtSession, ScrapeTask, is_mini_court};

/// A finished scrape task together with the sessions it found.
///
/// Every session in a batch satisfies the record invariants: it ends after
/// it starts and is not on a mini court.
#[derive(Debug, Clone)]
pub struct SessionBatch {
    task: ScrapeTask,
    sessions: Vec<CourtSession>,
}

impl SessionBatch {
    /// Builds a batch, dropping sessions that break the record invariants.
    #[must_use]
    pub fn new(task: ScrapeTask, sessions: Vec<CourtSession>) -> Self {
        let sessions = sessions
            .into_iter()
            .filter(|session| {
                if session.end_time <= session.start_time {
                    warn!(
                        %session,
                        end = %session.end_time,
                        "dropping session that does not end after it starts"
                    );
                    return false;
                }
                if session.label.as_deref().is_some_and(is_mini_court) {
                    warn!(%session, "dropping mini court session");
                    return false;
                }
                true
            })
            .collect();
        Self { task, sessions }
    }

    /// The task summary.
    #[must_use]
    pub const fn task(&self) -> &ScrapeTask {
        &self.task
    }

    /// The valid sessions, in extraction order.
    #[must_use]
    pub fn sessions(&self) -> &[CourtSession] {
        &self.sessions
    }

    /// Splits the batch into its parts.
    #[must_use]
    pub fn into_parts(self) -> (ScrapeTask, Vec<CourtSession>) {
        (self.task, self.sessions)
    }
}
