//! Scrape service: runs sources, stores results and emits events.

use std::sync::Arc;

use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tokio::task::JoinHandle;

use crate::config::DataSourceConfig;
use crate::domain::{
    CourtSession, DataSource, EventBus, RunId, RunRegistry, RunStatus, ScrapeEvent, ScrapeTask,
    TaskId,
};
use crate::error::CourtbookerError;
use crate::extract::{ScrapePlan, ScrapeRunner};
use crate::normalize::SessionBatch;
use crate::persistence::SessionStore;

/// Coordinates scrape runs.
///
/// Every run follows the same pattern: register in the [`RunRegistry`] →
/// emit `RunStarted` → scrape → store atomically → record the outcome →
/// emit `RunCompleted` or `RunFailed`.
#[derive(Debug)]
pub struct ScrapeService {
    store: Arc<dyn SessionStore>,
    runner: ScrapeRunner,
    registry: Arc<RunRegistry>,
    event_bus: EventBus,
    sources: Vec<DataSourceConfig>,
    refresh_cooldown_minutes: u64,
}

impl ScrapeService {
    /// Creates a new `ScrapeService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn SessionStore>,
        runner: ScrapeRunner,
        registry: Arc<RunRegistry>,
        event_bus: EventBus,
        sources: Vec<DataSourceConfig>,
        refresh_cooldown_minutes: u64,
    ) -> Self {
        Self {
            store,
            runner,
            registry,
            event_bus,
            sources,
            refresh_cooldown_minutes,
        }
    }

    /// Returns a reference to the inner [`RunRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<RunRegistry> {
        &self.registry
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Configured data sources.
    #[must_use]
    pub fn sources(&self) -> &[DataSourceConfig] {
        &self.sources
    }

    /// Starts one concurrent run per data source and returns their ids.
    ///
    /// Unless `force` is set, refuses while the last finished task is
    /// younger than the refresh cooldown.
    ///
    /// # Errors
    ///
    /// Returns [`CourtbookerError::AlreadyRunning`] if a run is in
    /// progress, [`CourtbookerError::CooldownActive`] during the cooldown,
    /// or a persistence error from reading the last update time.
    pub async fn refresh_all(
        self: &Arc<Self>,
        force: bool,
    ) -> Result<Vec<(DataSource, RunId)>, CourtbookerError> {
        if let Some(active) = self.registry.active().await {
            return Err(CourtbookerError::AlreadyRunning(active));
        }

        if !force && let Some(last_update) = self.store.latest_update_time().await? {
            let minutes = i64::try_from(self.refresh_cooldown_minutes).unwrap_or(i64::MAX);
            let cooldown = chrono::Duration::minutes(minutes);
            if Utc::now() - last_update < cooldown {
                return Err(CourtbookerError::CooldownActive {
                    cooldown_minutes: self.refresh_cooldown_minutes,
                    last_update,
                });
            }
        }

        let run_ids = self.registry.begin(&DataSource::ALL).await?;
        let runs: Vec<(DataSource, RunId)> = DataSource::ALL.into_iter().zip(run_ids).collect();

        for &(data_source, run_id) in &runs {
            let service = Arc::clone(self);
            tokio::spawn(async move {
                service.run_source(run_id, data_source).await;
            });
        }

        tracing::info!(runs = runs.len(), force, "refresh started");
        Ok(runs)
    }

    /// Scrapes one data source under an already registered run and records
    /// the outcome in the registry.
    ///
    /// Sources with no venues or no look-ahead days are skipped.
    pub async fn run_source(&self, run_id: RunId, data_source: DataSource) -> RunStatus {
        let config = self
            .sources
            .iter()
            .find(|s| s.data_source == data_source)
            .filter(|s| s.is_enabled());

        let status = match config {
            None => {
                tracing::info!(%run_id, %data_source, "nothing to scrape, skipping");
                RunStatus::Skipped
            }
            Some(config) => {
                let _ = self.event_bus.publish(ScrapeEvent::RunStarted {
                    run_id,
                    data_source,
                    timestamp: Utc::now(),
                });

                match self.scrape_and_store(config).await {
                    Ok((task_id, sessions)) => {
                        let count = sessions.len();
                        let _ = self.event_bus.publish(ScrapeEvent::RunCompleted {
                            run_id,
                            data_source,
                            task_id,
                            sessions,
                            timestamp: Utc::now(),
                        });
                        tracing::info!(
                            %run_id,
                            %data_source,
                            task_id,
                            sessions = count,
                            "run completed"
                        );
                        RunStatus::Completed {
                            task_id,
                            sessions: count,
                        }
                    }
                    Err(e) => {
                        tracing::error!(%run_id, %data_source, error = %e, "run failed");
                        let _ = self.event_bus.publish(ScrapeEvent::RunFailed {
                            run_id,
                            data_source,
                            error: e.to_string(),
                            timestamp: Utc::now(),
                        });
                        RunStatus::Failed { error: e.to_string() }
                    }
                }
            }
        };

        if let Err(e) = self.registry.finish(run_id, status.clone()).await {
            tracing::warn!(%run_id, error = %e, "could not record run outcome");
        }
        status
    }

    async fn scrape_and_store(
        &self,
        config: &DataSourceConfig,
    ) -> Result<(TaskId, Arc<[CourtSession]>), CourtbookerError> {
        let time_started = Utc::now();
        let venues = self
            .store
            .fetch_or_create_venues(config.data_source, &config.venues)
            .await?;
        let dates = scrape_dates(Local::now().date_naive(), config.look_ahead_days);
        tracing::info!(
            data_source = %config.data_source,
            first = ?dates.first(),
            last = ?dates.last(),
            "scraping date range"
        );

        let plan = ScrapePlan {
            data_source: config.data_source,
            base_url: config.base_url.clone(),
            venues,
            dates,
            settle_delay: config.settle_delay(),
        };
        let sessions = self.runner.run(&plan).await?;

        let task = ScrapeTask {
            time_started,
            time_finished: Utc::now(),
            data_source: config.data_source,
            params: serde_json::to_value(config).unwrap_or_default(),
        };
        let batch = SessionBatch::new(task, sessions);
        let task_id = self.store.save_run(&batch).await?;

        let (_, sessions) = batch.into_parts();
        Ok((task_id, Arc::from(sessions)))
    }
}

/// `days` consecutive dates starting at `today`.
#[must_use]
pub fn scrape_dates(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (0..u64::from(days))
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .collect()
}

/// The first time strictly after `now` at `hour`:00 local time.
#[must_use]
pub fn next_run_after(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let at = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        now.date()
            .checked_add_days(Days::new(1))
            .map_or(today, |tomorrow| tomorrow.and_time(at))
    }
}

/// Forces a full refresh every day at `hour` local time.
pub fn spawn_scheduler(service: Arc<ScrapeService>, hour: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, hour);
            tracing::info!(next_run = %next, "scheduled refresh");
            tokio::time::sleep((next - now).to_std().unwrap_or_default()).await;

            match service.refresh_all(true).await {
                Ok(runs) => tracing::info!(runs = runs.len(), "scheduled refresh started"),
                Err(e) => tracing::warn!(error = %e, "scheduled refresh not started"),
            }
        }
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::extract::ReplayLauncher;
    use crate::persistence::{MemoryStore, SessionQuery};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        let Some(dt) = NaiveDate::from_ymd_opt(2024, 5, day).and_then(|d| d.and_hms_opt(h, m, 0))
        else {
            panic!("valid datetime");
        };
        dt
    }

    #[test]
    fn next_run_is_today_before_the_hour_and_tomorrow_after() {
        assert_eq!(next_run_after(at(17, 21, 59), 22), at(17, 22, 0));
        assert_eq!(next_run_after(at(17, 22, 0), 22), at(18, 22, 0));
        assert_eq!(next_run_after(at(17, 23, 30), 22), at(18, 22, 0));
        assert_eq!(next_run_after(at(31, 23, 0), 6), {
            let Some(dt) = NaiveDate::from_ymd_opt(2024, 6, 1).and_then(|d| d.and_hms_opt(6, 0, 0))
            else {
                panic!("valid datetime");
            };
            dt
        });
    }

    #[test]
    fn scrape_dates_start_today_and_exclude_the_end() {
        let today = at(30, 0, 0).date();
        let dates = scrape_dates(today, 3);
        assert_eq!(dates.len(), 3);
        assert_eq!(dates.first(), Some(&today));
        assert_eq!(dates.last().map(|d| d.to_string()), Some("2024-06-01".to_string()));
        assert!(scrape_dates(today, 0).is_empty());
    }

    const CLUBSPARK_BASE: &str = "https://clubspark.test";

    fn clubspark_page() -> String {
        r#"<div class="resource" data-resource-name="Court 1">
            <div class="resource-session" data-availability="true" data-session-cost="5.50">
              <div class="resource-interval"
                   data-system-start-time="1080" data-system-end-time="1140">
                <a class="not-booked" href="/book">Book</a>
              </div>
              <div class="resource-interval"
                   data-system-start-time="1140" data-system-end-time="1200">
                <span class="booked">Booked</span>
              </div>
            </div>
          </div>"#
            .to_string()
    }

    fn sources() -> Vec<DataSourceConfig> {
        DataSource::ALL
            .into_iter()
            .map(|data_source| {
                let mut config = DataSourceConfig::defaults(data_source);
                config.base_url = CLUBSPARK_BASE.to_string();
                config.settle_secs = 0;
                if data_source == DataSource::ClubSpark {
                    config.venues = vec!["LondonFields".to_string()];
                    config.look_ahead_days = 1;
                }
                config
            })
            .collect()
    }

    fn service(launcher: ReplayLauncher) -> (Arc<ScrapeService>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = Arc::new(ScrapeService::new(
            Arc::clone(&store) as Arc<dyn SessionStore>,
            ScrapeRunner::new(Arc::new(launcher)),
            Arc::new(RunRegistry::new()),
            EventBus::new(16),
            sources(),
            60,
        ));
        (service, store)
    }

    fn todays_pages() -> HashMap<String, String> {
        let today = Local::now().date_naive();
        let url = DataSource::ClubSpark.page_url(CLUBSPARK_BASE, "LondonFields", today);
        HashMap::from([(url, clubspark_page())])
    }

    async fn begin(service: &ScrapeService, data_source: DataSource) -> RunId {
        let Ok(ids) = service.registry().begin(&[data_source]).await else {
            panic!("registry accepts a new run");
        };
        let Some(&run_id) = ids.first() else {
            panic!("one run id per source");
        };
        run_id
    }

    #[tokio::test]
    async fn run_stores_sessions_and_publishes_events() {
        let launcher = ReplayLauncher::new(todays_pages());
        let (service, store) = service(launcher.clone());
        let mut events = service.event_bus().subscribe();

        let run_id = begin(&service, DataSource::ClubSpark).await;
        let status = service.run_source(run_id, DataSource::ClubSpark).await;

        let RunStatus::Completed { sessions, .. } = status else {
            panic!("expected a completed run, got {status:?}");
        };
        assert_eq!(sessions, 1);
        assert_eq!((launcher.launched(), launcher.closed()), (1, 1));

        let Ok(ScrapeEvent::RunStarted { .. }) = events.recv().await else {
            panic!("expected RunStarted first");
        };
        let Ok(ScrapeEvent::RunCompleted { sessions, .. }) = events.recv().await else {
            panic!("expected RunCompleted");
        };
        assert_eq!(sessions.len(), 1);

        let stored = store.query_sessions(&SessionQuery::default()).await.unwrap_or_default();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.first().and_then(|s| s.label.clone()), Some("Court 1".to_string()));

        let Ok(entry) = service.registry().get(run_id).await else {
            panic!("run is registered");
        };
        assert!(matches!(entry.status, RunStatus::Completed { sessions: 1, .. }));
        assert_eq!(service.registry().active().await, None);
    }

    #[tokio::test]
    async fn unconfigured_source_is_skipped_silently() {
        let (service, store) = service(ReplayLauncher::new(todays_pages()));
        let mut events = service.event_bus().subscribe();

        let run_id = begin(&service, DataSource::Better).await;
        assert_eq!(service.run_source(run_id, DataSource::Better).await, RunStatus::Skipped);
        assert!(events.try_recv().is_err());
        assert_eq!(store.latest_update_time().await.ok().flatten(), None);
    }

    #[tokio::test]
    async fn browser_failure_fails_the_run_and_stores_nothing() {
        let (service, store) = service(ReplayLauncher::unavailable());
        let mut events = service.event_bus().subscribe();

        let run_id = begin(&service, DataSource::ClubSpark).await;
        let status = service.run_source(run_id, DataSource::ClubSpark).await;
        assert!(matches!(status, RunStatus::Failed { .. }));

        let Ok(ScrapeEvent::RunStarted { .. }) = events.recv().await else {
            panic!("expected RunStarted first");
        };
        let Ok(ScrapeEvent::RunFailed { data_source, .. }) = events.recv().await else {
            panic!("expected RunFailed");
        };
        assert_eq!(data_source, DataSource::ClubSpark);
        assert_eq!(store.latest_update_time().await.ok().flatten(), None);
    }

    #[tokio::test]
    async fn refresh_is_refused_while_a_run_is_active() {
        let (service, _) = service(ReplayLauncher::new(todays_pages()));
        let run_id = begin(&service, DataSource::ClubSpark).await;

        let Err(CourtbookerError::AlreadyRunning(active)) = service.refresh_all(true).await else {
            panic!("expected AlreadyRunning");
        };
        assert_eq!(active, run_id);
    }

    #[tokio::test]
    async fn cooldown_blocks_unforced_refresh_only() {
        let (service, store) = service(ReplayLauncher::new(todays_pages()));
        let now = Utc::now();
        let task = ScrapeTask {
            time_started: now,
            time_finished: now,
            data_source: DataSource::ClubSpark,
            params: serde_json::Value::Null,
        };
        let saved = store.save_run(&SessionBatch::new(task, Vec::new())).await;
        assert!(saved.is_ok());

        let Err(CourtbookerError::CooldownActive {
            cooldown_minutes, ..
        }) = service.refresh_all(false).await
        else {
            panic!("expected CooldownActive");
        };
        assert_eq!(cooldown_minutes, 60);

        let Ok(runs) = service.refresh_all(true).await else {
            panic!("forced refresh starts");
        };
        let started: Vec<DataSource> = runs.iter().map(|(ds, _)| *ds).collect();
        assert_eq!(started, DataSource::ALL.to_vec());

        for _ in 0..200 {
            if service.registry().active().await.is_none() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(service.registry().active().await, None);
        let finished = service.registry().list().await;
        assert_eq!(finished.len(), 3);
        assert_eq!(
            finished.iter().filter(|e| e.status == RunStatus::Skipped).count(),
            2
        );
    }
}
