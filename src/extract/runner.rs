//! Drives one browser session across the (date × venue) pages of a source.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::{Browser, BrowserLauncher, PageContext, extract_page};
use crate::domain::{CourtSession, DataSource, Venue};
use crate::error::ScrapeError;

/// Everything one scrape run needs to know.
#[derive(Debug, Clone)]
pub struct ScrapePlan {
    /// Backend being scraped.
    pub data_source: DataSource,
    /// Booking site root for the backend.
    pub base_url: String,
    /// Venues to visit.
    pub venues: Vec<Arc<Venue>>,
    /// Dates to visit.
    pub dates: Vec<NaiveDate>,
    /// Pause after each navigation for client-side rendering.
    pub settle_delay: Duration,
}

impl ScrapePlan {
    /// Number of pages the run will visit.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.venues.len().saturating_mul(self.dates.len())
    }
}

/// Runs [`ScrapePlan`]s against browser sessions from a launcher.
#[derive(Clone)]
pub struct ScrapeRunner {
    launcher: Arc<dyn BrowserLauncher>,
}

impl fmt::Debug for ScrapeRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeRunner")
            .field("launcher", &self.launcher)
            .finish()
    }
}

impl ScrapeRunner {
    /// Creates a runner that starts one browser session per run.
    #[must_use]
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self { launcher }
    }

    /// Visits every page of `plan` and returns the sessions found.
    ///
    /// Pages are visited date-major. A page that fails to load is logged
    /// and skipped. The browser is closed once the run ends, whatever the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Browser`] if no browser can be launched, or
    /// the first fatal extraction error (for example a changed page
    /// format).
    pub async fn run(&self, plan: &ScrapePlan) -> Result<Vec<CourtSession>, ScrapeError> {
        info!(
            data_source = %plan.data_source,
            venues = plan.venues.len(),
            dates = plan.dates.len(),
            "starting scrape run"
        );
        let mut browser = self.launcher.launch().await?;

        let result = scrape_pages(browser.as_mut(), plan).await;

        if let Err(e) = browser.close().await {
            warn!(data_source = %plan.data_source, error = %e, "failed to close browser");
        }

        match &result {
            Ok(sessions) => info!(
                data_source = %plan.data_source,
                sessions = sessions.len(),
                "scrape run finished"
            ),
            Err(e) => warn!(data_source = %plan.data_source, error = %e, "scrape run aborted"),
        }
        result
    }
}

async fn scrape_pages(
    browser: &mut dyn Browser,
    plan: &ScrapePlan,
) -> Result<Vec<CourtSession>, ScrapeError> {
    let mut sessions = Vec::new();

    for &date in &plan.dates {
        for venue in &plan.venues {
            let url = plan.data_source.page_url(&plan.base_url, venue.path(), date);
            let page = PageContext {
                venue,
                date,
                url: &url,
            };
            match scrape_page(browser, &page, plan.settle_delay).await {
                Ok(found) => sessions.extend(found),
                Err(e) if !e.is_fatal() => {
                    warn!(venue = %venue, %date, error = %e, "skipping page");
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(sessions)
}

async fn scrape_page(
    browser: &mut dyn Browser,
    page: &PageContext<'_>,
    settle_delay: Duration,
) -> Result<Vec<CourtSession>, ScrapeError> {
    debug!(url = page.url, "loading page");
    browser.navigate(page.url).await?;
    tokio::time::sleep(settle_delay).await;
    let html = browser.page_source().await?;
    extract_page(&html, page)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::extract::ReplayLauncher;

    const BASE: &str = "https://better.test/location";

    fn day(d: u32) -> NaiveDate {
        let Some(date) = NaiveDate::from_ymd_opt(2024, 5, d) else {
            panic!("valid date");
        };
        date
    }

    fn better_page(rows: &[[&str; 6]]) -> String {
        let cells: String = rows
            .iter()
            .flatten()
            .map(|cell| format!("<span>{cell}</span>"))
            .collect();
        format!("<div><h2>Browse by location</h2>{cells}<h2>Shopping basket</h2></div>")
    }

    fn plan(venues: &[&str], dates: Vec<NaiveDate>) -> ScrapePlan {
        ScrapePlan {
            data_source: DataSource::Better,
            base_url: BASE.to_string(),
            venues: venues
                .iter()
                .map(|p| Arc::new(Venue::new(*p, DataSource::Better)))
                .collect(),
            dates,
            settle_delay: Duration::ZERO,
        }
    }

    fn url(path: &str, date: NaiveDate) -> String {
        DataSource::Better.page_url(BASE, path, date)
    }

    const ROW: [&str; 6] = ["18:00 - 19:00", "Tennis", "Court", "Outdoor", "£6.50", "2 spaces"];
    const EARLY_ROW: [&str; 6] = ["07:00 - 08:00", "Tennis", "Court", "Outdoor", "£5", "1 space"];

    #[tokio::test]
    async fn visits_pages_date_major_and_closes_once() {
        let pages = HashMap::from([
            (url("a", day(1)), better_page(&[ROW])),
            (url("b", day(1)), better_page(&[EARLY_ROW])),
            (url("a", day(2)), better_page(&[ROW])),
            (url("b", day(2)), better_page(&[])),
        ]);
        let launcher = ReplayLauncher::new(pages);
        let runner = ScrapeRunner::new(Arc::new(launcher.clone()));

        let Ok(sessions) = runner.run(&plan(&["a", "b"], vec![day(1), day(2)])).await else {
            panic!("run failed");
        };

        let visited: Vec<_> = sessions
            .iter()
            .map(|s| (s.venue.path().to_string(), s.start_time.date()))
            .collect();
        assert_eq!(
            visited,
            vec![
                ("a".to_string(), day(1)),
                ("b".to_string(), day(1)),
                ("a".to_string(), day(2)),
            ]
        );
        assert_eq!(launcher.launched(), 1);
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn failed_page_is_skipped() {
        let pages = HashMap::from([(url("b", day(1)), better_page(&[ROW]))]);
        let launcher = ReplayLauncher::new(pages);
        let runner = ScrapeRunner::new(Arc::new(launcher.clone()));

        let Ok(sessions) = runner.run(&plan(&["a", "b"], vec![day(1)])).await else {
            panic!("run failed");
        };
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.first().map(|s| s.venue.path()), Some("b"));
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn format_change_aborts_and_still_closes() {
        let pages = HashMap::from([
            (url("a", day(1)), better_page(&[["soon", "Tennis", "Court", "Outdoor", "£6", "1"]])),
            (url("b", day(1)), better_page(&[ROW])),
        ]);
        let launcher = ReplayLauncher::new(pages);
        let runner = ScrapeRunner::new(Arc::new(launcher.clone()));

        let result = runner.run(&plan(&["a", "b"], vec![day(1)])).await;
        assert!(matches!(result, Err(ScrapeError::ColumnParse { column: 0, .. })));
        assert_eq!(launcher.closed(), 1);
    }

    #[tokio::test]
    async fn launch_failure_is_fatal() {
        let runner = ScrapeRunner::new(Arc::new(ReplayLauncher::unavailable()));
        let result = runner.run(&plan(&["a"], vec![day(1)])).await;
        assert!(matches!(result, Err(ScrapeError::Browser(_))));
    }

    #[test]
    fn page_count_is_the_cross_product() {
        assert_eq!(plan(&["a", "b", "c"], vec![day(1), day(2)]).page_count(), 6);
    }
}
