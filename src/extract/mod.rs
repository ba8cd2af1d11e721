//! Extraction layer: from rendered booking pages to [`CourtSession`]s.
//!
//! Each [`DataSource`] has its own page layout and its own extractor:
//!
//! | Source         | Module         | Strategy                                   |
//! |----------------|----------------|--------------------------------------------|
//! | `ClubSpark`    | [`structured`] | resource/session/interval attributes        |
//! | `Better`       | [`columnar`]   | flattened visible text rebuilt into rows    |
//! | `TowerHamlets` | [`bookable`]   | one bookable input per slot                 |
//!
//! The extractors share no code; [`extract_page`] picks one by matching on
//! the venue's data source. All of them work on the browser's rendered DOM
//! as HTML text, so they can be exercised against fixture pages without a
//! browser. [`runner`] drives a [`browser::Browser`] across venues and
//! dates and feeds each page to [`extract_page`].

pub mod bookable;
pub mod browser;
pub mod columnar;
pub mod runner;
pub mod structured;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use scraper::Selector;

use crate::domain::{Cost, CourtSession, DataSource, Venue};
use crate::error::ScrapeError;

pub use browser::{Browser, BrowserLauncher, ReplayLauncher, WebDriverLauncher};
pub use runner::{ScrapePlan, ScrapeRunner};

/// What the extractor needs to know about the page it is reading.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    /// Venue the page belongs to.
    pub venue: &'a Arc<Venue>,
    /// Date the page shows availability for.
    pub date: NaiveDate,
    /// Address the page was loaded from; becomes the session link.
    pub url: &'a str,
}

impl PageContext<'_> {
    /// Builds a session at this page's venue, linking back to the page.
    #[must_use]
    pub fn session(
        &self,
        label: Option<String>,
        cost: Cost,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> CourtSession {
        CourtSession {
            venue: Arc::clone(self.venue),
            label,
            cost,
            start_time,
            end_time,
            url: self.url.to_string(),
        }
    }
}

/// Extracts the available sessions from one rendered page.
///
/// # Errors
///
/// Propagates the extractor's fatal errors; see [`columnar::extract`].
pub fn extract_page(html: &str, page: &PageContext<'_>) -> Result<Vec<CourtSession>, ScrapeError> {
    match page.venue.data_source() {
        DataSource::ClubSpark => structured::extract(html, page),
        DataSource::Better => columnar::extract(html, page),
        DataSource::TowerHamlets => bookable::extract(html, page),
    }
}

/// Compiles a static CSS selector.
pub(crate) fn selector(css: &'static str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|_| ScrapeError::Selector(css))
}
