//! Tower Hamlets court pages.
//!
//! Each court slot is a `label.court` wrapping an `input`. Free slots carry
//! the `bookable` class, a `data-price` attribute and a value of the form
//! `{court}_{resource}_{YYYY-MM-DD}_{HH:MM}`. Slots are always one hour.

use chrono::{Duration, NaiveDateTime};
use scraper::Html;
use tracing::{debug, info, warn};

use super::{PageContext, selector};
use crate::domain::{Cost, CourtSession, is_mini_court};
use crate::error::ScrapeError;

const COURT: &str = "label.court";
const BOOKABLE_INPUT: &str = "input.bookable";

/// Extracts bookable slots from a rendered Tower Hamlets page.
///
/// Slots without a readable price or start time are logged and skipped.
///
/// # Errors
///
/// Only fails if a built-in selector does not compile.
pub fn extract(html: &str, page: &PageContext<'_>) -> Result<Vec<CourtSession>, ScrapeError> {
    let courts = selector(COURT)?;
    let bookable = selector(BOOKABLE_INPUT)?;

    let document = Html::parse_document(html);
    let mut found = Vec::new();

    for court in document.select(&courts) {
        let Some(input) = court.select(&bookable).next() else {
            continue;
        };

        let Some(cost) = input.value().attr("data-price").and_then(|p| Cost::parse(p).ok()) else {
            warn!(
                venue = %page.venue,
                price = ?input.value().attr("data-price"),
                "could not parse court price"
            );
            continue;
        };

        let text: String = court.text().collect();
        let label = text.split('£').next().unwrap_or_default().trim().to_string();
        if is_mini_court(&label) {
            debug!(court = %label, "skipping mini court");
            continue;
        }

        let value = input.value().attr("value").unwrap_or_default();
        let Some(start) = parse_slot_start(value) else {
            warn!(venue = %page.venue, value, "could not parse court time");
            continue;
        };

        let label = (!label.is_empty()).then_some(label);
        let court_session = page.session(label, cost, start, start + Duration::hours(1));
        info!(session = %court_session, "found available court");
        found.push(court_session);
    }

    Ok(found)
}

/// Reads the start time from a `{court}_{resource}_{date}_{time}` value.
#[must_use]
pub fn parse_slot_start(value: &str) -> Option<NaiveDateTime> {
    let parts: Vec<&str> = value.split('_').collect();
    let [_, _, date, time] = parts.as_slice() else {
        return None;
    };
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M").ok()
}
