//! ClubSpark "book by date" pages.
//!
//! The rendered page has one `div.resource` per court. Each court holds
//! `div.resource-session` blocks carrying a price, and each block holds
//! `div.resource-interval` cells whose start and end are minute offsets
//! from midnight. A cell is free when it contains an `a.not-booked` link.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use scraper::{ElementRef, Html};
use tracing::{debug, info, warn};

use super::{PageContext, selector};
use crate::domain::{Cost, CourtSession, is_mini_court};
use crate::error::ScrapeError;

const RESOURCE: &str = "div.resource";
const AVAILABLE_SESSION: &str = r#"div.resource-session[data-availability="true"]"#;
const INTERVAL: &str = "div.resource-interval";
const NOT_BOOKED: &str = "a.not-booked";

/// Extracts free intervals from a rendered ClubSpark page.
///
/// Mini courts are skipped, as are sessions without a readable price and
/// intervals with unreadable offsets. Output follows document order.
///
/// # Errors
///
/// Only fails if a built-in selector does not compile.
pub fn extract(html: &str, page: &PageContext<'_>) -> Result<Vec<CourtSession>, ScrapeError> {
    let resources = selector(RESOURCE)?;
    let available = selector(AVAILABLE_SESSION)?;
    let intervals = selector(INTERVAL)?;
    let not_booked = selector(NOT_BOOKED)?;

    let document = Html::parse_document(html);
    let mut found = Vec::new();

    for resource in document.select(&resources) {
        let label = resource.value().attr("data-resource-name").map(str::to_string);
        if let Some(name) = label.as_deref()
            && is_mini_court(name)
        {
            debug!(court = name, "skipping mini court");
            continue;
        }

        for session in resource.select(&available) {
            let raw_cost = session.value().attr("data-session-cost");
            let cost = match raw_cost.map(Cost::parse) {
                Some(Ok(cost)) => cost,
                Some(Err(e)) => {
                    warn!(venue = %page.venue, error = %e, "could not parse session cost");
                    continue;
                }
                None => {
                    warn!(venue = %page.venue, "session has no cost");
                    continue;
                }
            };

            for interval in session.select(&intervals) {
                if interval.select(&not_booked).next().is_none() {
                    continue;
                }
                let Some((start, end)) = interval_bounds(interval, page.date) else {
                    warn!(
                        venue = %page.venue,
                        start = ?interval.value().attr("data-system-start-time"),
                        end = ?interval.value().attr("data-system-end-time"),
                        "skipping interval with unreadable offsets"
                    );
                    continue;
                };

                let court_session = page.session(label.clone(), cost, start, end);
                info!(session = %court_session, "found available court");
                found.push(court_session);
            }
        }
    }

    Ok(found)
}

/// Reads an interval's start and end offsets; `None` unless both parse and
/// the end is after the start.
fn interval_bounds(
    interval: ElementRef<'_>,
    date: NaiveDate,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let offset = |attr: &str| -> Option<u32> { interval.value().attr(attr)?.trim().parse().ok() };
    let start = offset("data-system-start-time")?;
    let end = offset("data-system-end-time")?;
    (end > start).then(|| (datetime_from_minutes(start, date), datetime_from_minutes(end, date)))
}

/// Converts minutes since local midnight of `date` into a timestamp.
///
/// The offset is split into whole hours and the remaining minutes; an
/// offset of 1440 lands on the following midnight.
#[must_use]
pub fn datetime_from_minutes(minutes: u32, date: NaiveDate) -> NaiveDateTime {
    let hour = minutes / 60;
    let minute = minutes % 60;
    date.and_time(NaiveTime::MIN)
        + Duration::hours(i64::from(hour))
        + Duration::minutes(i64::from(minute))
}
