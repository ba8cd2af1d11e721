//! Better "by time" pages.
//!
//! These pages carry no stable attributes, so availability is rebuilt from
//! the visible text. The text between the "browse by location" and
//! "shopping basket" headings is a table flattened into a stream of
//! fragments, six per row:
//!
//! ```text
//! 0: "07:00 - 08:00"  1: activity  2: venue  3: court type  4: "£9.60"  5: "2 spaces available"
//! ```

use chrono::{Duration, NaiveTime};
use scraper::{ElementRef, Html};
use tracing::{debug, info};

use super::PageContext;
use crate::domain::{Cost, CourtSession};
use crate::error::ScrapeError;

/// Fragment after which the availability table starts.
pub const START_SENTINEL: &str = "browse by location";
/// Fragment at which the availability table ends.
pub const END_SENTINEL: &str = "shopping basket";
/// Fragments per table row.
pub const NUM_COLUMNS: usize = 6;

const TIME_COLUMN: usize = 0;
const COST_COLUMN: usize = 4;
const AVAILABILITY_COLUMN: usize = 5;

/// Elements dropped with their content: never visible text, or form
/// controls whose labels are not table cells.
const HIDDEN_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "button", "input", "select", "textarea", "iframe",
    "object", "embed",
];

/// Parses `"09:00 - 10:00"`, `"10:00-11:00"` or `"11 - 12"` into
/// `(start_hour, end_hour)` using the first two characters of each side.
///
/// # Errors
///
/// Returns [`ScrapeError::InvalidTimeRange`] unless the value has exactly
/// two sides that each start with an hour between 0 and 23.
pub fn parse_start_end_time(value: &str) -> Result<(u32, u32), ScrapeError> {
    let invalid = || ScrapeError::InvalidTimeRange(value.to_string());
    let hour = |side: &str| -> Option<u32> {
        let digits: String = side.trim().chars().take(2).collect();
        digits.parse().ok().filter(|h| *h < 24)
    };

    let mut sides = value.split('-');
    let (Some(start), Some(end), None) = (sides.next(), sides.next(), sides.next()) else {
        return Err(invalid());
    };
    Ok((hour(start).ok_or_else(invalid)?, hour(end).ok_or_else(invalid)?))
}

/// Parses a price such as `"£5.5"`, rounded to two decimal places.
///
/// # Errors
///
/// Returns [`ScrapeError::InvalidCost`] if the value is not a price.
pub fn parse_cost(value: &str) -> Result<Cost, ScrapeError> {
    Cost::parse(value)
}

/// Reads the number of free courts from `"2 courts available"`.
///
/// Anything without a leading count, such as `"None available"`, means
/// nothing is free.
#[must_use]
pub fn parse_availability(value: &str) -> u32 {
    value
        .split_whitespace()
        .next()
        .and_then(|count| count.parse().ok())
        .unwrap_or(0)
}

/// Flattens the page into its visible text fragments between the two
/// sentinels, in document order.
///
/// Every element contributes the text directly inside it (before its first
/// child element) joined with the text directly after it (before the next
/// sibling element).
#[must_use]
pub fn visible_fragments(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut fragments = Vec::new();
    let mut in_table = false;

    for element in document.root_element().descendants().skip(1).filter_map(ElementRef::wrap) {
        let inside_hidden = element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| is_hidden(ancestor));
        if inside_hidden {
            continue;
        }

        let text = if is_hidden(element) {
            String::new()
        } else {
            element
                .children()
                .take_while(|child| !child.value().is_element())
                .filter_map(|child| child.value().as_text())
                .map(|t| &**t)
                .collect()
        };
        let tail: String = element
            .next_siblings()
            .take_while(|sibling| !sibling.value().is_element())
            .filter_map(|sibling| sibling.value().as_text())
            .map(|t| &**t)
            .collect();

        let fragment = format!("{text} {tail}");
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }

        let lowered = fragment.to_lowercase();
        if !in_table {
            in_table = lowered == START_SENTINEL;
        } else if lowered == END_SENTINEL {
            break;
        } else {
            fragments.push(fragment.to_string());
        }
    }

    fragments
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    HIDDEN_TAGS.contains(&element.value().name())
}

/// Extracts bookable hours from a rendered Better page.
///
/// Rows with no free courts are dropped. A trailing row with fewer than
/// six fragments is discarded.
///
/// # Errors
///
/// Returns [`ScrapeError::ColumnParse`] if a row's time range or price
/// cannot be read; either means the page format changed. An end hour at or
/// before the start hour belongs to the next day.
pub fn extract(html: &str, page: &PageContext<'_>) -> Result<Vec<CourtSession>, ScrapeError> {
    let fragments = visible_fragments(html);
    if fragments.len() < NUM_COLUMNS {
        debug!(venue = %page.venue, date = %page.date, "no session rows found");
        return Ok(Vec::new());
    }

    let rows = fragments.chunks_exact(NUM_COLUMNS);
    if !rows.remainder().is_empty() {
        debug!(
            venue = %page.venue,
            leftover = ?rows.remainder(),
            "discarding incomplete trailing row"
        );
    }

    let mut found = Vec::new();
    for row in rows {
        let column = |index: usize, field: &'static str| -> Result<&str, ScrapeError> {
            row.get(index).map(String::as_str).ok_or_else(|| column_error(row, index, field, ""))
        };

        let time_range = column(TIME_COLUMN, "start_end_time")?;
        let (start_hour, end_hour) = parse_start_end_time(time_range)
            .map_err(|_| column_error(row, TIME_COLUMN, "start_end_time", time_range))?;

        let price = column(COST_COLUMN, "cost")?;
        let cost = parse_cost(price).map_err(|_| column_error(row, COST_COLUMN, "cost", price))?;

        let available = parse_availability(column(AVAILABILITY_COLUMN, "availability")?);
        if available == 0 {
            continue;
        }

        let start = page.date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(start_hour));
        let mut end = page.date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(end_hour));
        if end <= start {
            // "23:00 - 00:00" ends at midnight of the following day.
            end += Duration::days(1);
        }

        let court_session = page.session(None, cost, start, end);
        info!(session = %court_session, available, "found available court");
        found.push(court_session);
    }

    Ok(found)
}

fn column_error(row: &[String], column: usize, field: &'static str, value: &str) -> ScrapeError {
    tracing::error!(column, field, value, ?row, "failed to parse column");
    ScrapeError::ColumnParse {
        column,
        field,
        value: value.to_string(),
        batch: row.to_vec(),
    }
}
