//! Minimal server-rendered pages over the same queries as the JSON API.

use std::fmt::Write as _;

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use axum::Router;
use axum::routing::get;
use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::api::dto::split_names;
use crate::app_state::AppState;
use crate::error::CourtbookerError;
use crate::notify::escape_html;
use crate::service::CourtFilter;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%d/%m/%y %H:%M"];

/// Form fields of the search page. Checkboxes arrive as `"on"`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HtmlCourtsQuery {
    /// Comma-separated venue names.
    #[serde(default)]
    pub venues: Option<String>,
    /// Earliest start (`datetime-local` input).
    #[serde(default)]
    pub from: Option<String>,
    /// Latest start (`datetime-local` input).
    #[serde(default)]
    pub to: Option<String>,
    /// Double headers only.
    #[serde(default)]
    pub only_double_headers: Option<String>,
    /// Outside working hours only.
    #[serde(default)]
    pub exclude_working_hours: Option<String>,
}

impl HtmlCourtsQuery {
    fn into_filter(self) -> Result<CourtFilter, CourtbookerError> {
        Ok(CourtFilter {
            venues: self.venues.as_deref().map(split_names).filter(|v| !v.is_empty()),
            start_after: parse_form_datetime(self.from.as_deref())?,
            start_before: parse_form_datetime(self.to.as_deref())?,
            only_double_headers: is_checked(self.only_double_headers.as_deref()),
            exclude_working_hours: is_checked(self.exclude_working_hours.as_deref()),
            location: None,
        })
    }
}

fn is_checked(value: Option<&str>) -> bool {
    matches!(value, Some("on" | "true" | "1"))
}

/// Parses a form date-time; blank means "not set".
fn parse_form_datetime(value: Option<&str>) -> Result<Option<NaiveDateTime>, CourtbookerError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(Some)
        .ok_or_else(|| CourtbookerError::InvalidRequest(format!("invalid date-time {value:?}")))
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n\
         <head><meta charset=\"utf-8\"><title>{title}</title></head>\n\
         <body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n",
        title = escape_html(title),
    ))
}

/// `GET /` — Search form.
///
/// # Errors
///
/// Returns a persistence error on storage failure.
pub async fn index(State(state): State<AppState>) -> Result<Response, CourtbookerError> {
    let venues = state.court_service.venues().await?;
    let last_update = state.court_service.latest_update_time().await?;

    let mut body = String::new();
    match last_update {
        Some(at) => {
            let _ = writeln!(body, "<p>Last updated {}</p>", at.format("%d/%m/%y %H:%M"));
        }
        None => body.push_str("<p>No data yet</p>\n"),
    }
    body.push_str(
        "<form action=\"/html/courts\" method=\"get\">\n\
         <label>Venues <input name=\"venues\" list=\"venue-names\" placeholder=\"all\"></label>\n\
         <datalist id=\"venue-names\">\n",
    );
    for venue in &venues {
        let _ = writeln!(body, "<option value=\"{}\">", escape_html(venue));
    }
    body.push_str(
        "</datalist>\n\
         <label>From <input type=\"datetime-local\" name=\"from\"></label>\n\
         <label>To <input type=\"datetime-local\" name=\"to\"></label>\n\
         <label><input type=\"checkbox\" name=\"only_double_headers\"> \
         Double headers only</label>\n\
         <label><input type=\"checkbox\" name=\"exclude_working_hours\"> \
         Outside working hours</label>\n\
         <button type=\"submit\">Search</button>\n\
         </form>\n\
         <p><a href=\"/html/refresh\">Refresh court data</a></p>\n",
    );

    Ok(page("Tennis courts", &body).into_response())
}

/// `GET /html/courts` — Result table.
///
/// # Errors
///
/// Returns [`CourtbookerError::InvalidRequest`] for a malformed date, or a
/// persistence error.
pub async fn courts(
    State(state): State<AppState>,
    Query(query): Query<HtmlCourtsQuery>,
) -> Result<Response, CourtbookerError> {
    tracing::debug!(?query, "html court search");
    let filter = query.into_filter()?;
    let sessions = state.court_service.find_sessions(&filter).await?;

    let mut body = format!("<p>{} sessions</p>\n", sessions.len());
    body.push_str(
        "<table>\n<tr><th>Venue</th><th>Court</th><th>Date</th><th>Time</th><th>Cost</th>\
         <th>Peak</th><th></th></tr>\n",
    );
    for s in &sessions {
        let _ = writeln!(
            body,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}-{}</td><td>£{}</td><td>{}</td>\
             <td><a href=\"{}\">Book</a></td></tr>",
            escape_html(s.venue_name()),
            escape_html(s.label.as_deref().unwrap_or("")),
            s.start_time.format("%a %d %b"),
            s.start_time.format("%H:%M"),
            s.end_time.format("%H:%M"),
            s.cost,
            if state.court_service.is_peak(s) { "yes" } else { "" },
            escape_html(&s.url),
        );
    }
    body.push_str("</table>\n<p><a href=\"/\">New search</a></p>\n");

    Ok(page("Available courts", &body).into_response())
}

/// `GET /html/refresh` — Start a refresh and report the outcome.
pub async fn refresh(State(state): State<AppState>) -> Response {
    let message = match state.scrape_service.refresh_all(false).await {
        Ok(runs) => format!("Refresh task started ({} runs)", runs.len()),
        Err(
            e @ (CourtbookerError::AlreadyRunning(_) | CourtbookerError::CooldownActive { .. }),
        ) => e.to_string(),
        Err(e) => return e.into_response(),
    };
    let body = format!("<p>{}</p>\n<p><a href=\"/\">Back</a></p>\n", escape_html(&message));
    page("Refresh", &body).into_response()
}

/// HTML routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/html/courts", get(courts))
        .route("/html/refresh", get(refresh))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_values_become_a_filter() {
        let query = HtmlCourtsQuery {
            venues: Some(" LondonFields ".to_string()),
            from: Some("2024-05-17T18:00".to_string()),
            to: Some(String::new()),
            only_double_headers: Some("on".to_string()),
            exclude_working_hours: None,
        };
        let filter = query.into_filter().ok();
        let expected_start =
            NaiveDateTime::parse_from_str("2024-05-17 18:00", "%Y-%m-%d %H:%M").ok();
        assert_eq!(filter.as_ref().and_then(|f| f.start_after), expected_start);
        assert_eq!(filter.as_ref().and_then(|f| f.start_before), None);
        assert_eq!(
            filter.as_ref().and_then(|f| f.venues.clone()),
            Some(vec!["LondonFields".to_string()])
        );
        assert!(filter.as_ref().is_some_and(|f| f.only_double_headers && !f.exclude_working_hours));
    }

    #[test]
    fn malformed_dates_are_rejected() {
        let query = HtmlCourtsQuery {
            from: Some("tomorrow".to_string()),
            ..HtmlCourtsQuery::default()
        };
        assert!(matches!(query.into_filter(), Err(CourtbookerError::InvalidRequest(_))));
    }
}
