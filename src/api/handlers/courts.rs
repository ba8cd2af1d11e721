//! Court availability handlers: courts, venues, status.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{CourtSessionDto, CourtsQuery, CourtsResponse, StatusResponse, VenuesResponse};
use crate::app_state::AppState;
use crate::error::{CourtbookerError, ErrorResponse};

/// `GET /courts` — Query available sessions.
///
/// # Errors
///
/// Returns [`CourtbookerError::InvalidRequest`] for inconsistent location
/// parameters, or a persistence or location error.
#[utoipa::path(
    get,
    path = "/api/v1/courts",
    tag = "Courts",
    summary = "Query available courts",
    description = "Returns sessions from the latest scrape of every data source, filtered \
                   by venue, start time, double headers, working hours, or walking distance.",
    params(CourtsQuery),
    responses(
        (status = 200, description = "Matching sessions", body = CourtsResponse),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 502, description = "Distance lookup failed", body = ErrorResponse),
    )
)]
pub async fn list_courts(
    State(state): State<AppState>,
    Query(query): Query<CourtsQuery>,
) -> Result<impl IntoResponse, CourtbookerError> {
    let filter = query.into_filter()?;
    let sessions = state.court_service.find_sessions(&filter).await?;

    let courts: Vec<CourtSessionDto> = sessions
        .iter()
        .map(|s| CourtSessionDto::new(s, state.court_service.is_peak(s)))
        .collect();

    Ok(Json(CourtsResponse {
        message: "Success".to_string(),
        count: courts.len(),
        courts,
    }))
}

/// `GET /venues` — List venue names.
///
/// # Errors
///
/// Returns a persistence error on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/venues",
    tag = "Courts",
    summary = "List venues",
    description = "Returns the canonical name of every venue seen so far, sorted.",
    responses(
        (status = 200, description = "Venue names", body = VenuesResponse),
    )
)]
pub async fn list_venues(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, CourtbookerError> {
    let venues = state.court_service.venues().await?;
    Ok(Json(VenuesResponse { venues }))
}

/// `GET /status` — Freshness of the data.
///
/// # Errors
///
/// Returns a persistence error on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Courts",
    summary = "Data freshness",
    description = "Returns when the latest scrape finished and any run still in progress.",
    responses(
        (status = 200, description = "Status", body = StatusResponse),
    )
)]
pub async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, CourtbookerError> {
    let last_update_time = state.court_service.latest_update_time().await?;
    let active_run = state.scrape_service.registry().active().await;
    Ok(Json(StatusResponse {
        last_update_time,
        active_run: active_run.map(|id| *id.as_uuid()),
    }))
}

/// Court routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/courts", get(list_courts))
        .route("/venues", get(list_venues))
        .route("/status", get(status))
}
