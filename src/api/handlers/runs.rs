//! Refresh handlers: start a refresh, inspect runs.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{RefreshResponse, RunDto};
use crate::app_state::AppState;
use crate::domain::RunId;
use crate::error::{CourtbookerError, ErrorResponse};

/// `POST /refresh` — Start scraping every data source.
///
/// # Errors
///
/// Returns [`CourtbookerError::AlreadyRunning`] while a run is in
/// progress and [`CourtbookerError::CooldownActive`] when the data is
/// still fresh.
#[utoipa::path(
    post,
    path = "/api/v1/refresh",
    tag = "Runs",
    summary = "Refresh court data",
    description = "Starts one scrape run per data source in the background. Refused while \
                   a run is in progress or within the refresh cooldown.",
    responses(
        (status = 202, description = "Runs started", body = RefreshResponse),
        (status = 409, description = "A refresh is already running", body = ErrorResponse),
        (status = 429, description = "Refresh cooldown active", body = ErrorResponse),
    )
)]
pub async fn refresh(State(state): State<AppState>) -> Result<impl IntoResponse, CourtbookerError> {
    let runs = state.scrape_service.refresh_all(false).await?;
    Ok((StatusCode::ACCEPTED, Json(RefreshResponse::started(&runs))))
}

/// `GET /runs/:id` — Status of one run.
///
/// # Errors
///
/// Returns [`CourtbookerError::RunNotFound`] for an unknown run.
#[utoipa::path(
    get,
    path = "/api/v1/runs/{id}",
    tag = "Runs",
    summary = "Get run status",
    description = "Returns the state of a run started by this process.",
    params(
        ("id" = uuid::Uuid, Path, description = "Run UUID"),
    ),
    responses(
        (status = 200, description = "Run status", body = RunDto),
        (status = 404, description = "Run not found", body = ErrorResponse),
    )
)]
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, CourtbookerError> {
    let entry = state.scrape_service.registry().get(RunId::from(id)).await?;
    Ok(Json(RunDto::from(entry)))
}

/// `GET /runs` — All runs started by this process.
#[utoipa::path(
    get,
    path = "/api/v1/runs",
    tag = "Runs",
    summary = "List runs",
    description = "Returns every run started by this process, oldest first.",
    responses(
        (status = 200, description = "Runs", body = Vec<RunDto>),
    )
)]
pub async fn list_runs(State(state): State<AppState>) -> impl IntoResponse {
    let runs: Vec<RunDto> = state
        .scrape_service
        .registry()
        .list()
        .await
        .into_iter()
        .map(RunDto::from)
        .collect();
    Json(runs)
}

/// Run routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/refresh", post(refresh))
        .route("/runs", get(list_runs))
        .route("/runs/{id}", get(get_run))
}
