//! System endpoints: health check and data source catalog.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::config::DataSourceConfig;
use crate::domain::DataSource;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Data source catalog entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct DataSourceInfo {
    #[serde(flatten)]
    config: DataSourceConfig,
    description: &'static str,
    enabled: bool,
}

/// `GET /config/data-sources` — List booking backends.
#[utoipa::path(
    get,
    path = "/config/data-sources",
    tag = "System",
    summary = "List data sources",
    description = "Returns every booking backend with its configured venues and look-ahead window.",
    responses(
        (status = 200, description = "Data source catalog", body = Vec<DataSourceInfo>),
    )
)]
pub async fn data_sources_handler(State(state): State<AppState>) -> impl IntoResponse {
    let sources: Vec<DataSourceInfo> = state
        .sources()
        .iter()
        .map(|config| DataSourceInfo {
            description: match config.data_source {
                DataSource::Better => "Better leisure centres, read from the by-time table",
                DataSource::ClubSpark => "LTA ClubSpark venues, read from resource markup",
                DataSource::TowerHamlets => "Tower Hamlets council courts, one input per slot",
            },
            enabled: config.is_enabled(),
            config: config.clone(),
        })
        .collect();
    (StatusCode::OK, Json(sources))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/data-sources", get(data_sources_handler))
}
