//! Error types for the scraping pipeline and the HTTP layer.
//!
//! [`ScrapeError`] covers everything that can go wrong while turning
//! booking pages into sessions. [`CourtbookerError`] is the service-level
//! error; each variant maps to an HTTP status code and a structured JSON
//! error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{DataSource, RunId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "refresh already running: 1f0c…",
///     "details": "1f0c…"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Failures while scraping and extracting sessions.
///
/// Per-unit failures ([`ScrapeError::is_fatal`] is `false`) are logged and
/// skipped by the runner; everything else aborts the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScrapeError {
    /// The browser session could not be started or stopped responding.
    #[error("browser session error: {0}")]
    Browser(String),

    /// Loading one availability page failed.
    #[error("failed to load {url}: {message}")]
    Navigation {
        /// Page that failed to load.
        url: String,
        /// Driver error message.
        message: String,
    },

    /// A table column that must always parse did not.
    ///
    /// Signals that the booking site changed its page format.
    #[error("failed to parse {field} from column {column} value {value:?} in row {batch:?}")]
    ColumnParse {
        /// Column index within the row.
        column: usize,
        /// Field the column maps to.
        field: &'static str,
        /// Offending text.
        value: String,
        /// The whole reconstructed row.
        batch: Vec<String>,
    },

    /// A price could not be read.
    #[error("invalid cost: {0:?}")]
    InvalidCost(String),

    /// A time range could not be read.
    #[error("invalid time range: {0:?}")]
    InvalidTimeRange(String),

    /// A CSS selector failed to compile.
    #[error("invalid selector {0:?}")]
    Selector(&'static str),

    /// Sessions could not be persisted.
    #[error("storage error: {0}")]
    Store(String),
}

impl ScrapeError {
    /// Returns `true` if the error must abort the whole run rather than
    /// just the current (venue, date) page.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Navigation { .. })
    }
}

/// Service-level error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                          |
/// |-----------|-----------------|--------------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request                      |
/// | 2000–2999 | State/Not Found | 404 / 409 / 429                      |
/// | 3000–3999 | Server          | 500 Internal Server Error / 502      |
#[derive(Debug, thiserror::Error)]
pub enum CourtbookerError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown data source tag.
    #[error("invalid data source: {0}")]
    InvalidDataSource(String),

    /// Run with the given ID was not found.
    #[error("run not found: {0}")]
    RunNotFound(uuid::Uuid),

    /// A refresh is already in progress.
    #[error("refresh already running: {0}")]
    AlreadyRunning(RunId),

    /// The last refresh finished too recently.
    #[error("please wait at least {cooldown_minutes} minutes between refreshes")]
    CooldownActive {
        /// Configured cooldown.
        cooldown_minutes: u64,
        /// When the last refresh finished.
        last_update: DateTime<Utc>,
    },

    /// A data source has nothing configured.
    #[error("data source {0} is not configured")]
    SourceNotConfigured(DataSource),

    /// Scraping failed.
    #[error("scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Distance lookup failed.
    #[error("location lookup failed: {0}")]
    Location(String),

    /// Notification delivery failed.
    #[error("notification failed: {0}")]
    Notification(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CourtbookerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidDataSource(_) => 1002,
            Self::RunNotFound(_) => 2001,
            Self::AlreadyRunning(_) => 2002,
            Self::CooldownActive { .. } => 2003,
            Self::SourceNotConfigured(_) => 2004,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Scrape(_) => 3002,
            Self::Location(_) => 3003,
            Self::Notification(_) => 3004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidDataSource(_) => StatusCode::BAD_REQUEST,
            Self::RunNotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyRunning(_) | Self::SourceNotConfigured(_) => StatusCode::CONFLICT,
            Self::CooldownActive { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Location(_) => StatusCode::BAD_GATEWAY,
            Self::Scrape(_)
            | Self::PersistenceError(_)
            | Self::Notification(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            Self::AlreadyRunning(run_id) => Some(run_id.to_string()),
            Self::CooldownActive { last_update, .. } => Some(last_update.to_rfc3339()),
            _ => None,
        }
    }
}

impl IntoResponse for CourtbookerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
