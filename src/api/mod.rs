//! REST API layer: route handlers, DTOs, and router composition.
//!
//! JSON endpoints are mounted under `/api/v1`; health, catalog and the HTML
//! pages sit at the root. With the `swagger-ui` feature the OpenAPI
//! document is served at `/api-docs/openapi.json` and browsable under
//! `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI description of the JSON endpoints.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "courtbooker", description = "Public tennis court availability"),
    paths(
        handlers::system::health_handler,
        handlers::system::data_sources_handler,
        handlers::courts::list_courts,
        handlers::courts::list_venues,
        handlers::courts::status,
        handlers::runs::refresh,
        handlers::runs::list_runs,
        handlers::runs::get_run,
    ),
    tags(
        (name = "System", description = "Health and configuration"),
        (name = "Courts", description = "Court availability queries"),
        (name = "Runs", description = "Scrape refreshes"),
    )
)]
pub struct ApiDoc;

/// Builds the complete router with all REST and HTML endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .merge(handlers::html::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
