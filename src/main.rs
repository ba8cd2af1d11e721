//! courtbooker server entry point.
//!
//! Wires storage, scraping, notifications and the scheduler, then starts
//! the Axum HTTP server.

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use courtbooker::api;
use courtbooker::app_state::AppState;
use courtbooker::config::CourtbookerConfig;
use courtbooker::domain::{EventBus, RunRegistry};
use courtbooker::extract::{ScrapeRunner, WebDriverLauncher};
use courtbooker::location::{DistanceProvider, GoogleDistanceMatrix};
use courtbooker::notify::{LogNotifier, Notifier, SmtpNotifier, spawn_notifier};
use courtbooker::persistence::SessionStore;
use courtbooker::persistence::memory::MemoryStore;
use courtbooker::persistence::postgres::PostgresStore;
use courtbooker::service::{CourtService, ScrapeService, spawn_scheduler};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = CourtbookerConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting courtbooker");

    // Storage
    let store: Arc<dyn SessionStore> = if config.persistence_enabled {
        Arc::new(PostgresStore::connect(&config.database).await?)
    } else {
        tracing::warn!("persistence disabled, sessions are kept in memory");
        Arc::new(MemoryStore::new())
    };

    // Build domain layer
    let registry = Arc::new(RunRegistry::new());
    let event_bus = EventBus::new(config.event_bus_capacity);
    let launcher = Arc::new(WebDriverLauncher::new(
        config.webdriver_url.clone(),
        config.browser_headless,
    ));

    // Build service layer
    let scrape_service = Arc::new(ScrapeService::new(
        Arc::clone(&store),
        ScrapeRunner::new(launcher),
        registry,
        event_bus.clone(),
        config.sources.clone(),
        config.refresh_cooldown_minutes,
    ));
    let distances = config.google_maps_api_key.as_deref().map(|key| {
        let provider: Arc<dyn DistanceProvider> = Arc::new(GoogleDistanceMatrix::new(key));
        provider
    });
    let court_service = Arc::new(CourtService::new(store, distances, config.peak.clone()));

    // Notifications
    let notifier: Arc<dyn Notifier> = match &config.email {
        Some(email) => Arc::new(SmtpNotifier::new(email)?),
        None => {
            tracing::info!("email not configured, notifications go to the log");
            Arc::new(LogNotifier)
        }
    };
    let _notifier = spawn_notifier(&event_bus, notifier, config.peak.clone());

    if config.scheduler_enabled {
        let _scheduler = spawn_scheduler(Arc::clone(&scrape_service), config.schedule_hour);
    }

    // Build application state
    let app_state = AppState {
        scrape_service,
        court_service,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
