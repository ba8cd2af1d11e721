//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::DataSourceConfig;
use crate::service::{CourtService, ScrapeService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Scrape runs and refreshes.
    pub scrape_service: Arc<ScrapeService>,
    /// Availability queries.
    pub court_service: Arc<CourtService>,
}

impl AppState {
    /// Configured data sources.
    #[must_use]
    pub fn sources(&self) -> &[DataSourceConfig] {
        self.scrape_service.sources()
    }
}
