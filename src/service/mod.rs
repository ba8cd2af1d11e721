//! Service layer: business logic orchestration.
//!
//! [`ScrapeService`] runs scrapes, stores their results and emits events
//! through the [`super::domain::EventBus`]. [`CourtService`] answers
//! availability queries over what was stored.

pub mod court_service;
pub mod scrape_service;

pub use court_service::{CourtFilter, CourtService, LocationFilter};
pub use scrape_service::{ScrapeService, next_run_after, scrape_dates, spawn_scheduler};
