//! Domain layer: venues, sessions, filters and run bookkeeping.
//!
//! Everything here is independent of how pages are fetched or where
//! sessions are stored: venue identity, the canonical session record, the
//! double-header filter, the peak-time policy, and the registry and event
//! bus that track scrape runs.

pub mod adjacency;
pub mod cost;
pub mod court_session;
pub mod data_source;
pub mod event_bus;
pub mod peak;
pub mod run_id;
pub mod run_registry;
pub mod scrape_event;
pub mod venue;

pub use adjacency::filter_multi_session;
pub use cost::Cost;
pub use court_session::{CourtSession, ScrapeTask, TaskId, is_mini_court};
pub use data_source::DataSource;
pub use event_bus::EventBus;
pub use peak::PeakTimePolicy;
pub use run_id::RunId;
pub use run_registry::{RunEntry, RunRegistry, RunStatus};
pub use scrape_event::ScrapeEvent;
pub use venue::{Venue, resolve_name};
