//! # courtbooker
//!
//! Tracks public tennis court availability across several booking sites
//! and serves it over a query API.
//!
//! Each booking site lays its availability out differently, so every
//! [`domain::DataSource`] has its own extractor. A scrape run drives one
//! browser session over every (date, venue) page of a source, turns the
//! rendered pages into canonical [`domain::CourtSession`]s and stores them
//! atomically with a task summary. Queries read the sessions of the latest
//! task per source.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, HTML)
//!     │
//!     ├── REST + HTML Handlers (api/)
//!     │
//!     ├── ScrapeService / CourtService (service/)
//!     ├── EventBus ──► Notifier (notify)
//!     │
//!     ├── ScrapeRunner ──► Browser (extract/)
//!     ├── Extractors (extract/)
//!     ├── SessionBatch (normalize)
//!     ├── Distance lookups (location)
//!     │
//!     └── PostgreSQL / in-memory store (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod location;
pub mod normalize;
pub mod notify;
pub mod persistence;
pub mod service;
