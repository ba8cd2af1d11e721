//! Data Transfer Objects for REST request/response serialization.
//!
//! Prices are serialized as decimal strings (`"5.50"`) and session times
//! as local date-times without an offset.

pub mod court_dto;
pub mod run_dto;

pub use court_dto::*;
pub use run_dto::*;
