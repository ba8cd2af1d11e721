//! REST endpoint handlers organized by resource.

pub mod courts;
pub mod html;
pub mod runs;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().merge(courts::routes()).merge(runs::routes())
}
