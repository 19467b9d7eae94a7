//! REST endpoint handlers organized by resource.

pub mod badges;
pub mod events;
pub mod scheduler;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(badges::routes())
        .merge(events::routes())
        .merge(scheduler::routes())
}
