//! Event log handler (read-only audit view).

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{EventListResponse, EventQueryParams};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, ServiceError};
use crate::persistence::EventStore;

/// `GET /events` — Read back stored events, newest first.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidRequest`] for inconsistent filters and
/// [`ServiceError::PersistenceError`] if the store read fails.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    description = "Returns stored notification events, newest first, optionally filtered by route and start time.",
    params(EventQueryParams),
    responses(
        (status = 200, description = "Matching events", body = EventListResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 500, description = "Event store unreadable", body = ErrorResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventQueryParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let query = params.to_query()?;
    let data = state.store.query(&query).await?;
    Ok(Json(EventListResponse {
        count: data.len(),
        data,
    }))
}

/// Event log routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(list_events))
}
