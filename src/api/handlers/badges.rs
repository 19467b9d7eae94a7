//! Badge view handlers: list, get, refresh.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{BadgeListResponse, RoutePath};
use crate::app_state::AppState;
use crate::domain::Badge;
use crate::error::{ErrorResponse, ServiceError};

/// `GET /badges` — Current badge snapshot.
///
/// # Errors
///
/// Never fails; a failed refresh leaves the previous snapshot in place.
#[utoipa::path(
    get,
    path = "/api/v1/badges",
    tag = "Badges",
    summary = "List badges",
    description = "Returns one badge per route with events in the trailing window, as of the last successful refresh.",
    responses(
        (status = 200, description = "Current badge snapshot", body = BadgeListResponse),
    )
)]
pub async fn list_badges(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let snapshot = state.badge_service.snapshot().await;
    Ok(Json(BadgeListResponse::from(&*snapshot)))
}

/// `GET /badges/{origin}/{dest}` — Badge for one route.
///
/// # Errors
///
/// Returns [`ServiceError::BadgeNotFound`] if the route has no in-window
/// events, or [`ServiceError::InvalidRoute`] for malformed segments.
#[utoipa::path(
    get,
    path = "/api/v1/badges/{origin}/{dest}",
    tag = "Badges",
    summary = "Get route badge",
    description = "Returns the badge for a single route. Routes without events in the window have no badge.",
    params(RoutePath),
    responses(
        (status = 200, description = "Route badge", body = Badge),
        (status = 400, description = "Malformed route", body = ErrorResponse),
        (status = 404, description = "No badge for route", body = ErrorResponse),
    )
)]
pub async fn get_badge(
    State(state): State<AppState>,
    Path(path): Path<RoutePath>,
) -> Result<impl IntoResponse, ServiceError> {
    let route = path.route()?;
    let badge = state.badge_service.badge(&route).await?;
    Ok(Json(badge))
}

/// `POST /badges/refresh` — Re-derive the badge view now.
///
/// # Errors
///
/// Returns [`ServiceError::PersistenceError`] if the event store cannot
/// be read; the previous snapshot keeps being served.
#[utoipa::path(
    post,
    path = "/api/v1/badges/refresh",
    tag = "Badges",
    summary = "Refresh badges",
    description = "Recomputes every badge from the event store and returns the new snapshot.",
    responses(
        (status = 200, description = "Refreshed snapshot", body = BadgeListResponse),
        (status = 500, description = "Event store unreadable", body = ErrorResponse),
    )
)]
pub async fn refresh_badges(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let snapshot = state.badge_service.refresh().await?;
    Ok(Json(BadgeListResponse::from(&*snapshot)))
}

/// Badge routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/badges", get(list_badges))
        .route("/badges/refresh", post(refresh_badges))
        .route("/badges/{origin}/{dest}", get(get_badge))
}
