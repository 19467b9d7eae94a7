//! System endpoints: health check and active classifier settings.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Active classification and aggregation settings.
#[derive(Debug, Serialize, ToSchema)]
pub struct ClassifierInfo {
    alert_threshold_pct: f64,
    urgent_threshold_pct: f64,
    baseline_lookback_days: u32,
    badge_window_hours: i64,
    scheduler_interval_secs: u64,
    dedupe_per_period: bool,
    tracked_routes: Vec<String>,
}

/// `GET /config/classifier` — Active classifier settings.
#[utoipa::path(
    get,
    path = "/config/classifier",
    tag = "System",
    summary = "Classifier settings",
    description = "Returns the threshold bands, baseline lookback, badge window and scheduler cadence in effect.",
    responses(
        (status = 200, description = "Active settings", body = ClassifierInfo),
    )
)]
pub async fn classifier_handler(State(state): State<AppState>) -> impl IntoResponse {
    let thresholds = state.classifier.thresholds();
    let settings = state.scheduler.settings();
    (
        StatusCode::OK,
        Json(ClassifierInfo {
            alert_threshold_pct: thresholds.alert_pct(),
            urgent_threshold_pct: thresholds.urgent_pct(),
            baseline_lookback_days: settings.lookback_days,
            badge_window_hours: state.badge_service.window().num_hours(),
            scheduler_interval_secs: settings.interval.as_secs(),
            dedupe_per_period: settings.dedupe_per_period,
            tracked_routes: settings.routes.iter().map(ToString::to_string).collect(),
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/config/classifier", get(classifier_handler))
}
