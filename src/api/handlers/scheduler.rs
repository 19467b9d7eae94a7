//! On-demand scheduler trigger.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::error::{ErrorResponse, ServiceError};
use crate::service::RunReport;

/// `POST /scheduler/run` — Run one scheduler pass now.
///
/// # Errors
///
/// Returns [`ServiceError::SourceUnavailable`] if the price source is
/// down.
#[utoipa::path(
    post,
    path = "/api/v1/scheduler/run",
    tag = "Scheduler",
    summary = "Run scheduler pass",
    description = "Evaluates every tracked route immediately, appends any events produced and returns the run report. Per-route failures are reported, not raised.",
    responses(
        (status = 200, description = "Run finished", body = RunReport),
        (status = 503, description = "Price source unavailable", body = ErrorResponse),
    )
)]
pub async fn run_scheduler(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let report = state.scheduler.run_once().await?;
    Ok(Json(report))
}

/// Scheduler routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/scheduler/run", post(run_scheduler))
}
