use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use chrono::Utc;
use cove_booking::SweepSummary;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/tasks/sweep", post(run_sweep))
}

/// POST /v1/tasks/sweep
/// Scheduler-triggered deadline enforcement. Guarded by a shared secret in
/// the `x-task-secret` header; when no secret is configured the deployment
/// trusts its scheduler boundary and the endpoint is open.
async fn run_sweep(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SweepSummary>, StatusCode> {
    if let Some(expected) = &state.sweep_secret {
        let presented = headers
            .get("x-task-secret")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if presented != expected {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }

    let summary = state.sweeper.run(Utc::now()).await;
    Ok(Json(summary))
}
