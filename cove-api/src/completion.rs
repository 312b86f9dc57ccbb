use axum::{
    extract::{Path, Query, State},
    routing::post,
    Json, Router,
};
use cove_booking::Booking;
use uuid::Uuid;

use crate::error::AppError;
use crate::reservations::ActionToken;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/{id}/complete", post(complete_booking))
        .route("/v1/bookings/{id}/no-experience", post(report_no_experience))
}

async fn complete_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActionToken>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.completion.complete(id, &query.token).await?;
    Ok(Json(booking))
}

async fn report_no_experience(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActionToken>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.completion.report_no_experience(id, &query.token).await?;
    Ok(Json(booking))
}
