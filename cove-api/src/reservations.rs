use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use cove_booking::{CreateReservation, Reservation};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(create_reservation))
        .route("/v1/reservations/{id}", get(get_reservation))
        .route("/v1/reservations/{id}/accept", post(accept_reservation))
        .route("/v1/reservations/{id}/decline", post(decline_reservation))
}

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub experience_id: Uuid,
    pub session_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_email: String,
    pub hotel_id: Option<Uuid>,
    pub participants: i32,
    pub rental_days: Option<i32>,
    pub quantity: Option<i32>,
    pub requested_date: Option<NaiveDate>,
    pub requested_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActionToken {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct DeclineRequest {
    pub message: Option<String>,
}

async fn create_reservation(
    State(state): State<AppState>,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation = state
        .manager
        .create(CreateReservation {
            experience_id: payload.experience_id,
            session_id: payload.session_id,
            guest_name: payload.guest_name,
            guest_email: payload.guest_email,
            hotel_id: payload.hotel_id,
            participants: payload.participants,
            rental_days: payload.rental_days,
            quantity: payload.quantity,
            requested_date: payload.requested_date,
            requested_time: payload.requested_time,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = state.manager.get(id).await?;
    Ok(Json(reservation))
}

async fn accept_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActionToken>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = state.manager.accept(id, &query.token).await?;
    Ok(Json(reservation))
}

async fn decline_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActionToken>,
    body: Option<Json<DeclineRequest>>,
) -> Result<Json<Reservation>, AppError> {
    let message = body.and_then(|Json(b)| b.message);
    let reservation = state.manager.decline(id, &query.token, message).await?;
    Ok(Json(reservation))
}
