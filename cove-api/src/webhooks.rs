use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use cove_booking::BookingError;
use serde::Deserialize;
use uuid::Uuid;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: PaymentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentObject {
    pub id: String,
    pub metadata: Option<PaymentMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentMetadata {
    pub reservation_id: Option<Uuid>,
}

/// POST /v1/webhooks/payments
/// Receive payment status updates from the processor. Always answers 200 for
/// recognized-but-unactionable events so the processor stops retrying;
/// duplicate success deliveries are a no-op inside the manager.
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<PaymentWebhook>,
) -> Result<StatusCode, StatusCode> {
    tracing::info!(
        "Received webhook: {} for object {}",
        payload.type_,
        payload.data.object.id
    );

    let reservation_id = match payload.data.object.metadata.and_then(|m| m.reservation_id) {
        Some(id) => id,
        None => {
            tracing::warn!(event = %payload.id, "webhook carries no reservation_id; ignored");
            return Ok(StatusCode::OK);
        }
    };

    match payload.type_.as_str() {
        "payment_link.paid" | "payment_intent.succeeded" => {
            let result = state
                .manager
                .handle_payment_success(reservation_id, &payload.data.object.id)
                .await;
            match result {
                Ok(_) => {}
                // A retry can never make an unknown reservation appear
                Err(BookingError::NotFound(_)) => {
                    tracing::warn!(%reservation_id, "payment success for unknown reservation; acknowledged");
                }
                Err(err) => {
                    tracing::error!(%reservation_id, %err, "payment success handling failed");
                    return Err(StatusCode::INTERNAL_SERVER_ERROR);
                }
            }
        }
        "payment_intent.payment_failed" | "payment_intent.canceled" => {
            match state.manager.handle_payment_failure(reservation_id).await {
                Ok(_) => {}
                Err(BookingError::NotFound(_)) => {
                    tracing::warn!(%reservation_id, "payment failure for unknown reservation; acknowledged");
                }
                Err(err) => {
                    tracing::error!(%reservation_id, %err, "payment failure handling failed");
                    return Err(StatusCode::INTERNAL_SERVER_ERROR);
                }
            }
        }
        other => {
            tracing::debug!(event_type = other, "unhandled webhook event type");
        }
    }

    Ok(StatusCode::OK)
}
