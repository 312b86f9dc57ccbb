use async_trait::async_trait;
use cove_shared::Masked;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Template discriminator for outbound notifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    RequestReceived,
    RequestSubmitted,
    ReservationApproved,
    ReservationDeclined,
    ReservationExpired,
    PaymentExpired,
    MinimumNotMet,
    MinimumNotMetSupplier,
    BookingConfirmedGuest,
    BookingConfirmedSupplier,
    BookingConfirmedHotel,
    BookingCompleted,
    BookingRefunded,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("No recipient resolvable for {0:?}")]
    NoRecipient(NotificationKind),
}

/// Outbound notification boundary (email under the hood). Delivery is
/// best-effort: state transitions never block on it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        payload: Value,
    ) -> Result<(), NotifyError>;
}

/// Send a notification and swallow any failure, logging it instead. Used for
/// every transition-triggered notification so a mail outage never fails a
/// booking operation.
pub async fn notify_best_effort(
    notifier: &dyn Notifier,
    kind: NotificationKind,
    recipient: &str,
    payload: Value,
) {
    if let Err(err) = notifier.notify(kind, recipient, payload).await {
        tracing::warn!(?kind, recipient = ?Masked(recipient), %err, "notification send failed");
    }
}
