use async_trait::async_trait;
use cove_core::notify::{NotificationKind, Notifier, NotifyError};
use serde_json::Value;

/// Notifier that hands payloads to the log stream. Mail rendering and
/// delivery live in a separate service that tails these records; the booking
/// core only decides who hears about what.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        payload: Value,
    ) -> Result<(), NotifyError> {
        tracing::info!(?kind, recipient, %payload, "outbound notification");
        Ok(())
    }
}
