use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A hosted checkout link created with the payment processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: String, // Provider's ID (e.g., plink_123)
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentLinkRequest {
    pub reservation_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Capability boundary to the payment processor. The platform never touches
/// card data; it creates hosted links and reacts to the processor's
/// asynchronous success/failure signals (delivered via webhook, possibly more
/// than once).
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted payment link for an approved reservation
    async fn create_payment_link(
        &self,
        request: &PaymentLinkRequest,
    ) -> Result<PaymentLink, Box<dyn std::error::Error + Send + Sync>>;

    /// Release held funds to the supplier after a completed experience
    async fn release_payout(
        &self,
        payment_reference: &str,
        amount_cents: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Refund the guest in full (experience did not take place)
    async fn refund(
        &self,
        payment_reference: &str,
        amount_cents: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
