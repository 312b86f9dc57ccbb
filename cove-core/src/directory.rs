use async_trait::async_trait;
use uuid::Uuid;

/// Contact details for the supplier behind an experience.
#[derive(Debug, Clone)]
pub struct SupplierContact {
    pub email: String,
    /// Payment-processor onboarding complete; accepting requests requires this
    pub payouts_enabled: bool,
}

/// Lookup boundary for notification recipients and onboarding state.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn supplier_for_experience(
        &self,
        experience_id: Uuid,
    ) -> Result<Option<SupplierContact>, Box<dyn std::error::Error + Send + Sync>>;

    /// Hotel notification address. `None` is a legitimate answer; hotel
    /// notifications are best-effort.
    async fn hotel_email(
        &self,
        hotel_id: Uuid,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>>;
}
