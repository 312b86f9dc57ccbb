use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pricing models an experience can carry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    PerPerson,
    FlatRate,
    BasePlusExtra,
    PerDay,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    Flexible,
    Moderate,
    Strict,
}

/// A bookable product offered by a supplier. Financial fields are immutable
/// once sessions or reservations reference the experience; price changes never
/// retroactively affect existing reservations (each reservation snapshots its
/// computed total).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub name: String,
    pub pricing_model: PricingModel,
    /// Base price for flat_rate and base_plus_extra
    pub base_price_cents: i64,
    /// Per-person unit price; also the unit for per_person itself
    pub extra_person_cents: i64,
    /// Per-day unit price for per_day (rental) experiences
    pub price_per_day_cents: i64,
    /// Participants covered by the base price (base_plus_extra only)
    pub included_participants: i32,
    pub min_participants: i32,
    pub max_participants: i32,
    /// Rental bounds, per_day only
    pub min_days: i32,
    pub max_days: i32,
    pub currency: String,
    pub cancellation_policy: CancellationPolicy,
    /// Whether guests may submit free-form time/date requests
    pub allows_requests: bool,
    pub is_active: bool,
}

impl Experience {
    /// Sessions for this experience hold spots at creation time and stay
    /// conditionally cancellable until the threshold is met.
    pub fn enforces_minimum(&self) -> bool {
        self.min_participants > 1
    }
}

#[async_trait]
pub trait ExperienceStore: Send + Sync {
    async fn insert(
        &self,
        experience: &Experience,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Experience>, Box<dyn std::error::Error + Send + Sync>>;
}

/// In-memory experience store for tests and local runs.
#[derive(Default)]
pub struct InMemoryExperienceStore {
    experiences: tokio::sync::Mutex<std::collections::HashMap<Uuid, Experience>>,
}

#[async_trait]
impl ExperienceStore for InMemoryExperienceStore {
    async fn insert(
        &self,
        experience: &Experience,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.experiences
            .lock()
            .await
            .insert(experience.id, experience.clone());
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Experience>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.experiences.lock().await.get(&id).cloned())
    }
}
