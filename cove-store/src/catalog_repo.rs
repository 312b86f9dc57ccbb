use async_trait::async_trait;
use cove_catalog::experience::{CancellationPolicy, Experience, ExperienceStore, PricingModel};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreExperienceRepository {
    pool: PgPool,
}

impl StoreExperienceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ExperienceRow {
    id: Uuid,
    supplier_id: Uuid,
    name: String,
    pricing_model: String,
    base_price_cents: i64,
    extra_person_cents: i64,
    price_per_day_cents: i64,
    included_participants: i32,
    min_participants: i32,
    max_participants: i32,
    min_days: i32,
    max_days: i32,
    currency: String,
    cancellation_policy: String,
    allows_requests: bool,
    is_active: bool,
}

fn model_str(model: PricingModel) -> &'static str {
    match model {
        PricingModel::PerPerson => "per_person",
        PricingModel::FlatRate => "flat_rate",
        PricingModel::BasePlusExtra => "base_plus_extra",
        PricingModel::PerDay => "per_day",
    }
}

fn parse_model(s: &str) -> Result<PricingModel, Box<dyn std::error::Error + Send + Sync>> {
    match s {
        "per_person" => Ok(PricingModel::PerPerson),
        "flat_rate" => Ok(PricingModel::FlatRate),
        "base_plus_extra" => Ok(PricingModel::BasePlusExtra),
        "per_day" => Ok(PricingModel::PerDay),
        other => Err(format!("Unknown pricing model: {other}").into()),
    }
}

fn policy_str(policy: CancellationPolicy) -> &'static str {
    match policy {
        CancellationPolicy::Flexible => "flexible",
        CancellationPolicy::Moderate => "moderate",
        CancellationPolicy::Strict => "strict",
    }
}

fn parse_policy(s: &str) -> Result<CancellationPolicy, Box<dyn std::error::Error + Send + Sync>> {
    match s {
        "flexible" => Ok(CancellationPolicy::Flexible),
        "moderate" => Ok(CancellationPolicy::Moderate),
        "strict" => Ok(CancellationPolicy::Strict),
        other => Err(format!("Unknown cancellation policy: {other}").into()),
    }
}

impl TryFrom<ExperienceRow> for Experience {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: ExperienceRow) -> Result<Self, Self::Error> {
        Ok(Experience {
            id: row.id,
            supplier_id: row.supplier_id,
            name: row.name,
            pricing_model: parse_model(&row.pricing_model)?,
            base_price_cents: row.base_price_cents,
            extra_person_cents: row.extra_person_cents,
            price_per_day_cents: row.price_per_day_cents,
            included_participants: row.included_participants,
            min_participants: row.min_participants,
            max_participants: row.max_participants,
            min_days: row.min_days,
            max_days: row.max_days,
            currency: row.currency,
            cancellation_policy: parse_policy(&row.cancellation_policy)?,
            allows_requests: row.allows_requests,
            is_active: row.is_active,
        })
    }
}

#[async_trait]
impl ExperienceStore for StoreExperienceRepository {
    async fn insert(
        &self,
        experience: &Experience,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO experiences (
                id, supplier_id, name, pricing_model, base_price_cents,
                extra_person_cents, price_per_day_cents, included_participants,
                min_participants, max_participants, min_days, max_days,
                currency, cancellation_policy, allows_requests, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(experience.id)
        .bind(experience.supplier_id)
        .bind(&experience.name)
        .bind(model_str(experience.pricing_model))
        .bind(experience.base_price_cents)
        .bind(experience.extra_person_cents)
        .bind(experience.price_per_day_cents)
        .bind(experience.included_participants)
        .bind(experience.min_participants)
        .bind(experience.max_participants)
        .bind(experience.min_days)
        .bind(experience.max_days)
        .bind(&experience.currency)
        .bind(policy_str(experience.cancellation_policy))
        .bind(experience.allows_requests)
        .bind(experience.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Experience>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<ExperienceRow> =
            sqlx::query_as("SELECT * FROM experiences WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Experience::try_from).transpose()
    }
}
