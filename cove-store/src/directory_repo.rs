use async_trait::async_trait;
use cove_core::directory::{Directory, SupplierContact};
use sqlx::PgPool;
use uuid::Uuid;

/// Contact resolution backed by the suppliers/hotels tables.
pub struct StoreDirectoryRepository {
    pool: PgPool,
}

impl StoreDirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SupplierRow {
    email: String,
    payouts_enabled: bool,
}

#[async_trait]
impl Directory for StoreDirectoryRepository {
    async fn supplier_for_experience(
        &self,
        experience_id: Uuid,
    ) -> Result<Option<SupplierContact>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<SupplierRow> = sqlx::query_as(
            r#"
            SELECT s.email, s.payouts_enabled
            FROM suppliers s
            JOIN experiences e ON e.supplier_id = s.id
            WHERE e.id = $1
            "#,
        )
        .bind(experience_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| SupplierContact {
            email: r.email,
            payouts_enabled: r.payouts_enabled,
        }))
    }

    async fn hotel_email(
        &self,
        hotel_id: Uuid,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT email FROM hotels WHERE id = $1")
            .bind(hotel_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }
}
