use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cove_booking::repository::{BookingStore, DistributionStore};
use cove_booking::{Booking, BookingStatus, Distribution};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    reservation_id: Uuid,
    session_id: Uuid,
    amount_cents: i64,
    supplier_cents: i64,
    hotel_cents: i64,
    platform_cents: i64,
    currency: String,
    payment_reference: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn status_str(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Confirmed => "CONFIRMED",
        BookingStatus::Completed => "COMPLETED",
        BookingStatus::Cancelled => "CANCELLED",
    }
}

fn parse_status(s: &str) -> Result<BookingStatus, Box<dyn std::error::Error + Send + Sync>> {
    match s {
        "CONFIRMED" => Ok(BookingStatus::Confirmed),
        "COMPLETED" => Ok(BookingStatus::Completed),
        "CANCELLED" => Ok(BookingStatus::Cancelled),
        other => Err(format!("Unknown booking status: {other}").into()),
    }
}

impl TryFrom<BookingRow> for Booking {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            reservation_id: row.reservation_id,
            session_id: row.session_id,
            amount_cents: row.amount_cents,
            supplier_cents: row.supplier_cents,
            hotel_cents: row.hotel_cents,
            platform_cents: row.platform_cents,
            currency: row.currency,
            payment_reference: row.payment_reference,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl BookingStore for StoreBookingRepository {
    async fn insert_if_absent(
        &self,
        booking: &Booking,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        // The unique index on reservation_id is the idempotency gate; a
        // duplicate webhook delivery inserts zero rows
        let result = sqlx::query(
            r#"
            INSERT INTO bookings (
                id, reservation_id, session_id, amount_cents, supplier_cents,
                hotel_cents, platform_cents, currency, payment_reference, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (reservation_id) DO NOTHING
            "#,
        )
        .bind(booking.id)
        .bind(booking.reservation_id)
        .bind(booking.session_id)
        .bind(booking.amount_cents)
        .bind(booking.supplier_cents)
        .bind(booking.hotel_cents)
        .bind(booking.platform_cents)
        .bind(&booking.currency)
        .bind(&booking.payment_reference)
        .bind(status_str(booking.status))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<BookingRow> = sqlx::query_as("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn get_by_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<BookingRow> =
            sqlx::query_as("SELECT * FROM bookings WHERE reservation_id = $1")
                .bind(reservation_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(status_str(from))
        .bind(status_str(to))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn exists_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM bookings WHERE session_id = $1)")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists.0)
    }
}

pub struct StoreDistributionRepository {
    pool: PgPool,
}

impl StoreDistributionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DistributionRow {
    id: Uuid,
    experience_id: Uuid,
    hotel_id: Uuid,
    supplier_pct: i32,
    hotel_pct: i32,
    platform_pct: i32,
}

impl From<DistributionRow> for Distribution {
    fn from(row: DistributionRow) -> Self {
        Distribution {
            id: row.id,
            experience_id: row.experience_id,
            hotel_id: row.hotel_id,
            supplier_pct: row.supplier_pct,
            hotel_pct: row.hotel_pct,
            platform_pct: row.platform_pct,
        }
    }
}

#[async_trait]
impl DistributionStore for StoreDistributionRepository {
    async fn insert(
        &self,
        distribution: &Distribution,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO distributions (id, experience_id, hotel_id, supplier_pct, hotel_pct, platform_pct)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(distribution.id)
        .bind(distribution.experience_id)
        .bind(distribution.hotel_id)
        .bind(distribution.supplier_pct)
        .bind(distribution.hotel_pct)
        .bind(distribution.platform_pct)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(
        &self,
        experience_id: Uuid,
        hotel_id: Uuid,
    ) -> Result<Option<Distribution>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<DistributionRow> = sqlx::query_as(
            "SELECT * FROM distributions WHERE experience_id = $1 AND hotel_id = $2",
        )
        .bind(experience_id)
        .bind(hotel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Distribution::from))
    }
}
