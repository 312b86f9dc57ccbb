use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use cove_booking::repository::ReservationStore;
use cove_booking::{Reservation, ReservationStatus};
use sqlx::PgPool;
use uuid::Uuid;

pub struct StoreReservationRepository {
    pool: PgPool,
}

impl StoreReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    experience_id: Uuid,
    session_id: Option<Uuid>,
    guest_name: String,
    guest_email: String,
    hotel_id: Option<Uuid>,
    participants: i32,
    rental_days: Option<i32>,
    quantity: Option<i32>,
    requested_date: Option<NaiveDate>,
    requested_time: Option<String>,
    total_cents: i64,
    currency: String,
    status: String,
    response_deadline: DateTime<Utc>,
    payment_deadline: Option<DateTime<Utc>>,
    spots_held: i32,
    supplier_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn status_str(status: ReservationStatus) -> &'static str {
    match status {
        ReservationStatus::Pending => "PENDING",
        ReservationStatus::PendingMinimum => "PENDING_MINIMUM",
        ReservationStatus::Approved => "APPROVED",
        ReservationStatus::Declined => "DECLINED",
        ReservationStatus::Expired => "EXPIRED",
        ReservationStatus::CancelledMinimum => "CANCELLED_MINIMUM",
    }
}

fn parse_status(s: &str) -> Result<ReservationStatus, Box<dyn std::error::Error + Send + Sync>> {
    match s {
        "PENDING" => Ok(ReservationStatus::Pending),
        "PENDING_MINIMUM" => Ok(ReservationStatus::PendingMinimum),
        "APPROVED" => Ok(ReservationStatus::Approved),
        "DECLINED" => Ok(ReservationStatus::Declined),
        "EXPIRED" => Ok(ReservationStatus::Expired),
        "CANCELLED_MINIMUM" => Ok(ReservationStatus::CancelledMinimum),
        other => Err(format!("Unknown reservation status: {other}").into()),
    }
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = Box<dyn std::error::Error + Send + Sync>;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Reservation {
            id: row.id,
            experience_id: row.experience_id,
            session_id: row.session_id,
            guest_name: row.guest_name,
            guest_email: row.guest_email,
            hotel_id: row.hotel_id,
            participants: row.participants,
            rental_days: row.rental_days,
            quantity: row.quantity,
            requested_date: row.requested_date,
            requested_time: row.requested_time,
            total_cents: row.total_cents,
            currency: row.currency,
            status: parse_status(&row.status)?,
            response_deadline: row.response_deadline,
            payment_deadline: row.payment_deadline,
            spots_held: row.spots_held,
            supplier_message: row.supplier_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ReservationStore for StoreReservationRepository {
    async fn insert(
        &self,
        reservation: &Reservation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, experience_id, session_id, guest_name, guest_email, hotel_id,
                participants, rental_days, quantity, requested_date, requested_time,
                total_cents, currency, status, response_deadline, payment_deadline,
                spots_held, supplier_message, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.experience_id)
        .bind(reservation.session_id)
        .bind(&reservation.guest_name)
        .bind(&reservation.guest_email)
        .bind(reservation.hotel_id)
        .bind(reservation.participants)
        .bind(reservation.rental_days)
        .bind(reservation.quantity)
        .bind(reservation.requested_date)
        .bind(&reservation.requested_time)
        .bind(reservation.total_cents)
        .bind(&reservation.currency)
        .bind(status_str(reservation.status))
        .bind(reservation.response_deadline)
        .bind(reservation.payment_deadline)
        .bind(reservation.spots_held)
        .bind(&reservation.supplier_message)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(
        &self,
        id: Uuid,
    ) -> Result<Option<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        let row: Option<ReservationRow> =
            sqlx::query_as("SELECT * FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Reservation::try_from).transpose()
    }

    async fn save(
        &self,
        reservation: &Reservation,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(
            r#"
            UPDATE reservations
            SET session_id = $2, status = $3, payment_deadline = $4, spots_held = $5,
                supplier_message = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.session_id)
        .bind(status_str(reservation.status))
        .bind(reservation.payment_deadline)
        .bind(reservation.spots_held)
        .bind(&reservation.supplier_message)
        .bind(reservation.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        // Conditional update is the compare-and-set; no row lock held across
        // the application round-trip
        let result = sqlx::query(
            "UPDATE reservations SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(status_str(from))
        .bind(status_str(to))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_pending_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            "SELECT * FROM reservations WHERE status = 'PENDING' AND response_deadline < $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn find_approved_unpaid(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(
            "SELECT * FROM reservations WHERE status = 'APPROVED' AND payment_deadline < $1",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn find_pending_minimum(
        &self,
    ) -> Result<Vec<Reservation>, Box<dyn std::error::Error + Send + Sync>> {
        let rows: Vec<ReservationRow> =
            sqlx::query_as("SELECT * FROM reservations WHERE status = 'PENDING_MINIMUM'")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Reservation::try_from).collect()
    }
}
