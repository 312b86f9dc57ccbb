use crate::commission::{CommissionRates, CommissionSplit};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reservation status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Awaiting supplier response
    Pending,
    /// Session-based, spots held, below the experience's participant minimum
    PendingMinimum,
    /// Supplier accepted, awaiting payment
    Approved,
    Declined,
    Expired,
    CancelledMinimum,
}

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Declined
                | ReservationStatus::Expired
                | ReservationStatus::CancelledMinimum
        )
    }
}

/// A guest's claim on an experience, prior to payment confirmation. Either
/// references an existing session or is a free-form time/date request that
/// gets a private session synthesized on acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub experience_id: Uuid,
    pub session_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_email: String,
    pub hotel_id: Option<Uuid>,
    pub participants: i32,
    pub rental_days: Option<i32>,
    pub quantity: Option<i32>,
    /// Free-form request fields, set when no session is referenced
    pub requested_date: Option<NaiveDate>,
    pub requested_time: Option<String>,
    /// Snapshot of the computed total; later price changes never touch it
    pub total_cents: i64,
    pub currency: String,
    pub status: ReservationStatus,
    pub response_deadline: DateTime<Utc>,
    pub payment_deadline: Option<DateTime<Utc>>,
    /// Spots currently held on the session ledger for this reservation, so
    /// every release pairs exactly with the reserve that created it
    pub spots_held: i32,
    pub supplier_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn update_status(&mut self, new_status: ReservationStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }

    pub fn is_request(&self) -> bool {
        self.session_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Completed,
    Cancelled,
}

/// The financial confirmation record, created exactly once per reservation
/// when payment succeeds. Its existence is the source of truth for "paid".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub session_id: Uuid,
    pub amount_cents: i64,
    pub supplier_cents: i64,
    pub hotel_cents: i64,
    pub platform_cents: i64,
    pub currency: String,
    pub payment_reference: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        reservation: &Reservation,
        session_id: Uuid,
        split: &CommissionSplit,
        payment_reference: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reservation_id: reservation.id,
            session_id,
            amount_cents: reservation.total_cents,
            supplier_cents: split.supplier_cents,
            hotel_cents: split.hotel_cents,
            platform_cents: split.platform_cents,
            currency: reservation.currency.clone(),
            payment_reference,
            status: BookingStatus::Confirmed,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Commission-rate agreement between a supplier's experience and a hotel
/// channel. Percentages should sum to 100; any shortfall or excess is
/// absorbed by the platform share, never supplier or hotel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub id: Uuid,
    pub experience_id: Uuid,
    pub hotel_id: Uuid,
    pub supplier_pct: i32,
    pub hotel_pct: i32,
    pub platform_pct: i32,
}

impl Distribution {
    pub fn rates(&self) -> CommissionRates {
        CommissionRates {
            supplier_pct: self.supplier_pct,
            hotel_pct: self.hotel_pct,
            platform_pct: self.platform_pct,
        }
    }
}
