use crate::models::{Booking, BookingStatus, Distribution, Reservation, ReservationStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Reservation persistence. Implementations must make `transition` an atomic
/// compare-and-set on the status column; it is the guard that serializes
/// concurrent accept/decline/sweep races on the same reservation.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn insert(&self, reservation: &Reservation) -> StoreResult<()>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Reservation>>;

    /// Full-row update; status changes still go through `transition` first
    async fn save(&self, reservation: &Reservation) -> StoreResult<()>;

    /// Guarded status flip. Returns false when the row is no longer in
    /// `from`, in which case the caller must treat the record as already
    /// processed.
    async fn transition(
        &self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> StoreResult<bool>;

    /// Compensating delete for partially-created reservations
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    async fn find_pending_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>>;

    async fn find_approved_unpaid(&self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>>;

    async fn find_pending_minimum(&self) -> StoreResult<Vec<Reservation>>;
}

/// Booking persistence. `insert_if_absent` is the idempotency gate for
/// duplicate payment webhooks: reservation_id is unique, and a second insert
/// is reported back instead of applied.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Returns false when a booking for the same reservation already exists.
    async fn insert_if_absent(&self, booking: &Booking) -> StoreResult<bool>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn get_by_reservation(&self, reservation_id: Uuid) -> StoreResult<Option<Booking>>;

    /// Guarded status flip, same contract as `ReservationStore::transition`
    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<bool>;

    /// Whether any booking references the session; guards session deletion
    async fn exists_for_session(&self, session_id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait DistributionStore: Send + Sync {
    async fn insert(&self, distribution: &Distribution) -> StoreResult<()>;

    async fn find(
        &self,
        experience_id: Uuid,
        hotel_id: Uuid,
    ) -> StoreResult<Option<Distribution>>;
}
