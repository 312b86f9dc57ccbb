//! In-memory adapters for the booking stores and boundary capabilities.
//! Used by the integration tests and for store-less local runs.

use crate::models::{Booking, BookingStatus, Distribution, Reservation, ReservationStatus};
use crate::repository::{BookingStore, DistributionStore, ReservationStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cove_core::directory::{Directory, SupplierContact};
use cove_core::notify::{NotificationKind, Notifier, NotifyError};
use cove_core::payment::{PaymentLink, PaymentLinkRequest, PaymentProvider};
use cove_core::token::{LinkClaims, TokenError, TokenService};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

type StoreResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Default)]
pub struct InMemoryReservationStore {
    reservations: Mutex<HashMap<Uuid, Reservation>>,
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert(&self, reservation: &Reservation) -> StoreResult<()> {
        self.reservations
            .lock()
            .await
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Reservation>> {
        Ok(self.reservations.lock().await.get(&id).cloned())
    }

    async fn save(&self, reservation: &Reservation) -> StoreResult<()> {
        self.reservations
            .lock()
            .await
            .insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> StoreResult<bool> {
        let mut reservations = self.reservations.lock().await;
        match reservations.get_mut(&id) {
            Some(r) if r.status == from => {
                r.update_status(to);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.reservations.lock().await.remove(&id);
        Ok(())
    }

    async fn find_pending_expired(&self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .lock()
            .await
            .values()
            .filter(|r| r.status == ReservationStatus::Pending && r.response_deadline < now)
            .cloned()
            .collect())
    }

    async fn find_approved_unpaid(&self, now: DateTime<Utc>) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .lock()
            .await
            .values()
            .filter(|r| {
                r.status == ReservationStatus::Approved
                    && r.payment_deadline.is_some_and(|d| d < now)
            })
            .cloned()
            .collect())
    }

    async fn find_pending_minimum(&self) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .reservations
            .lock()
            .await
            .values()
            .filter(|r| r.status == ReservationStatus::PendingMinimum)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<HashMap<Uuid, Booking>>,
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert_if_absent(&self, booking: &Booking) -> StoreResult<bool> {
        let mut bookings = self.bookings.lock().await;
        if bookings
            .values()
            .any(|b| b.reservation_id == booking.reservation_id)
        {
            return Ok(false);
        }
        bookings.insert(booking.id, booking.clone());
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.lock().await.get(&id).cloned())
    }

    async fn get_by_reservation(&self, reservation_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self
            .bookings
            .lock()
            .await
            .values()
            .find(|b| b.reservation_id == reservation_id)
            .cloned())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> StoreResult<bool> {
        let mut bookings = self.bookings.lock().await;
        match bookings.get_mut(&id) {
            Some(b) if b.status == from => {
                b.status = to;
                b.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn exists_for_session(&self, session_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .bookings
            .lock()
            .await
            .values()
            .any(|b| b.session_id == session_id))
    }
}

#[derive(Default)]
pub struct InMemoryDistributionStore {
    distributions: Mutex<Vec<Distribution>>,
}

#[async_trait]
impl DistributionStore for InMemoryDistributionStore {
    async fn insert(&self, distribution: &Distribution) -> StoreResult<()> {
        self.distributions.lock().await.push(distribution.clone());
        Ok(())
    }

    async fn find(
        &self,
        experience_id: Uuid,
        hotel_id: Uuid,
    ) -> StoreResult<Option<Distribution>> {
        Ok(self
            .distributions
            .lock()
            .await
            .iter()
            .find(|d| d.experience_id == experience_id && d.hotel_id == hotel_id)
            .cloned())
    }
}

/// Payment provider double: hands out deterministic links, records payout and
/// refund calls, and can be toggled to fail link creation.
#[derive(Default)]
pub struct MockPaymentProvider {
    pub fail_link_creation: AtomicBool,
    pub links: Mutex<Vec<PaymentLinkRequest>>,
    pub payouts: Mutex<Vec<(String, i64)>>,
    pub refunds: Mutex<Vec<(String, i64)>>,
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment_link(
        &self,
        request: &PaymentLinkRequest,
    ) -> Result<PaymentLink, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_link_creation.load(Ordering::SeqCst) {
            return Err("simulated payment provider outage".into());
        }
        self.links.lock().await.push(request.clone());
        Ok(PaymentLink {
            id: format!("plink_{}", request.reservation_id.simple()),
            url: format!("https://pay.example.test/{}", request.reservation_id),
        })
    }

    async fn release_payout(
        &self,
        payment_reference: &str,
        amount_cents: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.payouts
            .lock()
            .await
            .push((payment_reference.to_string(), amount_cents));
        Ok(())
    }

    async fn refund(
        &self,
        payment_reference: &str,
        amount_cents: i64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.refunds
            .lock()
            .await
            .push((payment_reference.to_string(), amount_cents));
        Ok(())
    }
}

/// Notifier double that records every send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(NotificationKind, String, Value)>>,
}

impl RecordingNotifier {
    pub async fn count(&self, kind: NotificationKind) -> usize {
        self.sent.lock().await.iter().filter(|(k, _, _)| *k == kind).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        kind: NotificationKind,
        recipient: &str,
        payload: Value,
    ) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .await
            .push((kind, recipient.to_string(), payload));
        Ok(())
    }
}

/// Token service double: claims serialized as plain JSON, expiry still
/// enforced. Not for production use; the API crate carries the HS256
/// implementation.
pub struct PlainTokens;

impl TokenService for PlainTokens {
    fn sign(&self, claims: &LinkClaims) -> Result<String, TokenError> {
        serde_json::to_string(claims).map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<LinkClaims, TokenError> {
        let claims: LinkClaims =
            serde_json::from_str(token).map_err(|_| TokenError::Invalid)?;
        if (claims.exp as i64) < Utc::now().timestamp() {
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }
}

/// Directory double with one supplier contact and an optional hotel email.
pub struct StaticDirectory {
    pub supplier: SupplierContact,
    pub hotel: Option<String>,
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self {
            supplier: SupplierContact {
                email: "supplier@example.test".into(),
                payouts_enabled: true,
            },
            hotel: Some("hotel@example.test".into()),
        }
    }
}

#[async_trait]
impl Directory for StaticDirectory {
    async fn supplier_for_experience(
        &self,
        _experience_id: Uuid,
    ) -> Result<Option<SupplierContact>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Some(self.supplier.clone()))
    }

    async fn hotel_email(
        &self,
        _hotel_id: Uuid,
    ) -> Result<Option<String>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.hotel.clone())
    }
}
