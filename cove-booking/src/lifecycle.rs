use crate::commission::{self, CommissionRates};
use crate::models::{Booking, Reservation, ReservationStatus};
use crate::repository::{BookingStore, DistributionStore, ReservationStore};
use chrono::{Duration, NaiveDate, Utc};
use cove_catalog::experience::{Experience, ExperienceStore};
use cove_catalog::inventory::{LedgerError, SessionLedger};
use cove_catalog::pricing::{compute_price, PriceInputs, PricingError};
use cove_catalog::session::{Session, SessionStatus};
use cove_core::directory::Directory;
use cove_core::notify::{notify_best_effort, NotificationKind, Notifier};
use cove_core::payment::{PaymentLinkRequest, PaymentProvider};
use cove_core::token::{LinkClaims, TokenAction, TokenError, TokenService};
use cove_shared::events;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Reservation not found: {0}")]
    NotFound(Uuid),

    #[error("Experience not found: {0}")]
    ExperienceNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(Uuid),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Reservation {id} was already processed (status {status:?})")]
    AlreadyProcessed { id: Uuid, status: ReservationStatus },

    #[error("Booking {0} was already settled")]
    AlreadySettled(Uuid),

    #[error("Supplier payment onboarding is not complete")]
    OnboardingIncomplete,

    #[error("Session {0} has confirmed bookings; cancel it instead of deleting")]
    SessionInUse(Uuid),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for BookingError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        BookingError::Store(err.to_string())
    }
}

/// Deadline and link policy for the lifecycle. Loaded from configuration at
/// process start; the sweeper enforces every deadline, there is no
/// client-side timer.
#[derive(Debug, Clone)]
pub struct BookingRules {
    pub response_deadline_hours: i64,
    pub payment_deadline_hours: i64,
    /// Sessions whose date falls within this window get the
    /// minimum-participant check applied
    pub minimum_cutoff_hours: i64,
    pub completion_token_ttl_hours: i64,
    pub link_base_url: String,
    pub payment_success_url: String,
    pub payment_cancel_url: String,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            response_deadline_hours: 48,
            payment_deadline_hours: 24,
            minimum_cutoff_hours: 48,
            completion_token_ttl_hours: 24 * 30,
            link_base_url: "https://bookings.example.com".into(),
            payment_success_url: "https://bookings.example.com/payment/success".into(),
            payment_cancel_url: "https://bookings.example.com/payment/cancelled".into(),
        }
    }
}

/// Everything the lifecycle services depend on, constructed once at process
/// start and injected. No module-level singletons.
#[derive(Clone)]
pub struct BookingDeps {
    pub reservations: Arc<dyn ReservationStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub distributions: Arc<dyn DistributionStore>,
    pub experiences: Arc<dyn ExperienceStore>,
    pub ledger: SessionLedger,
    pub payments: Arc<dyn PaymentProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub tokens: Arc<dyn TokenService>,
    pub directory: Arc<dyn Directory>,
}

#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub experience_id: Uuid,
    pub session_id: Option<Uuid>,
    pub guest_name: String,
    pub guest_email: String,
    pub hotel_id: Option<Uuid>,
    pub participants: i32,
    pub rental_days: Option<i32>,
    pub quantity: Option<i32>,
    /// Free-form request fields, required when no session is given
    pub requested_date: Option<NaiveDate>,
    pub requested_time: Option<String>,
}

/// Result of applying a payment-success signal. Duplicates and late arrivals
/// are legitimate outcomes, not errors: webhooks may be delivered more than
/// once and may trail the sweep that closed the reservation.
#[derive(Debug)]
pub enum PaymentOutcome {
    Recorded(Booking),
    AlreadyRecorded(Booking),
    /// Payment landed after the reservation was closed; the charge was
    /// refunded and no booking exists.
    RefundedLate,
}

/// The reservation lifecycle orchestrator: validates transitions, computes
/// deadlines, drives inventory holds and payment-link creation, and emits
/// notification events.
pub struct ReservationManager {
    deps: BookingDeps,
    rules: BookingRules,
}

impl ReservationManager {
    pub fn new(deps: BookingDeps, rules: BookingRules) -> Self {
        Self { deps, rules }
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    pub async fn get(&self, id: Uuid) -> Result<Reservation, BookingError> {
        self.deps
            .reservations
            .get(id)
            .await?
            .ok_or(BookingError::NotFound(id))
    }

    /// Create a reservation from a guest action. Session-based reservations
    /// against a minimum-enforcing experience take an optimistic spot hold
    /// and start in `pending_minimum`; everything else starts in `pending`.
    pub async fn create(&self, cmd: CreateReservation) -> Result<Reservation, BookingError> {
        let experience = self
            .deps
            .experiences
            .get(cmd.experience_id)
            .await?
            .ok_or(BookingError::ExperienceNotFound(cmd.experience_id))?;
        if !experience.is_active {
            return Err(BookingError::Validation(
                "Experience is not currently bookable".into(),
            ));
        }
        if cmd.guest_email.trim().is_empty() || !cmd.guest_email.contains('@') {
            return Err(BookingError::Validation("A valid guest email is required".into()));
        }

        let session = match cmd.session_id {
            Some(session_id) => {
                let session = self.deps.ledger.get(session_id).await?;
                if session.experience_id != experience.id {
                    return Err(BookingError::Validation(
                        "Session does not belong to this experience".into(),
                    ));
                }
                if session.status == SessionStatus::Cancelled {
                    return Err(BookingError::Validation("Session is cancelled".into()));
                }
                Some(session)
            }
            None => {
                if !experience.allows_requests {
                    return Err(BookingError::Validation(
                        "Experience does not take free-form requests".into(),
                    ));
                }
                if cmd.requested_date.is_none() {
                    return Err(BookingError::Validation(
                        "A requested date is required for free-form requests".into(),
                    ));
                }
                None
            }
        };

        let inputs = PriceInputs {
            participants: cmd.participants,
            rental_days: cmd.rental_days,
            quantity: cmd.quantity,
        };
        let quote = compute_price(&experience, &inputs, session.as_ref())?;

        let now = Utc::now();
        let status = if session.is_some() && experience.enforces_minimum() {
            ReservationStatus::PendingMinimum
        } else {
            ReservationStatus::Pending
        };

        let mut reservation = Reservation {
            id: Uuid::new_v4(),
            experience_id: experience.id,
            session_id: cmd.session_id,
            guest_name: cmd.guest_name,
            guest_email: cmd.guest_email,
            hotel_id: cmd.hotel_id,
            // Actual headcount; the charge may be clamped up to the minimum,
            // but holds and booked-count math never are
            participants: cmd.participants,
            rental_days: cmd.rental_days,
            quantity: cmd.quantity,
            requested_date: cmd.requested_date,
            requested_time: cmd.requested_time,
            total_cents: quote.total_cents,
            currency: experience.currency.clone(),
            status,
            response_deadline: now + Duration::hours(self.rules.response_deadline_hours),
            payment_deadline: None,
            spots_held: 0,
            supplier_message: None,
            created_at: now,
            updated_at: now,
        };

        self.deps.reservations.insert(&reservation).await?;

        if let (ReservationStatus::PendingMinimum, Some(session_id)) =
            (status, reservation.session_id)
        {
            let held = reservation.participants;
            if let Err(err) = self.deps.ledger.reserve(session_id, held).await {
                // Compensating delete; a failure here leaves an invisible
                // orphan row, which is tolerated.
                if let Err(del_err) = self.deps.reservations.delete(reservation.id).await {
                    tracing::warn!(
                        reservation_id = %reservation.id,
                        %del_err,
                        "rollback delete failed after hold failure"
                    );
                }
                return Err(err.into());
            }
            reservation.spots_held = held;
            self.deps.reservations.save(&reservation).await?;
        }

        self.notify_request_created(&reservation).await;
        Ok(reservation)
    }

    /// Supplier accepts a pending reservation via a signed link. Synthesizes
    /// a private session for free-form requests, takes the spot hold for
    /// session-based ones, and only flips to `approved` once the payment
    /// link exists.
    pub async fn accept(&self, reservation_id: Uuid, token: &str) -> Result<Reservation, BookingError> {
        let claims = self.deps.tokens.verify(token)?;
        claims.require(reservation_id, TokenAction::Accept)?;

        let mut reservation = self.get(reservation_id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(BookingError::AlreadyProcessed {
                id: reservation.id,
                status: reservation.status,
            });
        }

        let experience = self
            .deps
            .experiences
            .get(reservation.experience_id)
            .await?
            .ok_or(BookingError::ExperienceNotFound(reservation.experience_id))?;

        let supplier = self
            .deps
            .directory
            .supplier_for_experience(experience.id)
            .await?;
        if !supplier.as_ref().is_some_and(|s| s.payouts_enabled) {
            return Err(BookingError::OnboardingIncomplete);
        }

        // Claim inventory before money: either a synthesized private session
        // or a hold on the referenced session.
        let mut created_private: Option<Session> = None;
        let session_id = match reservation.session_id {
            Some(session_id) => {
                if reservation.spots_held == 0 {
                    self.deps
                        .ledger
                        .reserve(session_id, reservation.participants)
                        .await?;
                    reservation.spots_held = reservation.participants;
                }
                session_id
            }
            None => {
                let date = reservation.requested_date.ok_or_else(|| {
                    BookingError::Validation("Request has no requested date".into())
                })?;
                let time = reservation
                    .requested_time
                    .clone()
                    .unwrap_or_else(|| "09:00".into());
                let session = self
                    .deps
                    .ledger
                    .create_private_session(&experience, date, time)
                    .await?;
                let id = session.id;
                created_private = Some(session);
                id
            }
        };

        let now = Utc::now();
        let payment_deadline = now + Duration::hours(self.rules.payment_deadline_hours);
        let link_request = PaymentLinkRequest {
            reservation_id: reservation.id,
            amount_cents: reservation.total_cents,
            currency: reservation.currency.clone(),
            success_url: self.rules.payment_success_url.clone(),
            cancel_url: self.rules.payment_cancel_url.clone(),
        };
        let link = match self.deps.payments.create_payment_link(&link_request).await {
            Ok(link) => link,
            Err(err) => {
                self.undo_accept_inventory(&reservation, created_private.as_ref())
                    .await;
                return Err(BookingError::Payment(err.to_string()));
            }
        };

        // Guarded flip; a concurrent decline or sweep wins the race cleanly.
        let flipped = self
            .deps
            .reservations
            .transition(reservation.id, ReservationStatus::Pending, ReservationStatus::Approved)
            .await?;
        if !flipped {
            self.undo_accept_inventory(&reservation, created_private.as_ref())
                .await;
            let current = self.get(reservation_id).await?;
            return Err(BookingError::AlreadyProcessed {
                id: current.id,
                status: current.status,
            });
        }

        reservation.update_status(ReservationStatus::Approved);
        reservation.session_id = Some(session_id);
        reservation.payment_deadline = Some(payment_deadline);
        self.deps.reservations.save(&reservation).await?;

        let event = events::ReservationApprovedEvent {
            reservation_id: reservation.id,
            payment_url: link.url,
            pay_by: payment_deadline.timestamp(),
            total_cents: reservation.total_cents,
            currency: reservation.currency.clone(),
        };
        notify_best_effort(
            self.deps.notifier.as_ref(),
            NotificationKind::ReservationApproved,
            &reservation.guest_email,
            to_payload(&event),
        )
        .await;

        Ok(reservation)
    }

    /// Supplier declines a pending reservation, optionally proposing
    /// alternative times in a free-text message.
    pub async fn decline(
        &self,
        reservation_id: Uuid,
        token: &str,
        message: Option<String>,
    ) -> Result<Reservation, BookingError> {
        let claims = self.deps.tokens.verify(token)?;
        claims.require(reservation_id, TokenAction::Decline)?;

        let mut reservation = self.get(reservation_id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(BookingError::AlreadyProcessed {
                id: reservation.id,
                status: reservation.status,
            });
        }

        let flipped = self
            .deps
            .reservations
            .transition(reservation.id, ReservationStatus::Pending, ReservationStatus::Declined)
            .await?;
        if !flipped {
            let current = self.get(reservation_id).await?;
            return Err(BookingError::AlreadyProcessed {
                id: current.id,
                status: current.status,
            });
        }

        self.release_held_spots(&mut reservation).await;
        reservation.update_status(ReservationStatus::Declined);
        reservation.supplier_message = message.clone();
        self.deps.reservations.save(&reservation).await?;

        let event = events::ReservationDeclinedEvent {
            reservation_id: reservation.id,
            supplier_message: message,
        };
        notify_best_effort(
            self.deps.notifier.as_ref(),
            NotificationKind::ReservationDeclined,
            &reservation.guest_email,
            to_payload(&event),
        )
        .await;

        Ok(reservation)
    }

    /// Apply a payment-success signal from the processor. Idempotent: the
    /// existence of a booking for the reservation is the idempotency key, so
    /// duplicate webhook delivery is a success-no-op.
    pub async fn handle_payment_success(
        &self,
        reservation_id: Uuid,
        payment_reference: &str,
    ) -> Result<PaymentOutcome, BookingError> {
        let reservation = self.get(reservation_id).await?;

        if let Some(existing) = self
            .deps
            .bookings
            .get_by_reservation(reservation_id)
            .await?
        {
            tracing::info!(%reservation_id, booking_id = %existing.id, "duplicate payment signal ignored");
            return Ok(PaymentOutcome::AlreadyRecorded(existing));
        }

        // A success signal can trail the sweep that closed the reservation;
        // its spots are already released, so recording a booking now would
        // oversell the session. Refund the charge instead.
        if reservation.status.is_terminal() {
            tracing::warn!(
                %reservation_id,
                status = ?reservation.status,
                "payment arrived for a closed reservation; refunding"
            );
            if let Err(err) = self
                .deps
                .payments
                .refund(payment_reference, reservation.total_cents)
                .await
            {
                // Surface the failure so the processor redelivers the signal
                return Err(BookingError::Payment(err.to_string()));
            }
            return Ok(PaymentOutcome::RefundedLate);
        }

        let session_id = reservation.session_id.ok_or_else(|| {
            BookingError::Validation("Reservation has no session to book against".into())
        })?;

        let rates = match reservation.hotel_id {
            Some(hotel_id) => self
                .deps
                .distributions
                .find(reservation.experience_id, hotel_id)
                .await?
                .map(|d| d.rates())
                .unwrap_or_else(CommissionRates::supplier_only),
            None => CommissionRates::supplier_only(),
        };
        let split = commission::split(reservation.total_cents, &rates);

        let booking = Booking::new(&reservation, session_id, &split, payment_reference.to_string());
        let inserted = self.deps.bookings.insert_if_absent(&booking).await?;
        if !inserted {
            // Lost a race with a concurrent delivery of the same signal
            let existing = self
                .deps
                .bookings
                .get_by_reservation(reservation_id)
                .await?
                .ok_or(BookingError::BookingNotFound(reservation_id))?;
            return Ok(PaymentOutcome::AlreadyRecorded(existing));
        }

        // Booking existence is the source of truth; a failed session flip is
        // logged rather than failing the webhook.
        if let Err(err) = self
            .deps
            .ledger
            .store()
            .set_status(session_id, SessionStatus::Booked)
            .await
        {
            tracing::error!(%session_id, %err, "failed to mark session booked after payment");
        }

        self.notify_booking_confirmed(&reservation, &booking).await;
        Ok(PaymentOutcome::Recorded(booking))
    }

    /// Payment failure/cancellation signal. The reservation stays `approved`;
    /// the unpaid sweep expires it once the payment deadline passes.
    pub async fn handle_payment_failure(&self, reservation_id: Uuid) -> Result<(), BookingError> {
        let reservation = self.get(reservation_id).await?;
        tracing::info!(
            %reservation_id,
            status = ?reservation.status,
            "payment failed or cancelled; awaiting deadline sweep"
        );
        Ok(())
    }

    /// Delete a session that nothing financial references. Refused while any
    /// booking points at it; cancellation is the path for those.
    pub async fn remove_session(&self, session_id: Uuid) -> Result<(), BookingError> {
        if self.deps.bookings.exists_for_session(session_id).await? {
            return Err(BookingError::SessionInUse(session_id));
        }
        self.deps.ledger.store().delete(session_id).await?;
        Ok(())
    }

    async fn undo_accept_inventory(&self, reservation: &Reservation, created: Option<&Session>) {
        // Best-effort compensation: failures are logged, orphans tolerated.
        if let Some(session) = created {
            if let Err(err) = self.deps.ledger.store().delete(session.id).await {
                tracing::warn!(session_id = %session.id, %err, "failed to remove synthesized session");
            }
        } else if reservation.spots_held > 0 {
            if let Some(session_id) = reservation.session_id {
                if let Err(err) = self
                    .deps
                    .ledger
                    .release(session_id, reservation.spots_held)
                    .await
                {
                    tracing::warn!(%session_id, %err, "failed to release spots after aborted accept");
                }
            }
        }
    }

    async fn release_held_spots(&self, reservation: &mut Reservation) {
        if reservation.spots_held > 0 {
            if let Some(session_id) = reservation.session_id {
                match self.deps.ledger.release(session_id, reservation.spots_held).await {
                    Ok(_) => reservation.spots_held = 0,
                    Err(err) => {
                        tracing::error!(%session_id, %err, "failed to release held spots");
                    }
                }
            }
        }
    }

    async fn notify_request_created(&self, reservation: &Reservation) {
        notify_best_effort(
            self.deps.notifier.as_ref(),
            NotificationKind::RequestSubmitted,
            &reservation.guest_email,
            serde_json::json!({
                "reservation_id": reservation.id,
                "total_cents": reservation.total_cents,
                "currency": reservation.currency,
                "respond_by": reservation.response_deadline.timestamp(),
            }),
        )
        .await;

        let supplier = match self
            .deps
            .directory
            .supplier_for_experience(reservation.experience_id)
            .await
        {
            Ok(Some(contact)) => contact,
            Ok(None) => {
                tracing::warn!(experience_id = %reservation.experience_id, "no supplier contact for request notification");
                return;
            }
            Err(err) => {
                tracing::warn!(%err, "supplier lookup failed for request notification");
                return;
            }
        };

        let exp = reservation.response_deadline.timestamp() as usize;
        let accept_token = self.sign_link(reservation.id, TokenAction::Accept, exp);
        let decline_token = self.sign_link(reservation.id, TokenAction::Decline, exp);
        let (accept_token, decline_token) = match (accept_token, decline_token) {
            (Ok(a), Ok(d)) => (a, d),
            _ => {
                tracing::error!(reservation_id = %reservation.id, "failed to sign supplier action links");
                return;
            }
        };

        let event = events::ReservationRequestedEvent {
            reservation_id: reservation.id,
            experience_id: reservation.experience_id,
            participants: reservation.participants,
            total_cents: reservation.total_cents,
            accept_url: format!(
                "{}/v1/reservations/{}/accept?token={}",
                self.rules.link_base_url, reservation.id, accept_token
            ),
            decline_url: format!(
                "{}/v1/reservations/{}/decline?token={}",
                self.rules.link_base_url, reservation.id, decline_token
            ),
            respond_by: reservation.response_deadline.timestamp(),
        };
        notify_best_effort(
            self.deps.notifier.as_ref(),
            NotificationKind::RequestReceived,
            &supplier.email,
            to_payload(&event),
        )
        .await;
    }

    async fn notify_booking_confirmed(&self, reservation: &Reservation, booking: &Booking) {
        let guest_event = events::BookingConfirmedEvent {
            booking_id: booking.id,
            reservation_id: reservation.id,
            amount_cents: booking.amount_cents,
            currency: booking.currency.clone(),
            complete_url: None,
            no_experience_url: None,
        };
        notify_best_effort(
            self.deps.notifier.as_ref(),
            NotificationKind::BookingConfirmedGuest,
            &reservation.guest_email,
            to_payload(&guest_event),
        )
        .await;

        // Supplier gets the completion/no-experience links
        match self
            .deps
            .directory
            .supplier_for_experience(reservation.experience_id)
            .await
        {
            Ok(Some(supplier)) => {
                let exp = (Utc::now()
                    + Duration::hours(self.rules.completion_token_ttl_hours))
                .timestamp() as usize;
                let complete = self.sign_link(booking.id, TokenAction::Complete, exp);
                let no_experience = self.sign_link(booking.id, TokenAction::NoExperience, exp);
                let (complete_url, no_experience_url) = match (complete, no_experience) {
                    (Ok(c), Ok(n)) => (
                        Some(format!(
                            "{}/v1/bookings/{}/complete?token={}",
                            self.rules.link_base_url, booking.id, c
                        )),
                        Some(format!(
                            "{}/v1/bookings/{}/no-experience?token={}",
                            self.rules.link_base_url, booking.id, n
                        )),
                    ),
                    _ => {
                        tracing::error!(booking_id = %booking.id, "failed to sign completion links");
                        (None, None)
                    }
                };
                let supplier_event = events::BookingConfirmedEvent {
                    booking_id: booking.id,
                    reservation_id: reservation.id,
                    amount_cents: booking.amount_cents,
                    currency: booking.currency.clone(),
                    complete_url,
                    no_experience_url,
                };
                notify_best_effort(
                    self.deps.notifier.as_ref(),
                    NotificationKind::BookingConfirmedSupplier,
                    &supplier.email,
                    to_payload(&supplier_event),
                )
                .await;
            }
            Ok(None) => {
                tracing::warn!(experience_id = %reservation.experience_id, "no supplier contact for booking notification");
            }
            Err(err) => {
                tracing::warn!(%err, "supplier lookup failed for booking notification");
            }
        }

        // Hotel notification is best-effort; an unresolvable address is
        // logged, never fatal.
        if let Some(hotel_id) = reservation.hotel_id {
            match self.deps.directory.hotel_email(hotel_id).await {
                Ok(Some(email)) => {
                    notify_best_effort(
                        self.deps.notifier.as_ref(),
                        NotificationKind::BookingConfirmedHotel,
                        &email,
                        to_payload(&guest_event),
                    )
                    .await;
                }
                Ok(None) => {
                    tracing::warn!(%hotel_id, "no hotel email resolvable for booking notification");
                }
                Err(err) => {
                    tracing::warn!(%hotel_id, %err, "hotel email lookup failed");
                }
            }
        }
    }

    fn sign_link(&self, sub: Uuid, action: TokenAction, exp: usize) -> Result<String, TokenError> {
        self.deps.tokens.sign(&LinkClaims { sub, action, exp })
    }
}

pub(crate) fn to_payload<T: serde::Serialize>(event: &T) -> Value {
    serde_json::to_value(event).unwrap_or(Value::Null)
}
