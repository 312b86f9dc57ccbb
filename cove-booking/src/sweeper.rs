use crate::lifecycle::{to_payload, BookingDeps, BookingError, BookingRules};
use crate::models::{BookingStatus, Reservation, ReservationStatus};
use chrono::{DateTime, Duration, Utc};
use cove_core::notify::{notify_best_effort, NotificationKind};
use cove_shared::events;
use std::collections::HashMap;
use uuid::Uuid;

/// Records processed per pass of one sweep run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SweepSummary {
    pub expired_pending: usize,
    pub expired_unpaid: usize,
    pub cancelled_minimum: usize,
}

/// Scheduled batch job enforcing every lifecycle deadline. Idempotent: each
/// pass re-queries current state and uses guarded transitions, so running it
/// repeatedly or concurrently duplicates nothing. A failure on one record is
/// logged and never aborts the rest of the pass.
pub struct ExpirySweeper {
    deps: BookingDeps,
    rules: BookingRules,
}

impl ExpirySweeper {
    pub fn new(deps: BookingDeps, rules: BookingRules) -> Self {
        Self { deps, rules }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> SweepSummary {
        let summary = SweepSummary {
            expired_pending: self.sweep_pending(now).await,
            expired_unpaid: self.sweep_unpaid(now).await,
            cancelled_minimum: self.sweep_minimum(now).await,
        };
        tracing::info!(?summary, "expiry sweep finished");
        summary
    }

    /// Pass 1: pending reservations past their response deadline. No
    /// inventory action; plain pending requests never held spots.
    async fn sweep_pending(&self, now: DateTime<Utc>) -> usize {
        let reservations = match self.deps.reservations.find_pending_expired(now).await {
            Ok(reservations) => reservations,
            Err(err) => {
                tracing::error!(%err, "pending-expiry query failed");
                return 0;
            }
        };

        let mut processed = 0;
        for reservation in reservations {
            match self.expire_pending(&reservation).await {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(reservation_id = %reservation.id, %err, "pending expiry failed");
                }
            }
        }
        processed
    }

    async fn expire_pending(&self, reservation: &Reservation) -> Result<bool, BookingError> {
        let flipped = self
            .deps
            .reservations
            .transition(
                reservation.id,
                ReservationStatus::Pending,
                ReservationStatus::Expired,
            )
            .await?;
        if !flipped {
            return Ok(false);
        }

        let event = events::ReservationExpiredEvent {
            reservation_id: reservation.id,
            was_paid_stage: false,
        };
        notify_best_effort(
            self.deps.notifier.as_ref(),
            NotificationKind::ReservationExpired,
            &reservation.guest_email,
            to_payload(&event),
        )
        .await;
        Ok(true)
    }

    /// Pass 2: approved reservations past their payment deadline with no
    /// booking. Releases the spots the accept step held.
    async fn sweep_unpaid(&self, now: DateTime<Utc>) -> usize {
        let reservations = match self.deps.reservations.find_approved_unpaid(now).await {
            Ok(reservations) => reservations,
            Err(err) => {
                tracing::error!(%err, "unpaid-expiry query failed");
                return 0;
            }
        };

        let mut processed = 0;
        for reservation in reservations {
            match self.expire_unpaid(&reservation).await {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(reservation_id = %reservation.id, %err, "unpaid expiry failed");
                }
            }
        }
        processed
    }

    async fn expire_unpaid(&self, reservation: &Reservation) -> Result<bool, BookingError> {
        // Payment may have landed between the query and now
        if self
            .deps
            .bookings
            .get_by_reservation(reservation.id)
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let flipped = self
            .deps
            .reservations
            .transition(
                reservation.id,
                ReservationStatus::Approved,
                ReservationStatus::Expired,
            )
            .await?;
        if !flipped {
            return Ok(false);
        }

        self.release_spots(reservation).await;

        let event = events::ReservationExpiredEvent {
            reservation_id: reservation.id,
            was_paid_stage: true,
        };
        notify_best_effort(
            self.deps.notifier.as_ref(),
            NotificationKind::PaymentExpired,
            &reservation.guest_email,
            to_payload(&event),
        )
        .await;

        if let Ok(Some(supplier)) = self
            .deps
            .directory
            .supplier_for_experience(reservation.experience_id)
            .await
        {
            notify_best_effort(
                self.deps.notifier.as_ref(),
                NotificationKind::PaymentExpired,
                &supplier.email,
                to_payload(&event),
            )
            .await;
        }
        Ok(true)
    }

    /// Pass 3: sessions inside the cutoff window whose booked count is still
    /// below the experience minimum. Cancels every pending_minimum
    /// reservation of such a session, releasing each hold individually; the
    /// supplier is notified once per session, not once per reservation.
    async fn sweep_minimum(&self, now: DateTime<Utc>) -> usize {
        let reservations = match self.deps.reservations.find_pending_minimum().await {
            Ok(reservations) => reservations,
            Err(err) => {
                tracing::error!(%err, "minimum-threshold query failed");
                return 0;
            }
        };

        let mut by_session: HashMap<Uuid, Vec<Reservation>> = HashMap::new();
        for reservation in reservations {
            if let Some(session_id) = reservation.session_id {
                by_session.entry(session_id).or_default().push(reservation);
            }
        }

        // Calendar-date granularity, matching how cutoffs are communicated
        let cutoff_date = (now + Duration::hours(self.rules.minimum_cutoff_hours)).date_naive();

        let mut processed = 0;
        for (session_id, group) in by_session {
            match self.cancel_session_if_under_minimum(session_id, &group, cutoff_date).await {
                Ok(count) => processed += count,
                Err(err) => {
                    tracing::error!(%session_id, %err, "minimum-threshold pass failed for session");
                }
            }
        }
        processed
    }

    async fn cancel_session_if_under_minimum(
        &self,
        session_id: Uuid,
        group: &[Reservation],
        cutoff_date: chrono::NaiveDate,
    ) -> Result<usize, BookingError> {
        let session = self.deps.ledger.get(session_id).await?;
        if session.date > cutoff_date {
            return Ok(0);
        }

        let experience = self
            .deps
            .experiences
            .get(session.experience_id)
            .await?
            .ok_or(BookingError::ExperienceNotFound(session.experience_id))?;
        if session.booked_count() >= experience.min_participants {
            return Ok(0);
        }

        let booked = session.booked_count();
        let mut cancelled = 0;
        for reservation in group {
            match self
                .cancel_minimum_reservation(reservation, session_id, experience.min_participants, booked)
                .await
            {
                Ok(true) => cancelled += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::error!(reservation_id = %reservation.id, %err, "minimum cancellation failed");
                }
            }
        }

        if cancelled > 0 {
            if let Ok(Some(supplier)) = self
                .deps
                .directory
                .supplier_for_experience(experience.id)
                .await
            {
                notify_best_effort(
                    self.deps.notifier.as_ref(),
                    NotificationKind::MinimumNotMetSupplier,
                    &supplier.email,
                    serde_json::json!({
                        "session_id": session_id,
                        "required": experience.min_participants,
                        "booked": booked,
                        "cancelled_reservations": cancelled,
                    }),
                )
                .await;
            }
        }
        Ok(cancelled)
    }

    async fn cancel_minimum_reservation(
        &self,
        reservation: &Reservation,
        session_id: Uuid,
        required: i32,
        booked: i32,
    ) -> Result<bool, BookingError> {
        let flipped = self
            .deps
            .reservations
            .transition(
                reservation.id,
                ReservationStatus::PendingMinimum,
                ReservationStatus::CancelledMinimum,
            )
            .await?;
        if !flipped {
            return Ok(false);
        }

        self.release_spots(reservation).await;

        // An already-paid reservation also loses its booking; the refund is
        // best-effort and logged on failure.
        if let Some(booking) = self
            .deps
            .bookings
            .get_by_reservation(reservation.id)
            .await?
        {
            let settled = self
                .deps
                .bookings
                .transition(booking.id, BookingStatus::Confirmed, BookingStatus::Cancelled)
                .await?;
            if settled {
                if let Err(err) = self
                    .deps
                    .payments
                    .refund(&booking.payment_reference, booking.amount_cents)
                    .await
                {
                    tracing::error!(booking_id = %booking.id, %err, "refund failed for minimum cancellation");
                }
            }
        }

        let event = events::MinimumNotMetEvent {
            reservation_id: reservation.id,
            session_id,
            required,
            booked,
        };
        notify_best_effort(
            self.deps.notifier.as_ref(),
            NotificationKind::MinimumNotMet,
            &reservation.guest_email,
            to_payload(&event),
        )
        .await;
        Ok(true)
    }

    async fn release_spots(&self, reservation: &Reservation) {
        if reservation.spots_held > 0 {
            if let Some(session_id) = reservation.session_id {
                if let Err(err) = self
                    .deps
                    .ledger
                    .release(session_id, reservation.spots_held)
                    .await
                {
                    tracing::error!(%session_id, %err, "failed to release spots during sweep");
                }
            }
        }
    }
}
