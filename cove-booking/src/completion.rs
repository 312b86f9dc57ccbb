use crate::lifecycle::{to_payload, BookingDeps, BookingError};
use crate::models::{Booking, BookingStatus};
use cove_core::notify::{notify_best_effort, NotificationKind};
use cove_core::token::TokenAction;
use cove_shared::events;
use uuid::Uuid;

/// Post-experience confirmation: the supplier attests that the experience
/// happened (funds released) or did not (guest refunded). Both outcomes are
/// terminal and mutually exclusive, reachable only through the signed links
/// issued at payment confirmation. Token signature, expiry, booking id and
/// action are all verified before anything mutates.
pub struct CompletionWorkflow {
    deps: BookingDeps,
}

impl CompletionWorkflow {
    pub fn new(deps: BookingDeps) -> Self {
        Self { deps }
    }

    /// Experience took place: release the supplier payout.
    pub async fn complete(&self, booking_id: Uuid, token: &str) -> Result<Booking, BookingError> {
        let booking = self
            .settle(booking_id, token, TokenAction::Complete, BookingStatus::Completed)
            .await?;

        if let Err(err) = self
            .deps
            .payments
            .release_payout(&booking.payment_reference, booking.supplier_cents)
            .await
        {
            self.revert(&booking, BookingStatus::Completed).await;
            return Err(BookingError::Payment(err.to_string()));
        }

        let event = events::BookingSettledEvent {
            booking_id: booking.id,
            refunded: false,
            amount_cents: booking.supplier_cents,
        };
        self.notify_supplier(&booking, NotificationKind::BookingCompleted, to_payload(&event))
            .await;
        Ok(booking)
    }

    /// Experience did not take place: refund the guest in full.
    pub async fn report_no_experience(
        &self,
        booking_id: Uuid,
        token: &str,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .settle(booking_id, token, TokenAction::NoExperience, BookingStatus::Cancelled)
            .await?;

        if let Err(err) = self
            .deps
            .payments
            .refund(&booking.payment_reference, booking.amount_cents)
            .await
        {
            self.revert(&booking, BookingStatus::Cancelled).await;
            return Err(BookingError::Payment(err.to_string()));
        }

        let event = events::BookingSettledEvent {
            booking_id: booking.id,
            refunded: true,
            amount_cents: booking.amount_cents,
        };
        if let Ok(Some(reservation)) = self.deps.reservations.get(booking.reservation_id).await {
            notify_best_effort(
                self.deps.notifier.as_ref(),
                NotificationKind::BookingRefunded,
                &reservation.guest_email,
                to_payload(&event),
            )
            .await;
        }
        Ok(booking)
    }

    /// Verify the token fully, then claim the settlement with a guarded
    /// status flip so concurrent complete/no-experience calls cannot both
    /// move money.
    async fn settle(
        &self,
        booking_id: Uuid,
        token: &str,
        action: TokenAction,
        outcome: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let claims = self.deps.tokens.verify(token)?;
        claims.require(booking_id, action)?;

        let mut booking = self
            .deps
            .bookings
            .get(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))?;
        if booking.status != BookingStatus::Confirmed {
            return Err(BookingError::AlreadySettled(booking_id));
        }

        let claimed = self
            .deps
            .bookings
            .transition(booking_id, BookingStatus::Confirmed, outcome)
            .await?;
        if !claimed {
            return Err(BookingError::AlreadySettled(booking_id));
        }
        booking.status = outcome;
        Ok(booking)
    }

    async fn revert(&self, booking: &Booking, from: BookingStatus) {
        // Provider call failed after the claim; put the booking back so a
        // retry of the link can succeed.
        if let Err(err) = self
            .deps
            .bookings
            .transition(booking.id, from, BookingStatus::Confirmed)
            .await
        {
            tracing::error!(booking_id = %booking.id, %err, "failed to revert settlement claim");
        }
    }

    async fn notify_supplier(
        &self,
        booking: &Booking,
        kind: NotificationKind,
        payload: serde_json::Value,
    ) {
        let reservation = match self.deps.reservations.get(booking.reservation_id).await {
            Ok(Some(reservation)) => reservation,
            _ => return,
        };
        if let Ok(Some(supplier)) = self
            .deps
            .directory
            .supplier_for_experience(reservation.experience_id)
            .await
        {
            notify_best_effort(self.deps.notifier.as_ref(), kind, &supplier.email, payload).await;
        }
    }
}
