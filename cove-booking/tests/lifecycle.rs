use chrono::{Duration, NaiveDate, Utc};
use cove_booking::memory::{
    InMemoryBookingStore, InMemoryDistributionStore, InMemoryReservationStore,
    MockPaymentProvider, PlainTokens, RecordingNotifier, StaticDirectory,
};
use cove_booking::repository::{BookingStore, DistributionStore};
use cove_booking::{
    BookingDeps, BookingError, BookingRules, BookingStatus, CompletionWorkflow,
    CreateReservation, Distribution, ExpirySweeper, PaymentOutcome, Reservation,
    ReservationManager, ReservationStatus,
};
use cove_catalog::experience::{CancellationPolicy, Experience, InMemoryExperienceStore, PricingModel};
use cove_catalog::inventory::InMemorySessionStore;
use cove_catalog::session::{Session, SessionStatus};
use cove_catalog::{ExperienceStore, SessionLedger, SessionStore};
use cove_core::directory::SupplierContact;
use cove_core::notify::NotificationKind;
use cove_core::token::{LinkClaims, TokenAction, TokenService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use uuid::Uuid;

struct World {
    bookings: Arc<InMemoryBookingStore>,
    distributions: Arc<InMemoryDistributionStore>,
    experiences: Arc<InMemoryExperienceStore>,
    sessions: Arc<InMemorySessionStore>,
    payments: Arc<MockPaymentProvider>,
    notifier: Arc<RecordingNotifier>,
    tokens: Arc<PlainTokens>,
    manager: ReservationManager,
    sweeper: ExpirySweeper,
    completion: CompletionWorkflow,
}

impl World {
    fn new() -> Self {
        Self::with_directory(StaticDirectory::default())
    }

    fn with_directory(directory: StaticDirectory) -> Self {
        let reservations = Arc::new(InMemoryReservationStore::default());
        let bookings = Arc::new(InMemoryBookingStore::default());
        let distributions = Arc::new(InMemoryDistributionStore::default());
        let experiences = Arc::new(InMemoryExperienceStore::default());
        let sessions = Arc::new(InMemorySessionStore::default());
        let payments = Arc::new(MockPaymentProvider::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let tokens = Arc::new(PlainTokens);
        let directory = Arc::new(directory);

        let deps = BookingDeps {
            reservations: reservations.clone(),
            bookings: bookings.clone(),
            distributions: distributions.clone(),
            experiences: experiences.clone(),
            ledger: SessionLedger::new(sessions.clone()),
            payments: payments.clone(),
            notifier: notifier.clone(),
            tokens: tokens.clone(),
            directory,
        };
        let rules = BookingRules::default();

        Self {
            bookings,
            distributions,
            experiences,
            sessions,
            payments,
            notifier,
            tokens,
            manager: ReservationManager::new(deps.clone(), rules.clone()),
            sweeper: ExpirySweeper::new(deps.clone(), rules),
            completion: CompletionWorkflow::new(deps),
        }
    }

    async fn add_experience(&self, experience: &Experience) {
        self.experiences.insert(experience).await.unwrap();
    }

    async fn add_session(&self, session: &Session) {
        self.sessions.insert(session).await.unwrap();
    }

    fn token_for(&self, sub: Uuid, action: TokenAction) -> String {
        let exp = (Utc::now() + Duration::hours(72)).timestamp() as usize;
        self.tokens.sign(&LinkClaims { sub, action, exp }).unwrap()
    }

    async fn reservation(&self, id: Uuid) -> Reservation {
        self.manager.get(id).await.unwrap()
    }
}

fn experience(model: PricingModel) -> Experience {
    Experience {
        id: Uuid::new_v4(),
        supplier_id: Uuid::new_v4(),
        name: "Sunset kayak tour".into(),
        pricing_model: model,
        base_price_cents: 10000,
        extra_person_cents: 2000,
        price_per_day_cents: 3500,
        included_participants: 2,
        min_participants: 1,
        max_participants: 10,
        min_days: 1,
        max_days: 14,
        currency: "EUR".into(),
        cancellation_policy: CancellationPolicy::Moderate,
        allows_requests: true,
        is_active: true,
    }
}

fn request_for(experience: &Experience, participants: i32) -> CreateReservation {
    CreateReservation {
        experience_id: experience.id,
        session_id: None,
        guest_name: "Ada Guest".into(),
        guest_email: "ada@example.test".into(),
        hotel_id: None,
        participants,
        rental_days: None,
        quantity: None,
        requested_date: NaiveDate::from_ymd_opt(2026, 10, 20),
        requested_time: Some("14:00".into()),
    }
}

fn tomorrow() -> NaiveDate {
    (Utc::now() + Duration::days(1)).date_naive()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_request_prices_per_person() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;

    let reservation = world.manager.create(request_for(&exp, 3)).await.unwrap();

    assert_eq!(reservation.total_cents, 6000);
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert!(reservation.session_id.is_none());
    // Guest confirmation and supplier request mail with action links
    assert_eq!(world.notifier.count(NotificationKind::RequestSubmitted).await, 1);
    assert_eq!(world.notifier.count(NotificationKind::RequestReceived).await, 1);
}

#[tokio::test]
async fn create_session_booking_below_minimum_holds_spots() {
    let world = World::new();
    let mut exp = experience(PricingModel::PerPerson);
    exp.min_participants = 4;
    world.add_experience(&exp).await;

    let session = Session::new(exp.id, tomorrow(), "10:00".into(), 10);
    world.add_session(&session).await;

    let mut cmd = request_for(&exp, 2);
    cmd.session_id = Some(session.id);
    let reservation = world.manager.create(cmd).await.unwrap();

    assert_eq!(reservation.status, ReservationStatus::PendingMinimum);
    assert_eq!(reservation.participants, 2);
    assert_eq!(reservation.spots_held, 2);
    // Charge is clamped to the minimum, the hold is not.
    assert_eq!(reservation.total_cents, 8000);
    let session = world.sessions.get(session.id).await.unwrap().unwrap();
    assert_eq!(session.spots_available, 8);
}

#[tokio::test]
async fn create_rolls_back_reservation_when_hold_fails() {
    let world = World::new();
    let mut exp = experience(PricingModel::PerPerson);
    exp.min_participants = 4;
    world.add_experience(&exp).await;

    let session = Session::new(exp.id, tomorrow(), "10:00".into(), 2);
    world.add_session(&session).await;

    let mut cmd = request_for(&exp, 4);
    cmd.session_id = Some(session.id);
    let err = world.manager.create(cmd).await.unwrap_err();
    assert!(matches!(err, BookingError::Ledger(_)));

    // Compensating delete ran; spots untouched
    let session = world.sessions.get(session.id).await.unwrap().unwrap();
    assert_eq!(session.spots_available, 2);
}

#[tokio::test]
async fn create_rejects_request_when_experience_disallows_them() {
    let world = World::new();
    let mut exp = experience(PricingModel::PerPerson);
    exp.allows_requests = false;
    world.add_experience(&exp).await;

    let err = world.manager.create(request_for(&exp, 2)).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Accept / decline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn accept_request_synthesizes_private_session() {
    // Scenario: supplier accepts a pending request that has no session
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;

    let reservation = world.manager.create(request_for(&exp, 3)).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Accept);
    let accepted = world.manager.accept(reservation.id, &token).await.unwrap();

    assert_eq!(accepted.status, ReservationStatus::Approved);
    let session_id = accepted.session_id.expect("private session attached");
    let session = world.sessions.get(session_id).await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Booked);
    assert_eq!(session.spots_available, 0);
    assert_eq!(session.spots_total, exp.max_participants);

    // Payment link exists and the deadline is ~24h out
    assert_eq!(world.payments.links.lock().await.len(), 1);
    let deadline = accepted.payment_deadline.unwrap();
    let hours = (deadline - Utc::now()).num_hours();
    assert!((23..=24).contains(&hours));

    assert_eq!(world.notifier.count(NotificationKind::ReservationApproved).await, 1);
}

#[tokio::test]
async fn accept_session_based_reservation_takes_hold() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;
    let session = Session::new(exp.id, tomorrow(), "10:00".into(), 8);
    world.add_session(&session).await;

    let mut cmd = request_for(&exp, 3);
    cmd.session_id = Some(session.id);
    let reservation = world.manager.create(cmd).await.unwrap();
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.spots_held, 0);

    let token = world.token_for(reservation.id, TokenAction::Accept);
    let accepted = world.manager.accept(reservation.id, &token).await.unwrap();
    assert_eq!(accepted.spots_held, 3);
    let session = world.sessions.get(session.id).await.unwrap().unwrap();
    assert_eq!(session.spots_available, 5);
}

#[tokio::test]
async fn accept_requires_completed_onboarding() {
    let world = World::with_directory(StaticDirectory {
        supplier: SupplierContact {
            email: "supplier@example.test".into(),
            payouts_enabled: false,
        },
        hotel: None,
    });
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;

    let reservation = world.manager.create(request_for(&exp, 2)).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Accept);
    let err = world.manager.accept(reservation.id, &token).await.unwrap_err();
    assert!(matches!(err, BookingError::OnboardingIncomplete));

    // Nothing committed
    let unchanged = world.reservation(reservation.id).await;
    assert_eq!(unchanged.status, ReservationStatus::Pending);
}

#[tokio::test]
async fn accept_is_rejected_for_non_pending_reservation() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;

    let reservation = world.manager.create(request_for(&exp, 2)).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Accept);
    world.manager.accept(reservation.id, &token).await.unwrap();

    // Second accept short-circuits with a descriptive conflict
    let err = world.manager.accept(reservation.id, &token).await.unwrap_err();
    match err {
        BookingError::AlreadyProcessed { status, .. } => {
            assert_eq!(status, ReservationStatus::Approved)
        }
        other => panic!("expected AlreadyProcessed, got {other:?}"),
    }
}

#[tokio::test]
async fn accept_rejects_token_for_wrong_action_or_reservation() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;
    let reservation = world.manager.create(request_for(&exp, 2)).await.unwrap();

    let decline_token = world.token_for(reservation.id, TokenAction::Decline);
    assert!(matches!(
        world.manager.accept(reservation.id, &decline_token).await.unwrap_err(),
        BookingError::Token(_)
    ));

    let foreign_token = world.token_for(Uuid::new_v4(), TokenAction::Accept);
    assert!(matches!(
        world.manager.accept(reservation.id, &foreign_token).await.unwrap_err(),
        BookingError::Token(_)
    ));
}

#[tokio::test]
async fn failed_payment_link_leaves_reservation_pending() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;

    let reservation = world.manager.create(request_for(&exp, 2)).await.unwrap();
    world.payments.fail_link_creation.store(true, Ordering::SeqCst);

    let token = world.token_for(reservation.id, TokenAction::Accept);
    let err = world.manager.accept(reservation.id, &token).await.unwrap_err();
    assert!(matches!(err, BookingError::Payment(_)));

    let unchanged = world.reservation(reservation.id).await;
    assert_eq!(unchanged.status, ReservationStatus::Pending);
    assert!(unchanged.session_id.is_none());

    // Retry succeeds once the provider recovers
    world.payments.fail_link_creation.store(false, Ordering::SeqCst);
    let accepted = world.manager.accept(reservation.id, &token).await.unwrap();
    assert_eq!(accepted.status, ReservationStatus::Approved);
}

#[tokio::test]
async fn decline_carries_supplier_message() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;

    let reservation = world.manager.create(request_for(&exp, 2)).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Decline);
    let declined = world
        .manager
        .decline(reservation.id, &token, Some("Fully booked; Tuesday works".into()))
        .await
        .unwrap();

    assert_eq!(declined.status, ReservationStatus::Declined);
    assert_eq!(
        declined.supplier_message.as_deref(),
        Some("Fully booked; Tuesday works")
    );
    assert_eq!(world.notifier.count(NotificationKind::ReservationDeclined).await, 1);

    // Declining twice is a conflict, not a silent success
    assert!(matches!(
        world.manager.decline(reservation.id, &token, None).await.unwrap_err(),
        BookingError::AlreadyProcessed { .. }
    ));
}

// ---------------------------------------------------------------------------
// Payment webhook
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_payment_signals_create_one_booking() {
    // Scenario: webhook fires twice for the same reservation
    let world = World::new();
    let mut exp = experience(PricingModel::FlatRate);
    exp.base_price_cents = 999;
    world.add_experience(&exp).await;

    let hotel_id = Uuid::new_v4();
    world
        .distributions
        .insert(&Distribution {
            id: Uuid::new_v4(),
            experience_id: exp.id,
            hotel_id,
            supplier_pct: 80,
            hotel_pct: 12,
            platform_pct: 8,
        })
        .await
        .unwrap();

    let mut cmd = request_for(&exp, 2);
    cmd.hotel_id = Some(hotel_id);
    let reservation = world.manager.create(cmd).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Accept);
    world.manager.accept(reservation.id, &token).await.unwrap();

    let first = world
        .manager
        .handle_payment_success(reservation.id, "pay_abc123")
        .await
        .unwrap();
    let booking = match first {
        PaymentOutcome::Recorded(b) => b,
        other => panic!("expected new booking, got {other:?}"),
    };
    // 999 at 80/12/8: remainder lands on the platform share
    assert_eq!(booking.supplier_cents, 799);
    assert_eq!(booking.hotel_cents, 120);
    assert_eq!(booking.platform_cents, 80);
    assert_eq!(
        booking.supplier_cents + booking.hotel_cents + booking.platform_cents,
        999
    );

    let second = world
        .manager
        .handle_payment_success(reservation.id, "pay_abc123")
        .await
        .unwrap();
    match second {
        PaymentOutcome::AlreadyRecorded(b) => assert_eq!(b.id, booking.id),
        other => panic!("expected duplicate no-op, got {other:?}"),
    }

    // Hotel was notified alongside guest and supplier
    assert_eq!(world.notifier.count(NotificationKind::BookingConfirmedGuest).await, 1);
    assert_eq!(world.notifier.count(NotificationKind::BookingConfirmedSupplier).await, 1);
    assert_eq!(world.notifier.count(NotificationKind::BookingConfirmedHotel).await, 1);
}

#[tokio::test]
async fn missing_hotel_email_never_fails_payment_handling() {
    let world = World::with_directory(StaticDirectory {
        supplier: SupplierContact {
            email: "supplier@example.test".into(),
            payouts_enabled: true,
        },
        hotel: None,
    });
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;

    let mut cmd = request_for(&exp, 2);
    cmd.hotel_id = Some(Uuid::new_v4());
    let reservation = world.manager.create(cmd).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Accept);
    world.manager.accept(reservation.id, &token).await.unwrap();

    let outcome = world
        .manager
        .handle_payment_success(reservation.id, "pay_xyz")
        .await
        .unwrap();
    assert!(matches!(outcome, PaymentOutcome::Recorded(_)));
    assert_eq!(world.notifier.count(NotificationKind::BookingConfirmedHotel).await, 0);
}

// ---------------------------------------------------------------------------
// Expiry sweeps
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sweep_expires_pending_past_response_deadline() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;
    let reservation = world.manager.create(request_for(&exp, 2)).await.unwrap();

    // Not due yet
    let summary = world.sweeper.run(Utc::now()).await;
    assert_eq!(summary.expired_pending, 0);

    let later = Utc::now() + Duration::hours(49);
    let summary = world.sweeper.run(later).await;
    assert_eq!(summary.expired_pending, 1);
    assert_eq!(
        world.reservation(reservation.id).await.status,
        ReservationStatus::Expired
    );
    assert_eq!(world.notifier.count(NotificationKind::ReservationExpired).await, 1);
}

#[tokio::test]
async fn sweep_expires_unpaid_approved_and_releases_spots() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;
    let session = Session::new(exp.id, tomorrow(), "10:00".into(), 8);
    world.add_session(&session).await;

    let mut cmd = request_for(&exp, 3);
    cmd.session_id = Some(session.id);
    let reservation = world.manager.create(cmd).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Accept);
    world.manager.accept(reservation.id, &token).await.unwrap();
    assert_eq!(
        world.sessions.get(session.id).await.unwrap().unwrap().spots_available,
        5
    );

    let later = Utc::now() + Duration::hours(25);
    let summary = world.sweeper.run(later).await;
    assert_eq!(summary.expired_unpaid, 1);
    assert_eq!(
        world.reservation(reservation.id).await.status,
        ReservationStatus::Expired
    );
    assert_eq!(
        world.sessions.get(session.id).await.unwrap().unwrap().spots_available,
        8
    );
    // Guest and supplier both hear about the lapsed payment
    assert_eq!(world.notifier.count(NotificationKind::PaymentExpired).await, 2);
}

#[tokio::test]
async fn payment_after_expiry_sweep_is_refunded_not_booked() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;
    let session = Session::new(exp.id, tomorrow(), "10:00".into(), 8);
    world.add_session(&session).await;

    let mut cmd = request_for(&exp, 3);
    cmd.session_id = Some(session.id);
    let reservation = world.manager.create(cmd).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Accept);
    world.manager.accept(reservation.id, &token).await.unwrap();

    let summary = world.sweeper.run(Utc::now() + Duration::hours(25)).await;
    assert_eq!(summary.expired_unpaid, 1);

    // The processor's success signal arrives after the spots were released
    let outcome = world
        .manager
        .handle_payment_success(reservation.id, "pay_late")
        .await
        .unwrap();
    assert!(matches!(outcome, PaymentOutcome::RefundedLate));

    assert!(world.bookings.get_by_reservation(reservation.id).await.unwrap().is_none());
    let refunds = world.payments.refunds.lock().await;
    assert_eq!(refunds.as_slice(), &[("pay_late".to_string(), reservation.total_cents)]);
    let session = world.sessions.get(session.id).await.unwrap().unwrap();
    assert_eq!(session.spots_available, 8);
    assert_eq!(session.status, SessionStatus::Available);
}

#[tokio::test]
async fn sweep_skips_approved_reservation_that_paid() {
    let world = World::new();
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;

    let reservation = world.manager.create(request_for(&exp, 2)).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Accept);
    world.manager.accept(reservation.id, &token).await.unwrap();
    world
        .manager
        .handle_payment_success(reservation.id, "pay_1")
        .await
        .unwrap();

    let later = Utc::now() + Duration::hours(25);
    let summary = world.sweeper.run(later).await;
    assert_eq!(summary.expired_unpaid, 0);
    assert_eq!(
        world.reservation(reservation.id).await.status,
        ReservationStatus::Approved
    );
}

#[tokio::test]
async fn sweep_cancels_under_minimum_session() {
    // Scenario: 4 required, only 2 booked, session is tomorrow
    let world = World::new();
    let mut exp = experience(PricingModel::PerPerson);
    exp.min_participants = 4;
    world.add_experience(&exp).await;

    let session = Session::new(exp.id, tomorrow(), "10:00".into(), 10);
    world.add_session(&session).await;

    let mut cmd = request_for(&exp, 2);
    cmd.session_id = Some(session.id);
    let reservation = world.manager.create(cmd).await.unwrap();
    assert_eq!(reservation.status, ReservationStatus::PendingMinimum);

    let summary = world.sweeper.run(Utc::now()).await;
    assert_eq!(summary.cancelled_minimum, 1);
    assert_eq!(
        world.reservation(reservation.id).await.status,
        ReservationStatus::CancelledMinimum
    );
    // Held spots are back
    let session = world.sessions.get(session.id).await.unwrap().unwrap();
    assert_eq!(session.spots_available, session.spots_total);

    assert_eq!(world.notifier.count(NotificationKind::MinimumNotMet).await, 1);
    assert_eq!(world.notifier.count(NotificationKind::MinimumNotMetSupplier).await, 1);
}

#[tokio::test]
async fn sweep_leaves_sessions_that_met_minimum() {
    let world = World::new();
    let mut exp = experience(PricingModel::PerPerson);
    exp.min_participants = 2;
    world.add_experience(&exp).await;

    let session = Session::new(exp.id, tomorrow(), "10:00".into(), 10);
    world.add_session(&session).await;

    let mut cmd = request_for(&exp, 3);
    cmd.session_id = Some(session.id);
    let reservation = world.manager.create(cmd).await.unwrap();
    assert_eq!(reservation.spots_held, 3);

    let summary = world.sweeper.run(Utc::now()).await;
    assert_eq!(summary.cancelled_minimum, 0);
    assert_eq!(
        world.reservation(reservation.id).await.status,
        ReservationStatus::PendingMinimum
    );
}

#[tokio::test]
async fn sweep_is_idempotent_across_runs() {
    let world = World::new();
    let mut exp = experience(PricingModel::PerPerson);
    exp.min_participants = 4;
    world.add_experience(&exp).await;
    let session = Session::new(exp.id, tomorrow(), "10:00".into(), 10);
    world.add_session(&session).await;

    let request = world.manager.create(request_for(&exp, 2)).await.unwrap();
    assert_eq!(request.status, ReservationStatus::Pending);
    let mut cmd = request_for(&exp, 2);
    cmd.session_id = Some(session.id);
    world.manager.create(cmd).await.unwrap();

    let later = Utc::now() + Duration::hours(49);
    let first = world.sweeper.run(later).await;
    assert!(first.expired_pending == 1 && first.cancelled_minimum == 1);

    // No intervening change: the second run processes nothing
    let second = world.sweeper.run(later).await;
    assert_eq!(second, cove_booking::SweepSummary::default());
}

#[tokio::test]
async fn minimum_sweep_refunds_paid_reservations() {
    let world = World::new();
    let mut exp = experience(PricingModel::PerPerson);
    exp.min_participants = 4;
    world.add_experience(&exp).await;
    let session = Session::new(exp.id, tomorrow(), "10:00".into(), 10);
    world.add_session(&session).await;

    let mut cmd = request_for(&exp, 2);
    cmd.session_id = Some(session.id);
    let reservation = world.manager.create(cmd).await.unwrap();
    // Instant-book path: guest pays while still below the minimum
    world
        .manager
        .handle_payment_success(reservation.id, "pay_min")
        .await
        .unwrap();

    let summary = world.sweeper.run(Utc::now()).await;
    assert_eq!(summary.cancelled_minimum, 1);

    let booking = world
        .bookings
        .get_by_reservation(reservation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Cancelled);
    assert_eq!(world.payments.refunds.lock().await.len(), 1);
}

// ---------------------------------------------------------------------------
// Completion / payout
// ---------------------------------------------------------------------------

async fn paid_booking(world: &World) -> cove_booking::Booking {
    let exp = experience(PricingModel::PerPerson);
    world.add_experience(&exp).await;
    let reservation = world.manager.create(request_for(&exp, 2)).await.unwrap();
    let token = world.token_for(reservation.id, TokenAction::Accept);
    world.manager.accept(reservation.id, &token).await.unwrap();
    match world
        .manager
        .handle_payment_success(reservation.id, "pay_done")
        .await
        .unwrap()
    {
        PaymentOutcome::Recorded(b) => b,
        PaymentOutcome::AlreadyRecorded(b) => b,
        PaymentOutcome::RefundedLate => panic!("payment should have been recorded"),
    }
}

#[tokio::test]
async fn completion_releases_supplier_payout() {
    let world = World::new();
    let booking = paid_booking(&world).await;

    let token = world.token_for(booking.id, TokenAction::Complete);
    let completed = world.completion.complete(booking.id, &token).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);

    let payouts = world.payments.payouts.lock().await;
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0], ("pay_done".to_string(), booking.supplier_cents));
}

#[tokio::test]
async fn no_experience_refunds_guest_in_full() {
    let world = World::new();
    let booking = paid_booking(&world).await;

    let token = world.token_for(booking.id, TokenAction::NoExperience);
    let cancelled = world
        .completion
        .report_no_experience(booking.id, &token)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let refunds = world.payments.refunds.lock().await;
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0], ("pay_done".to_string(), booking.amount_cents));
    assert_eq!(world.notifier.count(NotificationKind::BookingRefunded).await, 1);
}

#[tokio::test]
async fn completion_outcomes_are_mutually_exclusive() {
    let world = World::new();
    let booking = paid_booking(&world).await;

    let complete = world.token_for(booking.id, TokenAction::Complete);
    world.completion.complete(booking.id, &complete).await.unwrap();

    let no_experience = world.token_for(booking.id, TokenAction::NoExperience);
    let err = world
        .completion
        .report_no_experience(booking.id, &no_experience)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::AlreadySettled(_)));
    // No refund went out
    assert!(world.payments.refunds.lock().await.is_empty());
}

#[tokio::test]
async fn completion_rejects_token_scoped_to_other_booking() {
    let world = World::new();
    let booking = paid_booking(&world).await;

    let foreign = world.token_for(Uuid::new_v4(), TokenAction::Complete);
    let err = world.completion.complete(booking.id, &foreign).await.unwrap_err();
    assert!(matches!(err, BookingError::Token(_)));
    assert!(world.payments.payouts.lock().await.is_empty());
}

// ---------------------------------------------------------------------------
// Session deletion guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn session_with_bookings_cannot_be_deleted() {
    let world = World::new();
    let booking = paid_booking(&world).await;

    let err = world.manager.remove_session(booking.session_id).await.unwrap_err();
    assert!(matches!(err, BookingError::SessionInUse(_)));
    assert!(world.sessions.get(booking.session_id).await.unwrap().is_some());

    // A session nothing references goes away quietly
    let exp = experience(PricingModel::PerPerson);
    let orphan = Session::new(exp.id, tomorrow(), "10:00".into(), 5);
    world.add_session(&orphan).await;
    world.manager.remove_session(orphan.id).await.unwrap();
    assert!(world.sessions.get(orphan.id).await.unwrap().is_none());
}
