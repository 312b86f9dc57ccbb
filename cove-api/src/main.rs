use std::net::SocketAddr;
use std::sync::Arc;

use cove_api::outbound::LogNotifier;
use cove_api::tokens::JwtTokens;
use cove_api::{app, AppState};
use cove_booking::memory::MockPaymentProvider;
use cove_booking::{BookingDeps, CompletionWorkflow, ExpirySweeper, ReservationManager};
use cove_catalog::SessionLedger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cove_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cove_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Cove API on port {}", config.server.port);

    let db = cove_store::DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let reservations = Arc::new(cove_store::StoreReservationRepository::new(db.pool.clone()));
    let bookings = Arc::new(cove_store::StoreBookingRepository::new(db.pool.clone()));
    let distributions = Arc::new(cove_store::StoreDistributionRepository::new(db.pool.clone()));
    let experiences = Arc::new(cove_store::StoreExperienceRepository::new(db.pool.clone()));
    let sessions = Arc::new(cove_store::StoreSessionRepository::new(db.pool.clone()));
    let directory = Arc::new(cove_store::StoreDirectoryRepository::new(db.pool.clone()));

    // Stand-in processor; swapped for the real adapter at the deployment
    // boundary without touching the lifecycle code
    let payments = Arc::new(MockPaymentProvider::default());

    let deps = BookingDeps {
        reservations,
        bookings,
        distributions,
        experiences,
        ledger: SessionLedger::new(sessions),
        payments,
        notifier: Arc::new(LogNotifier),
        tokens: Arc::new(JwtTokens::new(config.tokens.link_secret.clone())),
        directory,
    };
    let rules = config.business_rules.booking_rules();

    let app_state = AppState {
        manager: Arc::new(ReservationManager::new(deps.clone(), rules.clone())),
        sweeper: Arc::new(ExpirySweeper::new(deps.clone(), rules)),
        completion: Arc::new(CompletionWorkflow::new(deps)),
        sweep_secret: config.sweep.secret.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app).await.expect("Server error");
}
