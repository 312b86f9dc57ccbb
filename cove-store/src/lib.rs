pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
pub mod directory_repo;
pub mod reservation_repo;
pub mod session_repo;

pub use app_config::Config;
pub use booking_repo::{StoreBookingRepository, StoreDistributionRepository};
pub use catalog_repo::StoreExperienceRepository;
pub use database::DbClient;
pub use directory_repo::StoreDirectoryRepository;
pub use reservation_repo::StoreReservationRepository;
pub use session_repo::StoreSessionRepository;
