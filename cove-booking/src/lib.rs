pub mod commission;
pub mod completion;
pub mod lifecycle;
pub mod memory;
pub mod models;
pub mod repository;
pub mod sweeper;

pub use commission::{split, CommissionRates, CommissionSplit};
pub use completion::CompletionWorkflow;
pub use lifecycle::{
    BookingDeps, BookingError, BookingRules, CreateReservation, PaymentOutcome, ReservationManager,
};
pub use models::{Booking, BookingStatus, Distribution, Reservation, ReservationStatus};
pub use sweeper::{ExpirySweeper, SweepSummary};
