pub mod experience;
pub mod inventory;
pub mod pricing;
pub mod session;

pub use experience::{Experience, ExperienceStore, InMemoryExperienceStore, PricingModel};
pub use inventory::{InMemorySessionStore, LedgerError, SessionLedger, SessionStore};
pub use pricing::{compute_price, PriceInputs, PriceQuote};
pub use session::{Session, SessionStatus};
