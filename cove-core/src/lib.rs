pub mod directory;
pub mod notify;
pub mod payment;
pub mod token;
