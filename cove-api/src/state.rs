use cove_booking::{CompletionWorkflow, ExpirySweeper, ReservationManager};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ReservationManager>,
    pub sweeper: Arc<ExpirySweeper>,
    pub completion: Arc<CompletionWorkflow>,
    /// Shared secret the sweep scheduler presents; None means the endpoint
    /// trusts the network boundary
    pub sweep_secret: Option<String>,
}
