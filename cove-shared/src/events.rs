use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationRequestedEvent {
    pub reservation_id: Uuid,
    pub experience_id: Uuid,
    pub participants: i32,
    pub total_cents: i64,
    pub accept_url: String,
    pub decline_url: String,
    pub respond_by: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationApprovedEvent {
    pub reservation_id: Uuid,
    pub payment_url: String,
    pub pay_by: i64,
    pub total_cents: i64,
    pub currency: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationDeclinedEvent {
    pub reservation_id: Uuid,
    pub supplier_message: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationExpiredEvent {
    pub reservation_id: Uuid,
    pub was_paid_stage: bool,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct MinimumNotMetEvent {
    pub reservation_id: Uuid,
    pub session_id: Uuid,
    pub required: i32,
    pub booked: i32,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub reservation_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub complete_url: Option<String>,
    pub no_experience_url: Option<String>,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingSettledEvent {
    pub booking_id: Uuid,
    pub refunded: bool,
    pub amount_cents: i64,
}
