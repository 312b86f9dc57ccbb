use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cove_booking::BookingError;
use cove_catalog::LedgerError;
use cove_core::token::TokenError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    AuthenticationError(String),
    /// Expired or malformed action link
    LinkGone(String),
    NotFoundError(String),
    ConflictError(String),
    UpstreamError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::LinkGone(msg) => (StatusCode::GONE, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::UpstreamError(msg) => {
                tracing::error!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Payment provider unavailable".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(_)
            | BookingError::ExperienceNotFound(_)
            | BookingError::BookingNotFound(_) => AppError::NotFoundError(err.to_string()),
            BookingError::Validation(_) | BookingError::Pricing(_) => {
                AppError::ValidationError(err.to_string())
            }
            BookingError::AlreadyProcessed { .. }
            | BookingError::AlreadySettled(_)
            | BookingError::OnboardingIncomplete
            | BookingError::SessionInUse(_) => AppError::ConflictError(err.to_string()),
            BookingError::Token(TokenError::Invalid) => AppError::LinkGone(err.to_string()),
            BookingError::Token(_) => AppError::AuthenticationError(err.to_string()),
            BookingError::Ledger(LedgerError::NotFound(_)) => {
                AppError::NotFoundError(err.to_string())
            }
            BookingError::Ledger(LedgerError::CapacityExceeded { .. })
            | BookingError::Ledger(LedgerError::SessionClosed(_)) => {
                AppError::ConflictError(err.to_string())
            }
            BookingError::Ledger(LedgerError::InvalidCount(_)) => {
                AppError::ValidationError(err.to_string())
            }
            BookingError::Ledger(LedgerError::Store(_)) | BookingError::Store(_) => {
                AppError::InternalServerError(err.to_string())
            }
            BookingError::Payment(_) => AppError::UpstreamError(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn booking_errors_map_to_expected_statuses() {
        let cases: Vec<(BookingError, StatusCode)> = vec![
            (BookingError::NotFound(Uuid::new_v4()), StatusCode::NOT_FOUND),
            (BookingError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (
                BookingError::AlreadyProcessed {
                    id: Uuid::new_v4(),
                    status: cove_booking::ReservationStatus::Approved,
                },
                StatusCode::CONFLICT,
            ),
            (BookingError::Token(TokenError::Invalid), StatusCode::GONE),
            (
                BookingError::Token(TokenError::WrongAction),
                StatusCode::UNAUTHORIZED,
            ),
            (
                BookingError::Ledger(LedgerError::CapacityExceeded { requested: 5, available: 2 }),
                StatusCode::CONFLICT,
            ),
            (BookingError::Payment("down".into()), StatusCode::BAD_GATEWAY),
            (
                BookingError::Store("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
