use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::delete,
    Router,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/sessions/{id}", delete(remove_session))
}

async fn remove_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.manager.remove_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
