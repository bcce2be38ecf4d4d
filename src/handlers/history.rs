use crate::handlers::{AppError, AppState};
use crate::models::{Ack, DeleteHistoryRequest, HistorySnapshot};
use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

pub async fn list_history(State(state): State<AppState>) -> Result<Json<Vec<HistorySnapshot>>, AppError> {
    Ok(Json(state.store.list_history().await?))
}

// Ends the round: snapshot, then clear
pub async fn finalize_round(State(state): State<AppState>) -> Result<Json<HistorySnapshot>, AppError> {
    Ok(Json(state.store.finalize_round().await?))
}

pub async fn delete_history(
    State(state): State<AppState>,
    payload: Result<Json<DeleteHistoryRequest>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::MalformedPayload(rejection.body_text()))?;
    state.store.delete_history(request.id).await?;
    Ok(Json(Ack::ok()))
}
