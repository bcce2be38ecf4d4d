use crate::handlers::{AppError, AppState};
use crate::models::{Ack, TallyState, VoteRequest};
use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use log::{info, warn};

pub async fn get_state(State(state): State<AppState>) -> Result<Json<TallyState>, AppError> {
    Ok(Json(state.store.fetch_state().await?))
}

pub async fn post_vote(
    State(state): State<AppState>,
    payload: Result<Json<VoteRequest>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected vote payload: {}", rejection.body_text());
        AppError::MalformedPayload(rejection.body_text())
    })?;

    match request {
        VoteRequest::Vote { id, user_id, user_name } => {
            state.store.cast_vote(&user_id, id, &user_name).await?;
        }
        VoteRequest::Unvote { id, user_id } => {
            state.store.retract_vote(&user_id, id).await?;
        }
        VoteRequest::UpdateLabel { id, label } => {
            state.store.relabel(id, &label).await?;
            info!("Item {} relabeled to '{}'", id, label.trim());
        }
        VoteRequest::Reset => {
            state.store.reset_all().await?;
        }
        VoteRequest::SetMode { mode } => {
            state.store.set_mode(mode).await?;
        }
    }

    Ok(Json(Ack::ok()))
}
