mod history;
mod vote;

use crate::error::StoreError;
use crate::store::VoteStore;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use log::error;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VoteStore>,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::Invalid(_)) => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::UnknownItem(_)) => StatusCode::NOT_FOUND,
            AppError::Store(e) => {
                error!("Store failure while handling request: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, self.to_string()).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/vote", get(vote::get_state).post(vote::post_vote))
        .route(
            "/api/history",
            get(history::list_history)
                .post(history::finalize_round)
                .delete(history::delete_history),
        )
        .with_state(state)
}
