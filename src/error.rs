use crate::models::ItemId;
use thiserror::Error;

/// Failure of any vote store operation, local or remote.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Item {0} not found")]
    UnknownItem(ItemId),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Enter your name before voting")]
    MissingName,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
