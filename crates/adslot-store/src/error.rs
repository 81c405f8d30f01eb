//! Store error types.

use thiserror::Error;

/// Errors from campaign store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Request error: {0}")]
    Request(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid campaign {id}: {reason}")]
    InvalidCampaign { id: String, reason: String },

    #[error("Store misconfigured: {0}")]
    Config(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Deserialization(e.to_string())
        } else {
            StoreError::Request(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Deserialization(e.to_string())
    }
}
