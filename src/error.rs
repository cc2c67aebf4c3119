use axum::http::StatusCode;
use thiserror::Error;

use crate::constants::{
    EMAIL_ERROR_MESSAGE, MISSING_FIELDS_MESSAGE, RATE_LIMITED_MESSAGE, SHEET_ERROR_MESSAGE,
};

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Submission rejected by cooldown for {email}")]
    RateLimited { email: String },

    #[error("Email delivery failed: {0}")]
    EmailDelivery(String),

    #[error("Ledger write failed: {0}")]
    LedgerWrite(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JWT signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: std::time::Duration,
    },
}

impl RelayError {
    /// HTTP status the inbound endpoint answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text shown to the caller. Internal detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::Validation(_) => MISSING_FIELDS_MESSAGE,
            RelayError::RateLimited { .. } => RATE_LIMITED_MESSAGE,
            RelayError::LedgerWrite(_) => SHEET_ERROR_MESSAGE,
            _ => EMAIL_ERROR_MESSAGE,
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
