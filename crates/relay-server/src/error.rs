//! Error types for the relay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use completion_client::ChainExhausted;
use credit_ledger::LedgerError;
use serde::Serialize;
use thiserror::Error;

/// Request-level failures, each mapped to one HTTP status.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Insufficient credits")]
    InsufficientCredit,

    #[error("Credit ledger unavailable: {0}")]
    LedgerUnavailable(LedgerError),

    #[error("Completion backends unavailable: {0}")]
    UpstreamUnavailable(ChainExhausted),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RelayError::InsufficientCredit => StatusCode::FORBIDDEN,
            RelayError::LedgerUnavailable(_) | RelayError::UpstreamUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
            RelayError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => "INVALID_INPUT",
            RelayError::InsufficientCredit => "INSUFFICIENT_CREDIT",
            RelayError::LedgerUnavailable(_) => "LEDGER_UNAVAILABLE",
            RelayError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            RelayError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            RelayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to return to callers. Backend and ledger detail stays
    /// in the logs.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::InvalidInput(message) => message.clone(),
            RelayError::InsufficientCredit => {
                "Insufficient credits. Please purchase more access.".to_string()
            }
            RelayError::LedgerUnavailable(_) => "Unable to verify credits right now.".to_string(),
            RelayError::UpstreamUnavailable(_) => {
                "Failed to get a response from the AI service.".to_string()
            }
            RelayError::RateLimitExceeded => self.to_string(),
            RelayError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.public_message(),
            code: self.code().to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}
