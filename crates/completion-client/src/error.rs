//! Completion backend errors.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Authentication failed")]
    Unauthorized,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Empty response from completion backend")]
    EmptyResponse,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl CompletionError {
    /// Whether another attempt against the same backend could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            CompletionError::Http(_) | CompletionError::RateLimit | CompletionError::Timeout(_) => {
                true
            }
            CompletionError::Api { status, .. } => *status >= 500,
            CompletionError::Unauthorized
            | CompletionError::Json(_)
            | CompletionError::EmptyResponse => false,
        }
    }
}

/// One backend's failure inside a provider chain run.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendFailure {
    pub backend: String,
    pub error: String,
}

/// Every backend in the chain failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ChainExhausted {
    pub failures: Vec<BackendFailure>,
}

impl fmt::Display for ChainExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no completion backend configured");
        }
        write!(f, "all completion backends failed: ")?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", failure.backend, failure.error)?;
        }
        Ok(())
    }
}
