//! The backend abstraction the provider chain iterates over.

use crate::error::CompletionError;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

/// A text-generation service that turns a prompt into text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Short backend name used in logs and results (e.g. "gemini").
    fn name(&self) -> &str;

    /// Model identifier the backend targets.
    fn model(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// Decode a successful response body or map the failure status.
pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CompletionError> {
    let status = response.status();

    if status.is_success() {
        let body = response.text().await?;
        debug!("Response body: {}", truncate(&body, 200));
        serde_json::from_str(&body).map_err(CompletionError::from)
    } else {
        Err(extract_error(response).await)
    }
}

async fn extract_error(response: reqwest::Response) -> CompletionError {
    let status = response.status();

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("Rate limit exceeded");
            CompletionError::RateLimit
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            warn!("Authentication failed");
            CompletionError::Unauthorized
        }
        _ => {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".into());
            CompletionError::Api {
                status: status.as_u16(),
                message,
            }
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
