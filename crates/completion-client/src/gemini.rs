//! Google Gemini `generateContent` backend.

use crate::backend::{handle_response, CompletionBackend};
use crate::error::CompletionError;
use crate::types::*;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: SecretString,
    options: CompletionOptions,
}

impl GeminiBackend {
    pub fn new(
        api_key: SecretString,
        base_url: impl Into<String>,
        options: CompletionOptions,
        timeout: Duration,
    ) -> Result<Self, CompletionError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            options,
        })
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    fn generation_config(&self) -> Option<GenerationConfig> {
        if self.options.temperature.is_none() && self.options.max_tokens.is_none() {
            return None;
        }
        Some(GenerationConfig {
            temperature: self.options.temperature,
            max_output_tokens: self.options.max_tokens,
        })
    }

    #[instrument(skip(self, prompt), fields(model = %self.options.model, prompt_len = prompt.len()))]
    pub async fn generate_content(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: self.generation_config(),
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.options.model
            ))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        let body = handle_response::<GenerateContentResponse>(response).await?;

        body.text()
            .filter(|text| !text.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.options.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.generate_content(prompt).await
    }
}
