//! Text completion backends behind one `complete(prompt)` call.
//!
//! Two backend variants are provided, Google Gemini and any
//! OpenAI-compatible chat completions endpoint. A [`ProviderChain`] tries
//! configured backends in order and returns the first usable output.

mod backend;
mod chain;
mod error;
mod gemini;
mod openai;
mod types;

pub use backend::CompletionBackend;
pub use chain::{CallPolicy, ProviderChain};
pub use error::{BackendFailure, ChainExhausted, CompletionError};
pub use gemini::{GeminiBackend, DEFAULT_GEMINI_BASE_URL};
pub use openai::{OpenAiBackend, DEFAULT_OPENAI_BASE_URL, DEFAULT_SYSTEM_PROMPT};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_gemini_outage_falls_back_to_openai() {
        let gemini_server = MockServer::start().await;
        let openai_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.0-flash:generateContent"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .expect(1)
            .mount(&gemini_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "Four."},
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&openai_server)
            .await;

        let gemini = GeminiBackend::new(
            SecretString::new("g".into()),
            gemini_server.uri(),
            CompletionOptions::new("gemini-2.0-flash"),
            Duration::from_secs(5),
        )
        .unwrap();
        let openai = OpenAiBackend::new(
            SecretString::new("o".into()),
            openai_server.uri(),
            CompletionOptions::new("gpt-4o-mini"),
            Duration::from_secs(5),
        )
        .unwrap();

        let backends: Vec<Arc<dyn CompletionBackend>> = vec![Arc::new(gemini), Arc::new(openai)];
        let chain = ProviderChain::new(backends, CallPolicy::default());

        let completion = chain.complete("What is 2+2?").await.unwrap();
        assert_eq!(completion.text, "Four.");
        assert_eq!(completion.provider, "openai");
    }

    #[test]
    fn test_transient_classification() {
        assert!(CompletionError::RateLimit.is_transient());
        assert!(CompletionError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(CompletionError::Api {
            status: 503,
            message: String::new()
        }
        .is_transient());
        assert!(!CompletionError::Api {
            status: 400,
            message: String::new()
        }
        .is_transient());
        assert!(!CompletionError::Unauthorized.is_transient());
        assert!(!CompletionError::EmptyResponse.is_transient());
    }

    #[test]
    fn test_options_builder() {
        let options = CompletionOptions::new("gpt-4o-mini")
            .with_temperature(0.7)
            .with_max_tokens(150);
        assert_eq!(options.model, "gpt-4o-mini");
        assert_eq!(options.temperature, Some(0.7));
        assert_eq!(options.max_tokens, Some(150));
    }
}
