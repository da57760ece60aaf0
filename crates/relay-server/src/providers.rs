//! Provider chain assembly from configuration.

use crate::config::{BackendKind, Config};
use anyhow::{Context, Result};
use completion_client::{
    CallPolicy, CompletionBackend, CompletionOptions, GeminiBackend, OpenAiBackend, ProviderChain,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the chain from the configured order, skipping backends without a
/// usable key.
pub fn build_provider_chain(config: &Config) -> Result<ProviderChain> {
    let usable = config.usable_backends()?;
    let mut backends: Vec<Arc<dyn CompletionBackend>> = Vec::with_capacity(usable.len());

    for kind in config.completion.backend_order()? {
        if !usable.contains(&kind) {
            warn!(backend = ?kind, "Completion backend skipped: no usable API key");
            continue;
        }

        let backend: Arc<dyn CompletionBackend> = match kind {
            BackendKind::Gemini => {
                let Some(api_key) = config.gemini.api_key.clone() else {
                    continue;
                };
                let options = CompletionOptions {
                    model: config.gemini.model.clone(),
                    temperature: config.gemini.temperature,
                    max_tokens: config.gemini.max_tokens,
                };
                Arc::new(
                    GeminiBackend::new(
                        api_key,
                        config.gemini.base_url.clone(),
                        options,
                        config.completion.timeout,
                    )
                    .context("Failed to create Gemini backend")?,
                )
            }
            BackendKind::OpenAi => {
                let Some(api_key) = config.openai.api_key.clone() else {
                    continue;
                };
                let options = CompletionOptions {
                    model: config.openai.model.clone(),
                    temperature: config.openai.temperature,
                    max_tokens: config.openai.max_tokens,
                };
                Arc::new(
                    OpenAiBackend::new(
                        api_key,
                        config.openai.base_url.clone(),
                        options,
                        config.completion.timeout,
                    )
                    .context("Failed to create OpenAI backend")?
                    .with_system_prompt(config.openai.system_prompt.clone()),
                )
            }
        };

        info!(
            backend = backend.name(),
            model = backend.model(),
            "Completion backend configured"
        );
        backends.push(backend);
    }

    let policy = CallPolicy {
        timeout: config.completion.timeout,
        max_retries: config.completion.max_retries,
    };

    Ok(ProviderChain::new(backends, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::time::Duration;

    fn config_with_keys(gemini: Option<&str>, openai: Option<&str>) -> Config {
        let mut config = Config::default();
        config.gemini.api_key = gemini.map(|k| SecretString::new(k.to_string()));
        config.openai.api_key = openai.map(|k| SecretString::new(k.to_string()));
        config
    }

    fn names(chain: &ProviderChain) -> Vec<String> {
        chain.backends().iter().map(|b| b.name().to_string()).collect()
    }

    #[test]
    fn test_both_backends_in_default_order() {
        let chain = build_provider_chain(&config_with_keys(Some("g"), Some("o"))).unwrap();
        assert_eq!(names(&chain), vec!["gemini", "openai"]);
        assert_eq!(chain.policy().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_placeholder_key_is_skipped() {
        let chain =
            build_provider_chain(&config_with_keys(Some("your_api_key"), Some("o"))).unwrap();
        assert_eq!(names(&chain), vec!["openai"]);
    }

    #[test]
    fn test_custom_order() {
        let mut config = config_with_keys(Some("g"), Some("o"));
        config.completion.order = "openai,gemini".into();
        config.completion.max_retries = 1;
        let chain = build_provider_chain(&config).unwrap();
        assert_eq!(names(&chain), vec!["openai", "gemini"]);
        assert_eq!(chain.policy().max_retries, 1);
    }

    #[test]
    fn test_no_keys_gives_empty_chain() {
        let chain = build_provider_chain(&config_with_keys(None, None)).unwrap();
        assert!(chain.is_empty());
    }
}
