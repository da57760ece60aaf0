//! Ordered fallback across completion backends.

use crate::backend::CompletionBackend;
use crate::error::{BackendFailure, ChainExhausted, CompletionError};
use crate::types::Completion;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, instrument, warn};

const INITIAL_BACKOFF_MS: u64 = 100;
const MAX_BACKOFF_MS: u64 = 5000;

/// How each backend in the chain is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Upper bound on a single attempt against one backend.
    pub timeout: Duration,
    /// Extra attempts on the same backend for transient errors.
    pub max_retries: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 0,
        }
    }
}

/// Backends tried in priority order until one produces text.
///
/// Built once at startup and shared read-only between requests.
#[derive(Clone)]
pub struct ProviderChain {
    backends: Vec<Arc<dyn CompletionBackend>>,
    policy: CallPolicy,
}

impl ProviderChain {
    pub fn new(backends: Vec<Arc<dyn CompletionBackend>>, policy: CallPolicy) -> Self {
        Self { backends, policy }
    }

    pub fn backends(&self) -> &[Arc<dyn CompletionBackend>] {
        &self.backends
    }

    pub fn policy(&self) -> CallPolicy {
        self.policy
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Run `prompt` through the chain.
    ///
    /// Returns the first non-empty (trimmed) output. When every backend
    /// fails, the error carries each backend's failure in chain order.
    #[instrument(skip(self, prompt), fields(backends = self.backends.len()))]
    pub async fn complete(&self, prompt: &str) -> Result<Completion, ChainExhausted> {
        let mut failures = Vec::with_capacity(self.backends.len());

        for backend in &self.backends {
            match self.call_backend(backend.as_ref(), prompt).await {
                Ok(text) => {
                    if !failures.is_empty() {
                        info!(
                            backend = backend.name(),
                            failed = failures.len(),
                            "Fallback backend produced completion"
                        );
                    }
                    return Ok(Completion {
                        text,
                        provider: backend.name().to_string(),
                    });
                }
                Err(e) => {
                    warn!(
                        backend = backend.name(),
                        model = backend.model(),
                        error = %e,
                        "Completion backend failed"
                    );
                    failures.push(BackendFailure {
                        backend: backend.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Err(ChainExhausted { failures })
    }

    /// One backend, with the per-attempt timeout and optional retries.
    async fn call_backend(
        &self,
        backend: &dyn CompletionBackend,
        prompt: &str,
    ) -> Result<String, CompletionError> {
        let mut backoff_ms = INITIAL_BACKOFF_MS;
        let mut attempt = 0;

        loop {
            let result = match timeout(self.policy.timeout, backend.complete(prompt)).await {
                Ok(result) => result,
                Err(_) => Err(CompletionError::Timeout(self.policy.timeout)),
            };

            let err = match result {
                Ok(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        CompletionError::EmptyResponse
                    } else {
                        return Ok(trimmed.to_string());
                    }
                }
                Err(e) => e,
            };

            if attempt >= self.policy.max_retries || !err.is_transient() {
                return Err(err);
            }

            attempt += 1;
            debug!(
                backend = backend.name(),
                "Retry attempt {} after {}ms backoff", attempt, backoff_ms
            );
            sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Step {
        Reply(&'static str),
        Fail(fn() -> CompletionError),
        Hang,
    }

    struct ScriptedBackend {
        name: &'static str,
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(name: &'static str, steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                name,
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn name(&self) -> &str {
            self.name
        }

        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Reply(text)) => Ok(text.to_string()),
                Some(Step::Fail(make)) => Err(make()),
                Some(Step::Hang) => {
                    sleep(Duration::from_secs(3600)).await;
                    Ok("too late".to_string())
                }
                None => Err(CompletionError::EmptyResponse),
            }
        }
    }

    fn chain(backends: Vec<Arc<ScriptedBackend>>, policy: CallPolicy) -> ProviderChain {
        ProviderChain::new(
            backends
                .into_iter()
                .map(|b| b as Arc<dyn CompletionBackend>)
                .collect(),
            policy,
        )
    }

    fn fast_policy() -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_millis(100),
            max_retries: 0,
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = ScriptedBackend::new("primary", vec![Step::Reply("  4  \n")]);
        let fallback = ScriptedBackend::new("fallback", vec![Step::Reply("unused")]);
        let chain = chain(vec![primary.clone(), fallback.clone()], fast_policy());

        let completion = chain.complete("What is 2+2?").await.unwrap();
        assert_eq!(completion.text, "4");
        assert_eq!(completion.provider, "primary");
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_after_error() {
        let primary =
            ScriptedBackend::new("primary", vec![Step::Fail(|| CompletionError::RateLimit)]);
        let fallback = ScriptedBackend::new("fallback", vec![Step::Reply("ok")]);
        let chain = chain(vec![primary.clone(), fallback.clone()], fast_policy());

        let completion = chain.complete("hi").await.unwrap();
        assert_eq!(completion.text, "ok");
        assert_eq!(completion.provider, "fallback");
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_hung_backend_is_abandoned_at_timeout() {
        let primary = ScriptedBackend::new("primary", vec![Step::Hang]);
        let fallback = ScriptedBackend::new("fallback", vec![Step::Reply("ok")]);
        let chain = chain(vec![primary.clone(), fallback.clone()], fast_policy());

        let started = std::time::Instant::now();
        let completion = chain.complete("hi").await.unwrap();
        assert_eq!(completion.text, "ok");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_blank_output_falls_through() {
        let primary = ScriptedBackend::new("primary", vec![Step::Reply("   ")]);
        let fallback = ScriptedBackend::new("fallback", vec![Step::Reply("ok")]);
        let chain = chain(vec![primary, fallback], fast_policy());

        assert_eq!(chain.complete("hi").await.unwrap().provider, "fallback");
    }

    #[tokio::test]
    async fn test_exhausted_reports_every_failure_in_order() {
        let primary = ScriptedBackend::new("primary", vec![Step::Hang]);
        let fallback =
            ScriptedBackend::new("fallback", vec![Step::Fail(|| CompletionError::Unauthorized)]);
        let chain = chain(vec![primary, fallback], fast_policy());

        let err = chain.complete("hi").await.unwrap_err();
        assert_eq!(err.failures.len(), 2);
        assert_eq!(err.failures[0].backend, "primary");
        assert!(err.failures[0].error.starts_with("Timed out"));
        assert_eq!(err.failures[1].backend, "fallback");
        assert_eq!(err.failures[1].error, "Authentication failed");
        assert!(err.to_string().contains("primary: Timed out"));
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let chain = ProviderChain::new(Vec::new(), CallPolicy::default());
        assert!(chain.is_empty());
        let err = chain.complete("hi").await.unwrap_err();
        assert!(err.failures.is_empty());
        assert_eq!(err.to_string(), "no completion backend configured");
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let primary = ScriptedBackend::new(
            "primary",
            vec![Step::Fail(|| CompletionError::RateLimit), Step::Reply("second")],
        );
        let chain = chain(vec![primary.clone()], fast_policy());

        assert!(chain.complete("hi").await.is_err());
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_retry_transient_error_on_same_backend() {
        let primary = ScriptedBackend::new(
            "primary",
            vec![
                Step::Fail(|| CompletionError::Api {
                    status: 502,
                    message: "bad gateway".into(),
                }),
                Step::Reply("second"),
            ],
        );
        let policy = CallPolicy {
            max_retries: 2,
            ..fast_policy()
        };
        let chain = chain(vec![primary.clone()], policy);

        let completion = chain.complete("hi").await.unwrap();
        assert_eq!(completion.text, "second");
        assert_eq!(primary.calls(), 2);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let primary = ScriptedBackend::new(
            "primary",
            vec![Step::Fail(|| CompletionError::Unauthorized), Step::Reply("never")],
        );
        let fallback = ScriptedBackend::new("fallback", vec![Step::Reply("ok")]);
        let policy = CallPolicy {
            max_retries: 3,
            ..fast_policy()
        };
        let chain = chain(vec![primary.clone(), fallback], policy);

        assert_eq!(chain.complete("hi").await.unwrap().text, "ok");
        assert_eq!(primary.calls(), 1);
    }
}
