//! Configuration for the relay, loaded from environment variables.

use crate::coordinator::UsageMode;
use anyhow::{bail, Context, Result};
use axum::http::HeaderValue;
use completion_client::{DEFAULT_GEMINI_BASE_URL, DEFAULT_OPENAI_BASE_URL, DEFAULT_SYSTEM_PROMPT};
use credit_ledger::DEFAULT_CONTRACT_ADDRESS;
use regex_lite::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

/// Knowledge preamble prepended to every prompt unless overridden.
pub const DEFAULT_CONTEXT: &str = "The Earth revolves around the Sun. \
Water boils at 100 degrees Celsius. \
Light travels faster than sound. \
The human body has 206 bones.";

/// Relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Credit ledger configuration
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Gemini backend configuration
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// OpenAI-compatible backend configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Provider chain configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Request handling configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated origins allowed by CORS; any origin when unset
    #[serde(default)]
    pub allowed_origins: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the chain hosting the credit contract
    #[serde(default)]
    pub rpc_url: Option<String>,

    /// Key of the wallet that signs usage transactions
    #[serde(default)]
    pub private_key: Option<SecretString>,

    /// Credit contract address
    #[serde(default = "default_contract_address")]
    pub contract_address: String,

    /// Deadline for balance reads
    #[serde(default = "default_read_timeout", with = "humantime_serde")]
    pub read_timeout: Duration,

    /// Deadline for usage transaction receipts
    #[serde(default = "default_confirmation_timeout", with = "humantime_serde")]
    pub confirmation_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiConfig {
    /// Gemini API key
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// API base URL
    #[serde(default = "default_gemini_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Sampling temperature in [0, 1]
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Output length cap
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    /// OpenAI API key
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// API base URL
    #[serde(default = "default_openai_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Sampling temperature in [0, 1]
    #[serde(default = "default_openai_temperature")]
    pub temperature: Option<f32>,

    /// Output length cap
    #[serde(default = "default_openai_max_tokens")]
    pub max_tokens: Option<u32>,

    /// System message sent ahead of the prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// Comma-separated backend names in priority order
    #[serde(default = "default_order")]
    pub order: String,

    /// Per-attempt timeout for each backend
    #[serde(default = "default_completion_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Retries on the same backend for transient errors
    #[serde(default)]
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// When usage is recorded relative to the response
    #[serde(default)]
    pub usage_mode: UsageMode,

    /// Preamble prepended to every prompt
    #[serde(default = "default_context")]
    pub context: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Completion backend variants, as named in `COMPLETION__ORDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Gemini,
    OpenAi,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(BackendKind::Gemini),
            "openai" => Ok(BackendKind::OpenAi),
            other => bail!("Unknown completion backend: {:?}", other),
        }
    }
}

// Default implementations
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
            allowed_origins: None,
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            private_key: None,
            contract_address: default_contract_address(),
            read_timeout: default_read_timeout(),
            confirmation_timeout: default_confirmation_timeout(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_url(),
            model: default_gemini_model(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            max_tokens: default_openai_max_tokens(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            order: default_order(),
            timeout: default_completion_timeout(),
            max_retries: 0,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            usage_mode: UsageMode::default(),
            context: default_context(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3000
}

fn default_contract_address() -> String {
    DEFAULT_CONTRACT_ADDRESS.into()
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_confirmation_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_gemini_url() -> String {
    DEFAULT_GEMINI_BASE_URL.into()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".into()
}

fn default_openai_url() -> String {
    DEFAULT_OPENAI_BASE_URL.into()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".into()
}

fn default_openai_temperature() -> Option<f32> {
    Some(0.7)
}

fn default_openai_max_tokens() -> Option<u32> {
    Some(150)
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

fn default_order() -> String {
    "gemini,openai".into()
}

fn default_completion_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_context() -> String {
    DEFAULT_CONTEXT.into()
}

fn default_per_minute() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

/// Template values such as `your_api_key`, `YOUR-API-KEY` or `yourapikey`.
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)your[_-]?api[_-]?key").expect("valid regex"));

/// Whether a credential is present and not a template placeholder.
pub fn is_usable_credential(value: Option<&SecretString>) -> bool {
    let Some(secret) = value else {
        return false;
    };
    let secret = secret.expose_secret().trim();
    !secret.is_empty() && !PLACEHOLDER_REGEX.is_match(secret)
}

impl ServerConfig {
    /// Configured CORS origins: comma-separated, trimmed, empties dropped.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect()
    }
}

impl CompletionConfig {
    /// Backend names parsed in priority order.
    pub fn backend_order(&self) -> Result<Vec<BackendKind>> {
        let mut kinds = Vec::new();
        for name in self.order.split(',').filter(|n| !n.trim().is_empty()) {
            let kind: BackendKind = name.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Self::from_environment(config::Environment::default())
    }

    /// Build configuration from an explicit environment source.
    pub fn from_environment(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment.separator("__").try_parsing(false))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Backends from the configured order that hold a usable API key.
    pub fn usable_backends(&self) -> Result<Vec<BackendKind>> {
        Ok(self
            .completion
            .backend_order()?
            .into_iter()
            .filter(|kind| match kind {
                BackendKind::Gemini => is_usable_credential(self.gemini.api_key.as_ref()),
                BackendKind::OpenAi => is_usable_credential(self.openai.api_key.as_ref()),
            })
            .collect())
    }

    /// Reject configurations the relay cannot start with.
    pub fn validate(&self) -> Result<()> {
        let rpc_missing = self
            .ledger
            .rpc_url
            .as_deref()
            .map_or(true, |url| url.trim().is_empty());
        let key_missing = !is_usable_credential(self.ledger.private_key.as_ref());
        if rpc_missing || key_missing {
            bail!("Missing LEDGER__PRIVATE_KEY or LEDGER__RPC_URL");
        }

        if self.usable_backends()?.is_empty() {
            bail!("Provide at least one completion backend key (GEMINI__API_KEY or OPENAI__API_KEY)");
        }

        for (name, temperature) in [
            ("gemini", self.gemini.temperature),
            ("openai", self.openai.temperature),
        ] {
            if let Some(t) = temperature {
                if !(0.0..=1.0).contains(&t) {
                    bail!("{} temperature must be within [0, 1], got {}", name, t);
                }
            }
        }

        for origin in self.server.allowed_origins() {
            HeaderValue::from_str(&origin)
                .with_context(|| format!("Invalid allowed origin: {:?}", origin))?;
        }

        Ok(())
    }
}
