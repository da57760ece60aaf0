//! End-to-end handling of one credit-gated completion request.
//!
//! Each request runs strictly in order: validate, read the balance,
//! complete the prompt, record usage, respond. Nothing is shared between
//! requests except the read-only ledger client and provider chain.
//!
//! Two properties of this flow are accepted rather than prevented:
//!
//! * The balance check and the usage write are separate ledger calls, so
//!   concurrent requests from one account can all pass the check before any
//!   usage lands. Closing that gap needs an atomic decrement-if-positive on
//!   the ledger side.
//! * Usage is recorded after the completion is produced and its failure is
//!   only logged. A caller can therefore be served without being charged.
//!   The stricter alternative is reserve-then-confirm: consume the credit
//!   before calling the backend and refund on failure, paying a ledger write
//!   of latency on every request.

use crate::error::RelayError;
use completion_client::{Completion, ProviderChain};
use credit_ledger::{AccountId, CreditLedger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// When usage is recorded relative to the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageMode {
    /// Spawn the usage write and respond without waiting for it.
    #[default]
    Background,
    /// Wait for the usage write (success or failure) before responding.
    Inline,
}

/// Static per-process settings for the coordinator.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Preamble prepended to every prompt. Empty sends the prompt alone.
    pub context: String,
    pub usage_mode: UsageMode,
}

/// One inbound request, before validation.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub account: String,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(account: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            prompt: prompt.into(),
        }
    }
}

#[derive(Clone)]
pub struct RelayCoordinator {
    ledger: Arc<dyn CreditLedger>,
    providers: Arc<ProviderChain>,
    settings: Arc<RelaySettings>,
}

impl RelayCoordinator {
    pub fn new(
        ledger: Arc<dyn CreditLedger>,
        providers: ProviderChain,
        settings: RelaySettings,
    ) -> Self {
        Self {
            ledger,
            providers: Arc::new(providers),
            settings: Arc::new(settings),
        }
    }

    pub fn providers(&self) -> &ProviderChain {
        &self.providers
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Prompt actually sent to the backends.
    pub fn compose_prompt(&self, prompt: &str) -> String {
        if self.settings.context.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n{}", self.settings.context, prompt)
        }
    }

    /// Serve one completion request.
    #[instrument(skip_all, fields(account = %request.account))]
    pub async fn handle(&self, request: CompletionRequest) -> Result<Completion, RelayError> {
        let account = parse_account(&request.account)?;

        if request.prompt.trim().is_empty() {
            return Err(RelayError::InvalidInput("Query must not be empty.".into()));
        }

        let balance = self.ledger.balance_of(&account).await.map_err(|e| {
            error!(account = %account, error = %e, "Balance check failed");
            RelayError::LedgerUnavailable(e)
        })?;

        if balance < 1 {
            info!(account = %account, "Rejected request with no remaining credits");
            return Err(RelayError::InsufficientCredit);
        }
        debug!(account = %account, balance, "Balance check passed");

        let prompt = self.compose_prompt(&request.prompt);
        let completion = self.providers.complete(&prompt).await.map_err(|e| {
            error!(account = %account, failures = %e, "Provider chain exhausted");
            RelayError::UpstreamUnavailable(e)
        })?;

        info!(
            account = %account,
            provider = %completion.provider,
            chars = completion.text.len(),
            "Completion served"
        );

        self.record_usage(account).await;

        Ok(completion)
    }

    /// Current balance for a raw account identifier, with the parsed account.
    #[instrument(skip(self))]
    pub async fn balance(&self, account: &str) -> Result<(AccountId, u64), RelayError> {
        let account = parse_account(account)?;
        let credits = self.ledger.balance_of(&account).await.map_err(|e| {
            error!(account = %account, error = %e, "Balance lookup failed");
            RelayError::LedgerUnavailable(e)
        })?;
        Ok((account, credits))
    }

    async fn record_usage(&self, account: AccountId) {
        match self.settings.usage_mode {
            UsageMode::Inline => mark_usage(self.ledger.as_ref(), account).await,
            UsageMode::Background => {
                let ledger = self.ledger.clone();
                tokio::spawn(
                    async move { mark_usage(ledger.as_ref(), account).await }.in_current_span(),
                );
            }
        }
    }
}

fn parse_account(raw: &str) -> Result<AccountId, RelayError> {
    if raw.is_empty() {
        return Err(RelayError::InvalidInput(
            "Missing query or ethAddress in request body.".into(),
        ));
    }
    AccountId::parse(raw).map_err(|e| {
        debug!(error = %e, "Rejected account identifier");
        RelayError::InvalidInput("Invalid Ethereum address.".into())
    })
}

/// Consume one credit; failures are logged only.
async fn mark_usage(ledger: &dyn CreditLedger, account: AccountId) {
    match ledger.mark_usage(&account).await {
        Ok(receipt) => info!(
            account = %account,
            tx_hash = %receipt.tx_hash,
            block = ?receipt.block,
            "Marked usage"
        ),
        Err(e) => warn!(
            account = %account,
            error = %e,
            "Failed to mark usage; completion was already served"
        ),
    }
}
