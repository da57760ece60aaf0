//! In-process credit ledger.

use crate::error::LedgerError;
use crate::ledger::CreditLedger;
use crate::types::{AccountId, UsageReceipt};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Ledger kept in memory, for local runs and tests.
///
/// Mirrors the contract's rules: unknown accounts hold zero credits and
/// consuming a credit at zero is rejected.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    balances: RwLock<HashMap<AccountId, u64>>,
    sequence: AtomicU64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `credits` to `account`, returning the new balance.
    pub async fn credit(&self, account: AccountId, credits: u64) -> u64 {
        let mut balances = self.balances.write().await;
        let balance = balances.entry(account).or_insert(0);
        *balance = balance.saturating_add(credits);
        *balance
    }

    pub async fn count(&self) -> usize {
        self.balances.read().await.len()
    }
}

#[async_trait]
impl CreditLedger for MemoryLedger {
    async fn balance_of(&self, account: &AccountId) -> Result<u64, LedgerError> {
        let balances = self.balances.read().await;
        Ok(balances.get(account).copied().unwrap_or(0))
    }

    async fn mark_usage(&self, account: &AccountId) -> Result<UsageReceipt, LedgerError> {
        let mut balances = self.balances.write().await;
        let balance = balances
            .get_mut(account)
            .filter(|b| **b > 0)
            .ok_or_else(|| LedgerError::Reverted("no remaining access".to_string()))?;
        *balance -= 1;
        debug!(account = %account, remaining = *balance, "Usage recorded");

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        Ok(UsageReceipt {
            tx_hash: format!("memory-{}", seq),
            block: None,
            recorded_at: Utc::now(),
        })
    }
}
