//! The ledger boundary the relay depends on.

use crate::error::LedgerError;
use crate::types::{AccountId, UsageReceipt};
use async_trait::async_trait;

/// Remote system of record for per-account API credits.
///
/// Reads are expected to return promptly. Writes may take arbitrarily long
/// and can fail independently of reads. Neither call offers an atomic
/// check-and-decrement, so two callers can both observe a positive balance
/// before either usage lands.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current credit balance for `account`.
    async fn balance_of(&self, account: &AccountId) -> Result<u64, LedgerError>;

    /// Consume one credit for `account`.
    async fn mark_usage(&self, account: &AccountId) -> Result<UsageReceipt, LedgerError>;
}
