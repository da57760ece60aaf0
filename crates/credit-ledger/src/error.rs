//! Ledger error types.

use thiserror::Error;

/// Errors that can occur talking to the credit ledger.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Account identifier is not a valid address.
    #[error("Invalid account identifier: {0}")]
    InvalidAccount(String),

    /// Client could not be configured (bad URL, key or address).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Read call failed at the RPC layer.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Transaction could not be submitted or confirmed.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Transaction was mined but reverted.
    #[error("Transaction reverted: {0}")]
    Reverted(String),

    /// Call did not finish within its deadline.
    #[error("Ledger call timed out: {0}")]
    Timeout(String),
}
