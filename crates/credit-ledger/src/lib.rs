//! Client for the on-chain API credit ledger.
//!
//! Users buy credits from the `ApiAuthorization` contract; the relay reads
//! balances and consumes one credit per served completion.
//!
//! # Modules
//!
//! - [`ledger`] - The `CreditLedger` trait the relay depends on
//! - [`contract`] - Contract binding over JSON-RPC (production)
//! - [`memory`] - In-process ledger (local runs and tests)
//! - [`types`] - Account identifiers and usage receipts

pub mod contract;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod types;

pub use contract::{ApiAuthorization, ContractLedger, ContractTimeouts, DEFAULT_CONTRACT_ADDRESS};
pub use error::LedgerError;
pub use ledger::CreditLedger;
pub use memory::MemoryLedger;
pub use types::{AccountId, UsageReceipt};
