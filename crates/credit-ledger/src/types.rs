//! Core types for the credit ledger.

use crate::error::LedgerError;
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Caller identity: an EVM address, validated once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountId(Address);

impl AccountId {
    /// Parse an address the way the ledger accepts it.
    ///
    /// An optional `0x` prefix followed by 40 hex digits. Mixed-case input
    /// must carry a valid EIP-55 checksum; all-lower or all-upper input is
    /// accepted as is.
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        let digits = input.strip_prefix("0x").unwrap_or(input);

        if digits.len() != 40 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(LedgerError::InvalidAccount(format!(
                "expected 40 hex digits, got {:?}",
                input
            )));
        }

        let has_lower = digits.bytes().any(|b| b.is_ascii_lowercase());
        let has_upper = digits.bytes().any(|b| b.is_ascii_uppercase());

        let address = if has_lower && has_upper {
            Address::parse_checksummed(format!("0x{}", digits), None)
                .map_err(|_| LedgerError::InvalidAccount(format!("bad checksum: {}", input)))?
        } else {
            Address::from_str(digits)
                .map_err(|e| LedgerError::InvalidAccount(format!("{}: {}", input, e)))?
        };

        Ok(Self(address))
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

impl From<Address> for AccountId {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

impl FromStr for AccountId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Checksummed `0x` form.
impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_checksum(None))
    }
}

/// Acknowledgement of a recorded usage.
#[derive(Debug, Clone, Serialize)]
pub struct UsageReceipt {
    /// Transaction hash (or a local marker for in-process ledgers).
    pub tx_hash: String,
    /// Block the transaction landed in, when known.
    pub block: Option<u64>,
    /// When the receipt was observed.
    pub recorded_at: DateTime<Utc>,
}
