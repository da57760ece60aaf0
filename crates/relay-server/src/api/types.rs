//! API request and response types.

use crate::coordinator::UsageMode;
use serde::{Deserialize, Serialize};

/// Request to complete a prompt on behalf of an account.
///
/// Both fields are optional at the wire level so that a missing field is
/// reported as invalid input rather than a body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// The prompt
    pub query: Option<String>,

    /// Account to charge, as a `0x` address
    pub eth_address: Option<String>,
}

/// Completion result.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub result: String,
}

/// Remaining credits for an account.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Checksummed address
    pub address: String,
    pub credits: u64,
}

/// A configured completion backend.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub model: String,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub providers: Vec<ProviderInfo>,
    pub usage_mode: UsageMode,
}
