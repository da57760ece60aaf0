//! `ApiAuthorization` contract binding over JSON-RPC.

use crate::error::LedgerError;
use crate::ledger::CreditLedger;
use crate::types::{AccountId, UsageReceipt};
use alloy::network::{EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument};

/// Address the credit contract is deployed at.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x0b6ae13119fc3b61d6abb115342a1a075e14b6b6";

sol! {
    #[sol(rpc)]
    contract ApiAuthorization {
        function purchase() external payable returns (uint256);
        function balanceOf(address _address) external view returns (uint256);
        function markUsage(address _address) external returns (uint256);
    }
}

/// Deadlines for calls against the contract.
#[derive(Debug, Clone, Copy)]
pub struct ContractTimeouts {
    /// Bound on `balanceOf`.
    pub read: Duration,
    /// Bound on waiting for a `markUsage` receipt.
    pub confirmation: Duration,
}

impl Default for ContractTimeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(10),
            confirmation: Duration::from_secs(120),
        }
    }
}

/// Credit ledger backed by the on-chain `ApiAuthorization` contract.
///
/// Usage transactions are signed by the relay's own wallet.
pub struct ContractLedger {
    contract: ApiAuthorization::ApiAuthorizationInstance<DynProvider>,
    signer_address: Address,
    timeouts: ContractTimeouts,
}

impl ContractLedger {
    /// Connect to the contract at `contract_address` through `rpc_url`.
    pub async fn connect(
        rpc_url: &str,
        private_key: &SecretString,
        contract_address: &str,
        timeouts: ContractTimeouts,
    ) -> Result<Self, LedgerError> {
        let signer: PrivateKeySigner = private_key
            .expose_secret()
            .trim()
            .parse()
            .map_err(|_| LedgerError::Config("invalid private key".to_string()))?;
        let signer_address = signer.address();

        let contract_address: Address = contract_address
            .parse()
            .map_err(|e| LedgerError::Config(format!("invalid contract address: {}", e)))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect(rpc_url)
            .await
            .map_err(|e| LedgerError::Config(format!("invalid RPC endpoint: {}", e)))?
            .erased();

        info!(
            contract = %contract_address,
            signer = %signer_address,
            "Credit ledger contract configured"
        );

        Ok(Self {
            contract: ApiAuthorization::new(contract_address, provider),
            signer_address,
            timeouts,
        })
    }

    pub fn contract_address(&self) -> Address {
        *self.contract.address()
    }

    /// Wallet that signs usage transactions.
    pub fn signer_address(&self) -> Address {
        self.signer_address
    }
}

/// Saturate an on-chain `uint256` into the relay's balance type.
fn saturate(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[async_trait]
impl CreditLedger for ContractLedger {
    #[instrument(skip(self), fields(account = %account))]
    async fn balance_of(&self, account: &AccountId) -> Result<u64, LedgerError> {
        let call = self.contract.balanceOf(account.address());

        let balance = timeout(self.timeouts.read, call.call())
            .await
            .map_err(|_| LedgerError::Timeout(format!("balanceOf after {:?}", self.timeouts.read)))?
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        debug!(%balance, "Read balance");
        Ok(saturate(balance))
    }

    #[instrument(skip(self), fields(account = %account))]
    async fn mark_usage(&self, account: &AccountId) -> Result<UsageReceipt, LedgerError> {
        let pending = self
            .contract
            .markUsage(account.address())
            .send()
            .await
            .map_err(|e| LedgerError::Transaction(e.to_string()))?;

        let tx_hash = pending.tx_hash().to_string();
        debug!(%tx_hash, "Usage transaction submitted");

        let receipt = timeout(self.timeouts.confirmation, pending.get_receipt())
            .await
            .map_err(|_| {
                LedgerError::Timeout(format!(
                    "receipt for {} after {:?}",
                    tx_hash, self.timeouts.confirmation
                ))
            })?
            .map_err(|e| LedgerError::Transaction(format!("{}: {}", tx_hash, e)))?;

        if !receipt.status() {
            return Err(LedgerError::Reverted(tx_hash));
        }

        Ok(UsageReceipt {
            tx_hash,
            block: receipt.block_number,
            recorded_at: Utc::now(),
        })
    }
}
