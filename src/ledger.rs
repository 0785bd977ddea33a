//! Ledger access
//!
//! Everything the client needs from a Solana node sits behind
//! [`LedgerClient`]; [`RpcLedger`] is the JSON-RPC implementation.

use async_trait::async_trait;
use solana_client::{client_error::ClientError, nonblocking::rpc_client::RpcClient};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::InstructionError,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Network or RPC server failure
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    #[error("Account not found: {account}")]
    AccountNotFound { account: String },

    /// The transaction was rejected by the cluster
    #[error("Transaction failed: {message} (code: {code:?})")]
    Transaction { code: Option<u32>, message: String },
}

impl LedgerError {
    /// Custom program error code, when the failure carries one
    pub fn program_code(&self) -> Option<u32> {
        match self {
            Self::Transaction { code, .. } => *code,
            _ => None,
        }
    }
}

/// Read and submit operations against the ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Balance in lamports
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, LedgerError>;

    async fn get_account_data(&self, address: &Pubkey) -> Result<Vec<u8>, LedgerError>;

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError>;

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError>;

    async fn send_and_confirm_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<Signature, LedgerError>;

    /// Identifies the connection; a change triggers a state refresh
    fn endpoint(&self) -> &str;
}

pub struct RpcLedger {
    client: Arc<RpcClient>,
    endpoint: String,
}

impl RpcLedger {
    pub fn new(url: &str, timeout: Duration, commitment: CommitmentConfig) -> Self {
        Self {
            client: Arc::new(RpcClient::new_with_timeout_and_commitment(
                url.to_string(),
                timeout,
                commitment,
            )),
            endpoint: url.to_string(),
        }
    }

    fn map_error(&self, err: ClientError, account: Option<&Pubkey>) -> LedgerError {
        if let Some(tx_err) = err.get_transaction_error() {
            return LedgerError::Transaction {
                code: custom_code(&tx_err),
                message: err.to_string(),
            };
        }
        let message = err.to_string();
        match account {
            Some(account) if message.contains("AccountNotFound") => {
                LedgerError::AccountNotFound { account: account.to_string() }
            }
            _ => LedgerError::Transport { endpoint: self.endpoint.clone(), message },
        }
    }
}

fn custom_code(err: &TransactionError) -> Option<u32> {
    match err {
        TransactionError::InstructionError(_, InstructionError::Custom(code)) => Some(*code),
        _ => None,
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    #[instrument(skip(self), level = "debug")]
    async fn get_balance(&self, owner: &Pubkey) -> Result<u64, LedgerError> {
        self.client
            .get_balance(owner)
            .await
            .map_err(|e| self.map_error(e, None))
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_account_data(&self, address: &Pubkey) -> Result<Vec<u8>, LedgerError> {
        self.client
            .get_account_data(address)
            .await
            .map_err(|e| self.map_error(e, Some(address)))
    }

    async fn get_minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(|e| self.map_error(e, None))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, LedgerError> {
        self.client
            .get_latest_blockhash()
            .await
            .map_err(|e| self.map_error(e, None))
    }

    async fn send_and_confirm_transaction(
        &self,
        tx: &Transaction,
    ) -> Result<Signature, LedgerError> {
        debug!(signatures = tx.signatures.len(), "Submitting transaction");
        self.client
            .send_and_confirm_transaction(tx)
            .await
            .map_err(|e| self.map_error(e, None))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
