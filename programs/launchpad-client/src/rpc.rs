use std::future::Future;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use solana_client::client_error::ClientError;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig, hash::Hash, signature::Signature,
    transaction::{Transaction, TransactionError},
};
use thiserror::Error;
use tracing::debug;

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RpcFailureKind {
    /// Node or transport rejected the request
    Request,
    /// The blockhash's validity window passed before confirmation
    BlockHeightExceeded,
}

/// Failure reported by the ledger node, with the structured transaction error
/// when the node supplied one.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("{message}")]
pub struct RpcFailure {
    pub kind: RpcFailureKind,
    pub transaction_error: Option<TransactionError>,
    pub message: String,
}

impl RpcFailure {
    pub fn request(message: impl Into<String>) -> Self {
        Self {
            kind: RpcFailureKind::Request,
            transaction_error: None,
            message: message.into(),
        }
    }

    pub fn with_transaction_error(error: TransactionError) -> Self {
        Self {
            kind: RpcFailureKind::Request,
            message: error.to_string(),
            transaction_error: Some(error),
        }
    }

    pub fn block_height_exceeded(signature: &Signature) -> Self {
        Self {
            kind: RpcFailureKind::BlockHeightExceeded,
            transaction_error: None,
            message: format!("signature {} has expired: block height exceeded", signature),
        }
    }
}

impl From<ClientError> for RpcFailure {
    fn from(err: ClientError) -> Self {
        Self {
            kind: RpcFailureKind::Request,
            transaction_error: err.get_transaction_error(),
            message: err.to_string(),
        }
    }
}

/// Ledger access needed by the client
pub trait LedgerRpc: Send + Sync + 'static {
    /// Latest blockhash and the last block height at which it is valid
    fn fetch_latest_blockhash(
        &self,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<(Hash, u64), RpcFailure>> + Send;

    fn send_signed_transaction(
        &self,
        transaction: &Transaction,
        skip_preflight: bool,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<Signature, RpcFailure>> + Send;

    /// Wait for `signature` to reach `commitment`. Resolves to the on-chain
    /// execution error, if any.
    fn confirm_signature(
        &self,
        signature: &Signature,
        blockhash: &Hash,
        last_valid_block_height: u64,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<Option<TransactionError>, RpcFailure>> + Send;

    fn minimum_balance_for_rent_exemption(
        &self,
        size: usize,
    ) -> impl Future<Output = Result<u64, RpcFailure>> + Send;

    /// Raw account data, `None` when the account does not exist
    fn fetch_account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, RpcFailure>> + Send;
}

impl LedgerRpc for RpcClient {
    async fn fetch_latest_blockhash(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<(Hash, u64), RpcFailure> {
        Ok(self.get_latest_blockhash_with_commitment(commitment).await?)
    }

    async fn send_signed_transaction(
        &self,
        transaction: &Transaction,
        skip_preflight: bool,
        commitment: CommitmentConfig,
    ) -> Result<Signature, RpcFailure> {
        let config = RpcSendTransactionConfig {
            skip_preflight,
            preflight_commitment: Some(commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        Ok(self.send_transaction_with_config(transaction, config).await?)
    }

    async fn confirm_signature(
        &self,
        signature: &Signature,
        blockhash: &Hash,
        last_valid_block_height: u64,
        commitment: CommitmentConfig,
    ) -> Result<Option<TransactionError>, RpcFailure> {
        loop {
            let statuses = self.get_signature_statuses(&[*signature]).await?.value;
            if let Some(Some(status)) = statuses.into_iter().next() {
                if status.err.is_some() || status.satisfies_commitment(commitment) {
                    return Ok(status.err);
                }
            }

            let height = self.get_block_height_with_commitment(commitment).await?;
            if height > last_valid_block_height {
                debug!(%signature, %blockhash, height, last_valid_block_height, "blockhash expired");
                return Err(RpcFailure::block_height_exceeded(signature));
            }

            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }

    async fn minimum_balance_for_rent_exemption(&self, size: usize) -> Result<u64, RpcFailure> {
        Ok(self.get_minimum_balance_for_rent_exemption(size).await?)
    }

    async fn fetch_account_data(
        &self,
        address: &Pubkey,
        commitment: CommitmentConfig,
    ) -> Result<Option<Vec<u8>>, RpcFailure> {
        let account = self
            .get_account_with_commitment(address, commitment)
            .await?
            .value;
        Ok(account.map(|a| a.data))
    }
}
