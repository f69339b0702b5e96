use std::future::Future;

use anchor_lang::prelude::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet not connected")]
    Disconnected,

    #[error("signing rejected: {0}")]
    Rejected(String),
}

/// The user's wallet. Signs each submission exactly once.
pub trait WalletSigner: Send + Sync + 'static {
    /// `None` while disconnected
    fn pubkey(&self) -> Option<Pubkey>;

    fn sign_transaction(
        &self,
        transaction: Transaction,
    ) -> impl Future<Output = Result<Transaction, WalletError>> + Send;
}

/// Local keypair wallet for scripts, bots and tests
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    async fn sign_transaction(
        &self,
        mut transaction: Transaction,
    ) -> Result<Transaction, WalletError> {
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletError::Rejected(e.to_string()))?;
        Ok(transaction)
    }
}
