//! In-memory collaborators for unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_option::COption;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_spl::token::spl_token;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::{Transaction, TransactionError};

use crate::client::LaunchpadClient;
use crate::config::ClientConfig;
use crate::price_feed::{PriceFeed, PriceFeedError};
use crate::registry::{ProjectRecord, ProjectRegistry, RegistryError};
use crate::rpc::{LedgerRpc, RpcFailure};
use crate::state::tests::{encode, fresh_curve};
use crate::state::BondingCurveState;
use crate::wallet::{WalletError, WalletSigner};

pub(crate) const RENT_PER_BYTE: u64 = 6_960;

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct RpcState {
    accounts: HashMap<Pubkey, Vec<u8>>,
    hidden_reads: HashMap<Pubkey, u32>,
    sent: Vec<Transaction>,
    send_failures: HashMap<usize, RpcFailure>,
    confirm_failures: VecDeque<RpcFailure>,
    execution_failures: VecDeque<TransactionError>,
    fetch_failures: VecDeque<RpcFailure>,
    confirm_delay: Duration,
    blockhash_requests: usize,
    fetches: usize,
}

/// Ledger double. Records every sent transaction and never executes them.
#[derive(Clone, Default)]
pub(crate) struct MockRpc {
    state: Arc<Mutex<RpcState>>,
}

impl MockRpc {
    fn with_state<T>(&self, f: impl FnOnce(&mut RpcState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub(crate) fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.with_state(|s| s.accounts.insert(address, data));
    }

    /// Serve `None` for the next `reads` fetches of `address`
    pub(crate) fn hide_account(&self, address: Pubkey, reads: u32) {
        self.with_state(|s| s.hidden_reads.insert(address, reads));
    }

    pub(crate) fn set_token_account(&self, address: Pubkey, mint: Pubkey, owner: Pubkey, amount: u64) {
        let account = spl_token::state::Account {
            mint,
            owner,
            amount,
            delegate: COption::None,
            state: spl_token::state::AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        let mut data = vec![0u8; spl_token::state::Account::LEN];
        spl_token::state::Account::pack(account, &mut data).unwrap();
        self.set_account(address, data);
    }

    /// Fail the `index`-th send (0-based over the mock's lifetime)
    pub(crate) fn fail_send_number(&self, index: usize, failure: RpcFailure) {
        self.with_state(|s| s.send_failures.insert(index, failure));
    }

    pub(crate) fn fail_next_send(&self, failure: RpcFailure) {
        self.with_state(|s| {
            let next = s.sent.len();
            s.send_failures.insert(next, failure)
        });
    }

    pub(crate) fn fail_next_confirm(&self, failure: RpcFailure) {
        self.with_state(|s| s.confirm_failures.push_back(failure));
    }

    /// Next confirmed transaction reports `error` as its execution result
    pub(crate) fn fail_next_execution(&self, error: TransactionError) {
        self.with_state(|s| s.execution_failures.push_back(error));
    }

    pub(crate) fn fail_next_fetch(&self, failure: RpcFailure) {
        self.with_state(|s| s.fetch_failures.push_back(failure));
    }

    pub(crate) fn set_confirm_delay(&self, delay: Duration) {
        self.with_state(|s| s.confirm_delay = delay);
    }

    pub(crate) fn sent(&self) -> Vec<Transaction> {
        self.with_state(|s| s.sent.clone())
    }

    pub(crate) fn blockhash_requests(&self) -> usize {
        self.with_state(|s| s.blockhash_requests)
    }

    pub(crate) fn fetches(&self) -> usize {
        self.with_state(|s| s.fetches)
    }
}

impl LedgerRpc for MockRpc {
    async fn fetch_latest_blockhash(
        &self,
        _commitment: CommitmentConfig,
    ) -> std::result::Result<(Hash, u64), RpcFailure> {
        self.with_state(|s| s.blockhash_requests += 1);
        Ok((Hash::new_unique(), 1_000))
    }

    async fn send_signed_transaction(
        &self,
        transaction: &Transaction,
        _skip_preflight: bool,
        _commitment: CommitmentConfig,
    ) -> std::result::Result<Signature, RpcFailure> {
        self.with_state(|s| {
            let index = s.sent.len();
            s.sent.push(transaction.clone());
            match s.send_failures.remove(&index) {
                Some(failure) => Err(failure),
                None => Ok(transaction.signatures[0]),
            }
        })
    }

    async fn confirm_signature(
        &self,
        _signature: &Signature,
        _blockhash: &Hash,
        _last_valid_block_height: u64,
        _commitment: CommitmentConfig,
    ) -> std::result::Result<Option<TransactionError>, RpcFailure> {
        let delay = self.with_state(|s| s.confirm_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.with_state(|s| {
            if let Some(failure) = s.confirm_failures.pop_front() {
                return Err(failure);
            }
            Ok(s.execution_failures.pop_front())
        })
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        size: usize,
    ) -> std::result::Result<u64, RpcFailure> {
        Ok((size as u64 + 128) * RENT_PER_BYTE)
    }

    async fn fetch_account_data(
        &self,
        address: &Pubkey,
        _commitment: CommitmentConfig,
    ) -> std::result::Result<Option<Vec<u8>>, RpcFailure> {
        self.with_state(|s| {
            s.fetches += 1;
            if let Some(failure) = s.fetch_failures.pop_front() {
                return Err(failure);
            }
            if let Some(reads) = s.hidden_reads.get_mut(address) {
                if *reads > 0 {
                    *reads -= 1;
                    return Ok(None);
                }
            }
            Ok(s.accounts.get(address).cloned())
        })
    }
}

/// Keypair wallet that can also play a disconnected wallet, and counts
/// signing requests
#[derive(Clone)]
pub(crate) struct MockWallet {
    keypair: Option<Arc<Keypair>>,
    signs: Arc<AtomicUsize>,
}

impl MockWallet {
    pub(crate) fn connected() -> Self {
        Self {
            keypair: Some(Arc::new(Keypair::new())),
            signs: Arc::default(),
        }
    }

    pub(crate) fn disconnected() -> Self {
        Self {
            keypair: None,
            signs: Arc::default(),
        }
    }

    pub(crate) fn signs(&self) -> usize {
        self.signs.load(Ordering::SeqCst)
    }
}

impl WalletSigner for MockWallet {
    fn pubkey(&self) -> Option<Pubkey> {
        self.keypair.as_ref().map(|k| k.pubkey())
    }

    async fn sign_transaction(
        &self,
        mut transaction: Transaction,
    ) -> std::result::Result<Transaction, WalletError> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        let keypair = self.keypair.as_ref().ok_or(WalletError::Disconnected)?;
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[keypair.as_ref()], blockhash)
            .map_err(|e| WalletError::Rejected(e.to_string()))?;
        Ok(transaction)
    }
}

/// `None` plays an unreachable feed
#[derive(Clone, Copy)]
pub(crate) struct MockPriceFeed(pub Option<f64>);

impl PriceFeed for MockPriceFeed {
    async fn sol_usd_price(&self) -> std::result::Result<f64, PriceFeedError> {
        self.0
            .ok_or_else(|| PriceFeedError::Request("connection refused".to_string()))
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockRegistry {
    pub fail: bool,
    pub records: Arc<Mutex<Vec<ProjectRecord>>>,
}

impl MockRegistry {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn records(&self) -> Vec<ProjectRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl ProjectRegistry for MockRegistry {
    async fn create_project_record(
        &self,
        record: &ProjectRecord,
    ) -> std::result::Result<(), RegistryError> {
        if self.fail {
            return Err(RegistryError::Rejected("503 Service Unavailable".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

pub(crate) type TestClient = LaunchpadClient<MockRpc, MockWallet, MockPriceFeed>;

pub(crate) fn test_config() -> ClientConfig {
    ClientConfig::new(Pubkey::new_from_array([7; 32]))
}

pub(crate) struct TestEnv {
    pub client: TestClient,
    pub rpc: MockRpc,
    pub wallet: MockWallet,
    pub wallet_pubkey: Pubkey,
    pub mint: Pubkey,
}

impl TestEnv {
    fn build(config: ClientConfig, wallet: MockWallet, with_curve: bool) -> Self {
        let rpc = MockRpc::default();
        let mint = Pubkey::new_unique();
        let wallet_pubkey = wallet.pubkey().unwrap_or_default();
        let client =
            LaunchpadClient::new(config, rpc.clone(), wallet.clone(), MockPriceFeed(None)).unwrap();
        let env = Self {
            client,
            rpc,
            wallet,
            wallet_pubkey,
            mint,
        };
        if with_curve {
            env.set_curve(&fresh_curve(mint, Pubkey::new_unique()));
        }
        env
    }

    pub(crate) fn with_curve() -> Self {
        Self::build(test_config(), MockWallet::connected(), true)
    }

    pub(crate) fn without_curve() -> Self {
        Self::build(test_config(), MockWallet::connected(), false)
    }

    pub(crate) fn disconnected() -> Self {
        Self::build(test_config(), MockWallet::disconnected(), true)
    }

    pub(crate) fn with_config(config: ClientConfig) -> Self {
        Self::build(config, MockWallet::connected(), true)
    }

    /// Same ledger, wallet and mint under a different configuration
    pub(crate) fn rebuild(self, config: ClientConfig) -> Self {
        let client = LaunchpadClient::new(
            config,
            self.rpc.clone(),
            self.wallet.clone(),
            MockPriceFeed(None),
        )
        .unwrap();
        Self { client, ..self }
    }

    pub(crate) fn set_curve(&self, state: &BondingCurveState) {
        let address = self.client.accounts(&self.mint).curve_state;
        self.rpc.set_account(address, encode(state));
    }
}
