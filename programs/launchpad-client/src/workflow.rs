use std::sync::Arc;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_pack::Pack;
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::token::spl_token;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::{now_millis, LaunchpadClient};
use crate::config::SettleStrategy;
use crate::constants::TOTAL_SUPPLY;
use crate::errors::{LaunchpadError, LaunchpadResult, SubmissionStage};
use crate::instructions::{create_mint_and_metadata, mint_supply_to_creator, TokenMetadata};
use crate::pda::CurveAccounts;
use crate::price_feed::PriceFeed;
use crate::registry::{ProjectRecord, ProjectRegistry};
use crate::rpc::LedgerRpc;
use crate::wallet::WalletSigner;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreationStep {
    CreateMintAndMetadata,
    MintSupplyToCreator,
    /// Curve creation, supply transfer and mint revocation in one transaction
    InitializeCurve,
}

impl CreationStep {
    pub const ALL: [CreationStep; 3] = [
        CreationStep::CreateMintAndMetadata,
        CreationStep::MintSupplyToCreator,
        CreationStep::InitializeCurve,
    ];

    fn index(self) -> usize {
        match self {
            CreationStep::CreateMintAndMetadata => 0,
            CreationStep::MintSupplyToCreator => 1,
            CreationStep::InitializeCurve => 2,
        }
    }

    /// 1-based step number
    pub fn number(self) -> usize {
        self.index() + 1
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepStatus {
    #[default]
    Pending,
    Loading,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepFailure {
    pub step: CreationStep,
    pub error: LaunchpadError,
}

impl StepFailure {
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Observable progress of a creation workflow
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CreationState {
    pub steps: [StepStatus; 3],
    pub last_error: Option<StepFailure>,
}

impl CreationState {
    pub fn status(&self, step: CreationStep) -> StepStatus {
        self.steps[step.index()]
    }

    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| *s == StepStatus::Success)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreationRequest {
    pub metadata: TokenMetadata,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreationOutcome {
    pub mint: Pubkey,
    pub accounts: CurveAccounts,
    /// One signature per step, in step order
    pub signatures: [Signature; 3],
    /// Set when the token is live on-chain but the registry record failed
    pub soft_warning: Option<String>,
}

/// Three-phase token launch: mint with metadata, supply to the creator, then
/// the bonding curve. Each phase starts only after the previous one
/// succeeded; a failed phase halts the workflow until `retry` or `abort`.
///
/// The mint keypair is generated once and kept across retries, so a retried
/// phase targets the same mint. Only `abort` discards it.
pub struct CreationWorkflow<R, W, P, G> {
    client: LaunchpadClient<R, W, P>,
    registry: G,
    request: CreationRequest,
    mint: Arc<Keypair>,
    started_ms: u64,
    settle: SettleStrategy,
    signatures: [Option<Signature>; 3],
    outcome: Option<CreationOutcome>,
    state: watch::Sender<CreationState>,
}

impl<R, W, P, G> CreationWorkflow<R, W, P, G>
where
    R: LedgerRpc,
    W: WalletSigner,
    P: PriceFeed,
    G: ProjectRegistry,
{
    pub fn new(client: LaunchpadClient<R, W, P>, registry: G, request: CreationRequest) -> Self {
        let settle = client.config().settle_strategy();
        let (state, _) = watch::channel(CreationState::default());
        Self {
            client,
            registry,
            request,
            mint: Arc::new(Keypair::new()),
            started_ms: now_millis(),
            settle,
            signatures: [None; 3],
            outcome: None,
            state,
        }
    }

    pub fn with_settle_strategy(mut self, settle: SettleStrategy) -> Self {
        self.settle = settle;
        self
    }

    pub fn mint(&self) -> Pubkey {
        self.mint.pubkey()
    }

    pub fn state(&self) -> CreationState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every status transition
    pub fn subscribe(&self) -> watch::Receiver<CreationState> {
        self.state.subscribe()
    }

    /// Run every phase that has not succeeded yet, in order. Once the launch
    /// completed, returns the same outcome without touching the ledger or the
    /// registry again.
    pub async fn run(&mut self) -> LaunchpadResult<CreationOutcome> {
        if let Some(outcome) = &self.outcome {
            debug!(mint = %outcome.mint, "creation already complete");
            return Ok(outcome.clone());
        }
        let mint = self.mint();
        info!(%mint, "starting token creation");

        for step in CreationStep::ALL {
            if self.state.borrow().status(step) == StepStatus::Success {
                continue;
            }
            if step == CreationStep::InitializeCurve {
                if let Err(e) = self.settle().await {
                    warn!(%mint, error = %e, "settling minted supply failed");
                    self.set_status(step, StepStatus::Error, Some(e.clone()));
                    return Err(e);
                }
            }
            self.execute(step).await?;
        }

        let outcome = self.finish().await?;
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Re-run the failed phase, then continue with the rest
    pub async fn retry(&mut self) -> LaunchpadResult<CreationOutcome> {
        let failed = self
            .state
            .borrow()
            .last_error
            .as_ref()
            .map(|f| f.step.number());
        if let Some(step) = failed {
            info!(mint = %self.mint(), step, "retrying failed step");
        }
        self.run().await
    }

    /// Forget all progress and start over with a new mint. A mint created by
    /// an earlier attempt is abandoned.
    pub fn abort(&mut self) {
        warn!(mint = %self.mint(), "creation aborted");
        self.mint = Arc::new(Keypair::new());
        self.started_ms = now_millis();
        self.signatures = [None; 3];
        self.outcome = None;
        self.state.send_replace(CreationState::default());
    }

    fn step_key(&self, step: CreationStep) -> String {
        format!(
            "create:{}:step{}:{}",
            self.mint(),
            step.number(),
            self.started_ms
        )
    }

    fn set_status(&self, step: CreationStep, status: StepStatus, error: Option<LaunchpadError>) {
        self.state.send_modify(|state| {
            state.steps[step.index()] = status;
            state.last_error = error.map(|error| StepFailure { step, error });
        });
    }

    async fn execute(&mut self, step: CreationStep) -> LaunchpadResult<()> {
        self.set_status(step, StepStatus::Loading, None);
        debug!(mint = %self.mint(), step = step.number(), "step started");

        let client = self.client.clone();
        let mint = Arc::clone(&self.mint);
        let metadata = self.request.metadata.clone();
        let result = self
            .client
            .gate()
            .run_exclusive(self.step_key(step), move || async move {
                run_step(client, mint, metadata, step).await
            })
            .await;

        match result {
            Ok(signature) => {
                self.signatures[step.index()] = Some(signature);
                self.set_status(step, StepStatus::Success, None);
                info!(mint = %self.mint(), step = step.number(), %signature, "step succeeded");
                Ok(())
            }
            Err(e) => {
                warn!(mint = %self.mint(), step = step.number(), error = %e, "step failed");
                self.set_status(step, StepStatus::Error, Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Wait for the minted supply to become visible before the curve reads it
    async fn settle(&self) -> LaunchpadResult<()> {
        match self.settle {
            SettleStrategy::FixedDelay(delay) => {
                debug!(?delay, "waiting for minted supply to settle");
                tokio::time::sleep(delay).await;
            }
            SettleStrategy::PollBalance {
                interval,
                max_attempts,
            } => {
                let creator = self.client.wallet_pubkey()?;
                let ata = get_associated_token_address(&creator, &self.mint());
                let commitment = self.client.config().commitment_config();
                for attempt in 1..=max_attempts {
                    let data = self
                        .client
                        .rpc()
                        .fetch_account_data(&ata, commitment)
                        .await
                        .map_err(|e| LaunchpadError::submission(SubmissionStage::Fetch, e.message))?;
                    let amount = data
                        .and_then(|d| spl_token::state::Account::unpack(&d).ok())
                        .map(|account| account.amount)
                        .unwrap_or(0);
                    if amount >= TOTAL_SUPPLY {
                        debug!(attempt, "minted supply visible");
                        return Ok(());
                    }
                    tokio::time::sleep(interval).await;
                }
                warn!(%ata, max_attempts, "minted supply still not visible, continuing");
            }
        }
        Ok(())
    }

    async fn finish(&self) -> LaunchpadResult<CreationOutcome> {
        let mint = self.mint();
        let accounts = self.client.accounts(&mint);
        let [Some(create), Some(supply), Some(initialize)] = self.signatures else {
            return Err(LaunchpadError::Workflow(
                "finished without all step signatures".to_string(),
            ));
        };
        let creator = self.client.wallet_pubkey()?;

        let record = ProjectRecord {
            token_mint: mint.to_string(),
            creator: creator.to_string(),
            name: self.request.metadata.name.clone(),
            symbol: self.request.metadata.symbol.clone(),
            metadata_uri: self.request.metadata.uri.clone(),
            description: self.request.description.clone(),
            curve_state: accounts.curve_state.to_string(),
            token_vault: accounts.token_vault.to_string(),
            create_signature: create.to_string(),
            mint_signature: supply.to_string(),
            initialize_signature: initialize.to_string(),
        };

        let soft_warning = match self.registry.create_project_record(&record).await {
            Ok(()) => None,
            Err(e) => {
                warn!(%mint, error = %e, "token created but metadata save failed");
                Some(format!("token created but metadata save failed: {}", e))
            }
        };

        info!(%mint, curve_state = %accounts.curve_state, "token launched");
        Ok(CreationOutcome {
            mint,
            accounts,
            signatures: [create, supply, initialize],
            soft_warning,
        })
    }
}

async fn run_step<R, W, P>(
    client: LaunchpadClient<R, W, P>,
    mint: Arc<Keypair>,
    metadata: TokenMetadata,
    step: CreationStep,
) -> LaunchpadResult<Signature>
where
    R: LedgerRpc,
    W: WalletSigner,
    P: PriceFeed,
{
    let creator = client.wallet_pubkey()?;
    let mint_pubkey = mint.pubkey();

    match step {
        CreationStep::CreateMintAndMetadata => {
            let rent = client
                .rpc()
                .minimum_balance_for_rent_exemption(spl_token::state::Mint::LEN)
                .await
                .map_err(|e| LaunchpadError::submission(SubmissionStage::Fetch, e.message))?;
            let ixs = create_mint_and_metadata(&creator, &mint_pubkey, rent, &metadata)?;
            client.submit(ixs, &[mint.as_ref()]).await
        }
        CreationStep::MintSupplyToCreator => {
            let ixs = mint_supply_to_creator(&creator, &mint_pubkey, TOTAL_SUPPLY)?;
            client.submit(ixs, &[]).await
        }
        CreationStep::InitializeCurve => {
            let creator_token_account = get_associated_token_address(&creator, &mint_pubkey);
            client
                .execute_initialize(mint_pubkey, creator_token_account)
                .await
                .map(|receipt| receipt.signature)
        }
    }
}
