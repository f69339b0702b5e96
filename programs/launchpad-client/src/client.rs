use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::{Transaction, TransactionError};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::curve;
use crate::dedup::DedupGate;
use crate::errors::*;
use crate::instructions::*;
use crate::pda::{derive_accounts, CurveAccounts};
use crate::price_feed::PriceFeed;
use crate::rpc::{LedgerRpc, RpcFailure, RpcFailureKind};
use crate::state::{BondingCurveState, CurveInfoView, PriceQuote};
use crate::wallet::{WalletError, WalletSigner};

/// Caller supplied identity of a user action, used in dedup keys.
///
/// Two calls carrying the same id for the same action and mint collapse into
/// one submission. The default is the current millisecond timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperationId(pub u64);

impl OperationId {
    pub fn now() -> Self {
        Self(now_millis())
    }

    pub(crate) fn key(&self, action: &str, mint: &Pubkey) -> String {
        format!("{}:{}:{}", action, mint, self.0)
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::now()
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuyReceipt {
    pub signature: Signature,
    pub tokens_out: u64,
    pub min_tokens_out: u64,
    /// No first buyer was recorded before this trade
    pub is_first_buy: bool,
    /// Share of `tokens_out` the program moves into the first buyer lock vault
    pub locked_tokens: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SellReceipt {
    pub signature: Signature,
    pub sol_out: u64,
    pub min_sol_out: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitializeReceipt {
    pub accounts: CurveAccounts,
    pub signature: Signature,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnlockCheck {
    pub signature: Signature,
    pub unlockable: bool,
}

struct Inner<R, W, P> {
    config: ClientConfig,
    rpc: R,
    wallet: W,
    price_feed: P,
    gate: DedupGate,
}

/// Trading client for launchpad bonding curves.
///
/// Cheap to clone; clones share the collaborators and the dedup gate.
pub struct LaunchpadClient<R, W, P> {
    inner: Arc<Inner<R, W, P>>,
}

impl<R, W, P> Clone for LaunchpadClient<R, W, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

enum FailureClass {
    AlreadyProcessed,
    BlockhashExpired,
    Other,
}

/// Structured errors first. Node messages are matched only when the node gave
/// no structured error, and that match is best-effort.
fn classify(failure: &RpcFailure) -> FailureClass {
    match &failure.transaction_error {
        Some(TransactionError::AlreadyProcessed) => return FailureClass::AlreadyProcessed,
        Some(TransactionError::BlockhashNotFound) => return FailureClass::BlockhashExpired,
        Some(_) => return FailureClass::Other,
        None => {}
    }
    if failure.kind == RpcFailureKind::BlockHeightExceeded {
        return FailureClass::BlockhashExpired;
    }

    let message = failure.message.to_ascii_lowercase();
    if message.contains("already been processed") || message.contains("alreadyprocessed") {
        FailureClass::AlreadyProcessed
    } else if message.contains("blockhash not found")
        || message.contains("block height exceeded")
        || (message.contains("blockhash") && message.contains("expired"))
    {
        FailureClass::BlockhashExpired
    } else {
        FailureClass::Other
    }
}

/// First token of `message` that parses as a transaction signature
fn signature_in_message(message: &str) -> Option<Signature> {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| (64..=88).contains(&word.len()))
        .find_map(|word| Signature::from_str(word).ok())
}

fn resolve_failure(
    failure: RpcFailure,
    stage: SubmissionStage,
    own_signature: Option<Signature>,
) -> LaunchpadResult<Signature> {
    match classify(&failure) {
        FailureClass::AlreadyProcessed => {
            let recovered = own_signature.or_else(|| signature_in_message(&failure.message));
            match recovered {
                Some(signature) => {
                    info!(%signature, "transaction already processed, treating as success");
                    Ok(signature)
                }
                None => Err(LaunchpadError::AlreadyProcessedUnverified),
            }
        }
        FailureClass::BlockhashExpired => {
            warn!(stage = %stage, error = %failure, "blockhash expired");
            Err(LaunchpadError::BlockhashExpired)
        }
        FailureClass::Other => match (failure.transaction_error, own_signature) {
            // Preflight simulation rejected the transaction
            (Some(error), Some(signature)) => Err(LaunchpadError::failed(signature, error)),
            _ => Err(LaunchpadError::submission(stage, failure.message)),
        },
    }
}

fn require_amount(amount: u64) -> LaunchpadResult<()> {
    if amount == 0 {
        return Err(InputError::NonPositiveAmount.into());
    }
    Ok(())
}

impl<R, W, P> LaunchpadClient<R, W, P>
where
    R: LedgerRpc,
    W: WalletSigner,
    P: PriceFeed,
{
    pub fn new(config: ClientConfig, rpc: R, wallet: W, price_feed: P) -> LaunchpadResult<Self> {
        Self::with_gate(config, rpc, wallet, price_feed, DedupGate::new())
    }

    /// Build a client that shares `gate` with other components
    pub fn with_gate(
        config: ClientConfig,
        rpc: R,
        wallet: W,
        price_feed: P,
        gate: DedupGate,
    ) -> LaunchpadResult<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                rpc,
                wallet,
                price_feed,
                gate,
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn rpc(&self) -> &R {
        &self.inner.rpc
    }

    pub fn wallet(&self) -> &W {
        &self.inner.wallet
    }

    pub fn gate(&self) -> &DedupGate {
        &self.inner.gate
    }

    pub fn accounts(&self, mint: &Pubkey) -> CurveAccounts {
        derive_accounts(&self.inner.config.program_id, mint)
    }

    pub(crate) fn wallet_pubkey(&self) -> LaunchpadResult<Pubkey> {
        self.inner
            .wallet
            .pubkey()
            .ok_or_else(|| InputError::WalletNotConnected.into())
    }

    /// Caller's slippage, or the configured default when `None`
    fn slippage(&self, slippage_bps: Option<u16>) -> LaunchpadResult<u16> {
        let slippage_bps = slippage_bps.unwrap_or(self.inner.config.default_slippage_bps);
        curve::min_out(0, slippage_bps)?;
        Ok(slippage_bps)
    }

    /// Fetch and decode the curve of `mint`. Never cached.
    pub async fn fetch_curve_state(
        &self,
        mint: &Pubkey,
    ) -> LaunchpadResult<(CurveAccounts, BondingCurveState)> {
        let accounts = self.accounts(mint);
        let data = self
            .inner
            .rpc
            .fetch_account_data(&accounts.curve_state, self.inner.config.commitment_config())
            .await
            .map_err(|e| LaunchpadError::submission(SubmissionStage::Fetch, e.message))?
            .ok_or(LaunchpadError::AccountNotFound(accounts.curve_state))?;

        let state = BondingCurveState::try_deserialize(&mut data.as_slice()).map_err(|e| {
            LaunchpadError::AccountDecode {
                address: accounts.curve_state,
                message: e.to_string(),
            }
        })?;
        state.check_invariants()?;
        Ok((accounts, state))
    }

    /// Assemble, sign and submit `instructions` as one transaction.
    ///
    /// A fresh blockhash is fetched for every call. `extra_signers` partially
    /// sign before the wallet, which signs exactly once.
    pub async fn submit(
        &self,
        instructions: Vec<Instruction>,
        extra_signers: &[&Keypair],
    ) -> LaunchpadResult<Signature> {
        let payer = self.wallet_pubkey()?;
        let config = &self.inner.config;
        let commitment = config.commitment_config();

        let (blockhash, last_valid_block_height) = self
            .inner
            .rpc
            .fetch_latest_blockhash(commitment)
            .await
            .map_err(|e| LaunchpadError::submission(SubmissionStage::Blockhash, e.message))?;

        let message = Message::new_with_blockhash(&instructions, Some(&payer), &blockhash);
        let mut transaction = Transaction::new_unsigned(message);
        if !extra_signers.is_empty() {
            transaction
                .try_partial_sign(extra_signers, blockhash)
                .map_err(|e| LaunchpadError::submission(SubmissionStage::Signing, e.to_string()))?;
        }

        let signed = self
            .inner
            .wallet
            .sign_transaction(transaction)
            .await
            .map_err(|e| match e {
                WalletError::Disconnected => LaunchpadError::from(InputError::WalletNotConnected),
                WalletError::Rejected(reason) => {
                    LaunchpadError::submission(SubmissionStage::Signing, reason)
                }
            })?;

        let own_signature = signed
            .signatures
            .first()
            .copied()
            .filter(|s| *s != Signature::default());

        let signature = match self
            .inner
            .rpc
            .send_signed_transaction(&signed, config.skip_preflight, commitment)
            .await
        {
            Ok(signature) => signature,
            Err(failure) => {
                return resolve_failure(failure, SubmissionStage::Send, own_signature);
            }
        };
        debug!(%signature, instructions = instructions.len(), "transaction sent");

        match self
            .inner
            .rpc
            .confirm_signature(&signature, &blockhash, last_valid_block_height, commitment)
            .await
        {
            Ok(None) => Ok(signature),
            Ok(Some(TransactionError::AlreadyProcessed)) => Ok(signature),
            Ok(Some(error)) => {
                let failed = LaunchpadError::failed(signature, error);
                warn!(%signature, error = %failed, "transaction failed");
                Err(failed)
            }
            Err(failure) => resolve_failure(failure, SubmissionStage::Confirm, Some(signature)),
        }
    }

    /// Buy tokens of `mint` for `sol_amount` lamports. `None` slippage uses
    /// `ClientConfig::default_slippage_bps`.
    pub async fn buy(
        &self,
        op: OperationId,
        mint: Pubkey,
        sol_amount: u64,
        slippage_bps: Option<u16>,
    ) -> LaunchpadResult<BuyReceipt> {
        require_amount(sol_amount)?;
        let slippage_bps = self.slippage(slippage_bps)?;
        self.wallet_pubkey()?;

        let client = self.clone();
        self.inner
            .gate
            .run_exclusive(op.key("buy", &mint), move || async move {
                client.execute_buy(mint, sol_amount, slippage_bps).await
            })
            .await
    }

    async fn execute_buy(
        &self,
        mint: Pubkey,
        sol_amount: u64,
        slippage_bps: u16,
    ) -> LaunchpadResult<BuyReceipt> {
        let buyer = self.wallet_pubkey()?;
        let (accounts, state) = self.fetch_curve_state(&mint).await?;

        let tokens_out = curve::tokens_out(
            sol_amount,
            state.total_sol_reserves()?,
            state.total_token_reserves()?,
        )?;
        if tokens_out == 0 {
            return Err(CurveError::ZeroOutput.into());
        }
        let min_tokens_out = curve::min_out(tokens_out, slippage_bps)?;
        let is_first_buy = state.first_buyer().is_none();
        let locked_tokens = if is_first_buy {
            curve::first_buyer_locked(tokens_out)
        } else {
            0
        };

        let ixs = buy_instructions(
            &self.inner.config.program_id,
            &BuyAccounts::new(accounts, mint, buyer),
            &Buy {
                sol_amount,
                min_tokens_out,
            },
        );
        let signature = self.submit(ixs, &[]).await?;

        info!(%mint, %signature, sol_amount, tokens_out, is_first_buy, "buy confirmed");
        Ok(BuyReceipt {
            signature,
            tokens_out,
            min_tokens_out,
            is_first_buy,
            locked_tokens,
        })
    }

    /// Sell `token_amount` base units of `mint`
    pub async fn sell(
        &self,
        op: OperationId,
        mint: Pubkey,
        token_amount: u64,
        slippage_bps: Option<u16>,
    ) -> LaunchpadResult<SellReceipt> {
        require_amount(token_amount)?;
        let slippage_bps = self.slippage(slippage_bps)?;
        self.wallet_pubkey()?;

        let client = self.clone();
        self.inner
            .gate
            .run_exclusive(op.key("sell", &mint), move || async move {
                client.execute_sell(mint, token_amount, slippage_bps).await
            })
            .await
    }

    async fn execute_sell(
        &self,
        mint: Pubkey,
        token_amount: u64,
        slippage_bps: u16,
    ) -> LaunchpadResult<SellReceipt> {
        let seller = self.wallet_pubkey()?;
        let (accounts, state) = self.fetch_curve_state(&mint).await?;

        let total_sol = state.total_sol_reserves()?;
        let total_token = state.total_token_reserves()?;
        if total_sol == 0 || total_token == 0 {
            return Err(CurveError::EmptyReserves.into());
        }

        let sol_out = curve::sol_out(token_amount, total_token, total_sol)?;
        if sol_out == 0 {
            return Err(CurveError::ZeroOutput.into());
        }
        let min_sol_out = curve::min_out(sol_out, slippage_bps)?;

        let ix = sell(
            &self.inner.config.program_id,
            &SellAccounts::new(accounts, mint, seller),
            &Sell {
                token_amount,
                min_sol_out,
            },
        );
        let signature = self.submit(vec![ix], &[]).await?;

        info!(%mint, %signature, token_amount, sol_out, "sell confirmed");
        Ok(SellReceipt {
            signature,
            sol_out,
            min_sol_out,
        })
    }

    /// Create the curve for `mint`, move the whole supply from
    /// `creator_token_account` into the vault and revoke minting, atomically.
    pub async fn initialize_bonding_curve(
        &self,
        op: OperationId,
        mint: Pubkey,
        creator_token_account: Pubkey,
    ) -> LaunchpadResult<InitializeReceipt> {
        self.wallet_pubkey()?;

        let client = self.clone();
        self.inner
            .gate
            .run_exclusive(op.key("initialize", &mint), move || async move {
                client
                    .execute_initialize(mint, creator_token_account)
                    .await
            })
            .await
    }

    pub(crate) async fn execute_initialize(
        &self,
        mint: Pubkey,
        creator_token_account: Pubkey,
    ) -> LaunchpadResult<InitializeReceipt> {
        let creator = self.wallet_pubkey()?;
        let accounts = self.accounts(&mint);
        let ixs = launch_instructions(
            &self.inner.config.program_id,
            &InitializeBondingCurveAccounts {
                curve: accounts,
                token_mint: mint,
                creator_token_account,
                creator,
            },
            &InitializeBondingCurve::default(),
        )?;
        let signature = self.submit(ixs, &[]).await?;

        info!(%mint, %signature, curve_state = %accounts.curve_state, "bonding curve initialized");
        Ok(InitializeReceipt {
            accounts,
            signature,
        })
    }

    /// Push holder and volume counters. Oracle authority only.
    pub async fn batch_update_data(
        &self,
        op: OperationId,
        mint: Pubkey,
        holder_count: u64,
        volume_cents_to_add: u64,
    ) -> LaunchpadResult<Signature> {
        let authority = self.wallet_pubkey()?;
        if let Some(oracle) = self.inner.config.oracle_authority {
            if oracle != authority {
                return Err(InputError::Unauthorized(authority).into());
            }
        }

        let client = self.clone();
        self.inner
            .gate
            .run_exclusive(op.key("batch_update", &mint), move || async move {
                client
                    .execute_batch_update(mint, authority, holder_count, volume_cents_to_add)
                    .await
            })
            .await
    }

    async fn execute_batch_update(
        &self,
        mint: Pubkey,
        authority: Pubkey,
        holder_count: u64,
        volume_cents_to_add: u64,
    ) -> LaunchpadResult<Signature> {
        let ix = batch_update_data(
            &self.inner.config.program_id,
            &CurveAuthorityAccounts {
                curve_state: self.accounts(&mint).curve_state,
                authority,
            },
            &BatchUpdateData {
                holder_count,
                volume_cents_to_add,
            },
        );
        let signature = self.submit(vec![ix], &[]).await?;
        info!(%mint, %signature, holder_count, volume_cents_to_add, "oracle data pushed");
        Ok(signature)
    }

    /// Ask the program to re-evaluate the unlock thresholds, then read back
    /// the resulting flag
    pub async fn check_unlock_conditions(
        &self,
        op: OperationId,
        mint: Pubkey,
    ) -> LaunchpadResult<UnlockCheck> {
        let authority = self.wallet_pubkey()?;

        let client = self.clone();
        self.inner
            .gate
            .run_exclusive(op.key("check_unlock", &mint), move || async move {
                client.execute_check_unlock(mint, authority).await
            })
            .await
    }

    async fn execute_check_unlock(
        &self,
        mint: Pubkey,
        authority: Pubkey,
    ) -> LaunchpadResult<UnlockCheck> {
        let ix = check_unlock_conditions(
            &self.inner.config.program_id,
            &CurveAuthorityAccounts {
                curve_state: self.accounts(&mint).curve_state,
                authority,
            },
        );
        let signature = self.submit(vec![ix], &[]).await?;
        let (_, state) = self.fetch_curve_state(&mint).await?;
        debug!(%mint, %signature, unlockable = state.unlockable, "unlock conditions checked");
        Ok(UnlockCheck {
            signature,
            unlockable: state.unlockable,
        })
    }

    /// Release the first buyer's locked tokens. Fails on-chain with
    /// `UnlockConditionsNotMet` or `NotFirstBuyer` as applicable.
    pub async fn unlock_first_buyer_tokens(
        &self,
        op: OperationId,
        mint: Pubkey,
    ) -> LaunchpadResult<Signature> {
        let first_buyer = self.wallet_pubkey()?;

        let client = self.clone();
        self.inner
            .gate
            .run_exclusive(op.key("unlock", &mint), move || async move {
                client.execute_unlock(mint, first_buyer).await
            })
            .await
    }

    async fn execute_unlock(&self, mint: Pubkey, first_buyer: Pubkey) -> LaunchpadResult<Signature> {
        let ix = unlock_first_buyer_tokens(
            &self.inner.config.program_id,
            &UnlockAccounts::new(self.accounts(&mint), mint, first_buyer),
        );
        let signature = self.submit(vec![ix], &[]).await?;
        info!(%mint, %signature, "first buyer tokens unlocked");
        Ok(signature)
    }

    /// SOL/USD from the price feed, or the configured fallback
    pub async fn sol_usd_price(&self) -> f64 {
        match self.inner.price_feed.sol_usd_price().await {
            Ok(price) => price,
            Err(e) => {
                let fallback = self.inner.config.fallback_sol_usd_price;
                warn!(error = %e, fallback, "price feed unavailable, using fallback price");
                fallback
            }
        }
    }

    pub async fn get_bonding_curve_info(&self, mint: Pubkey) -> LaunchpadResult<CurveInfoView> {
        let (_, state) = self.fetch_curve_state(&mint).await?;
        let price = self.sol_usd_price().await;
        Ok(CurveInfoView::from_state(&state, price)?)
    }

    /// Quote a trade without submitting anything. `amount` is lamports for a
    /// buy and token base units for a sell.
    pub async fn get_price_quote(
        &self,
        mint: Pubkey,
        amount: u64,
        is_buy: bool,
        slippage_bps: Option<u16>,
    ) -> LaunchpadResult<PriceQuote> {
        require_amount(amount)?;
        let slippage_bps = self.slippage(slippage_bps)?;
        let (_, state) = self.fetch_curve_state(&mint).await?;
        let total_sol = state.total_sol_reserves()?;
        let total_token = state.total_token_reserves()?;

        let (output, impact, price_per_token) = if is_buy {
            let out = curve::tokens_out(amount, total_sol, total_token)?;
            let impact = curve::price_impact_percent(amount, total_sol, total_token, true)?;
            (out, impact, curve::price_per_token(amount, out))
        } else {
            let out = curve::sol_out(amount, total_token, total_sol)?;
            let impact = curve::price_impact_percent(amount, total_token, total_sol, false)?;
            (out, impact, curve::price_per_token(out, amount))
        };

        Ok(PriceQuote {
            input: amount,
            output,
            min_output: curve::min_out(output, slippage_bps)?,
            price_per_token,
            price_impact_percent: impact,
        })
    }
}
