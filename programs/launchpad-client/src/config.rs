use std::str::FromStr;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use serde::{Deserialize, Deserializer};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};

use crate::constants::*;
use crate::errors::{LaunchpadError, LaunchpadResult};

/// How the creation workflow waits for the minted supply to become visible
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleStrategy {
    /// Sleep for a fixed duration
    FixedDelay(Duration),
    /// Poll the creator's token balance until it holds the minted supply
    PollBalance {
        interval: Duration,
        max_attempts: u32,
    },
}

/// Client configuration.
///
/// `program_id` has no default: the launchpad program address always comes
/// from the host application.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(deserialize_with = "pubkey_from_str")]
    pub program_id: Pubkey,
    /// Wallet allowed to push holder/volume data
    #[serde(default, deserialize_with = "optional_pubkey_from_str")]
    pub oracle_authority: Option<Pubkey>,
    #[serde(default = "default_commitment")]
    pub commitment: CommitmentLevel,
    /// Slippage for trades and quotes that pass `None`
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u16,
    #[serde(default)]
    pub skip_preflight: bool,
    #[serde(default = "default_fallback_sol_usd_price")]
    pub fallback_sol_usd_price: f64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// When set, poll the minted balance at this interval instead of sleeping
    #[serde(default)]
    pub settle_poll_interval_ms: Option<u64>,
    #[serde(default = "default_settle_poll_attempts")]
    pub settle_poll_attempts: u32,
}

fn default_commitment() -> CommitmentLevel {
    CommitmentLevel::Confirmed
}

fn default_slippage_bps() -> u16 {
    DEFAULT_SLIPPAGE_BPS
}

fn default_fallback_sol_usd_price() -> f64 {
    FALLBACK_SOL_USD_PRICE
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_settle_poll_attempts() -> u32 {
    10
}

fn pubkey_from_str<'de, D: Deserializer<'de>>(d: D) -> Result<Pubkey, D::Error> {
    let s = String::deserialize(d)?;
    Pubkey::from_str(&s).map_err(serde::de::Error::custom)
}

fn optional_pubkey_from_str<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Pubkey>, D::Error> {
    Option::<String>::deserialize(d)?
        .map(|s| Pubkey::from_str(&s).map_err(serde::de::Error::custom))
        .transpose()
}

impl ClientConfig {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            oracle_authority: None,
            commitment: default_commitment(),
            default_slippage_bps: DEFAULT_SLIPPAGE_BPS,
            skip_preflight: false,
            fallback_sol_usd_price: FALLBACK_SOL_USD_PRICE,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            settle_poll_interval_ms: None,
            settle_poll_attempts: default_settle_poll_attempts(),
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> LaunchpadResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LaunchpadError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LaunchpadResult<()> {
        if self.default_slippage_bps as u64 > BPS_DENOMINATOR {
            return Err(LaunchpadError::Config(format!(
                "default_slippage_bps {} exceeds {}",
                self.default_slippage_bps, BPS_DENOMINATOR
            )));
        }
        if !self.fallback_sol_usd_price.is_finite() || self.fallback_sol_usd_price <= 0.0 {
            return Err(LaunchpadError::Config(
                "fallback_sol_usd_price must be a positive number".to_string(),
            ));
        }
        if self.settle_poll_interval_ms.is_some() && self.settle_poll_attempts == 0 {
            return Err(LaunchpadError::Config(
                "settle_poll_attempts must be at least 1 when polling".to_string(),
            ));
        }
        Ok(())
    }

    pub fn commitment_config(&self) -> CommitmentConfig {
        CommitmentConfig {
            commitment: self.commitment,
        }
    }

    pub fn settle_strategy(&self) -> SettleStrategy {
        match self.settle_poll_interval_ms {
            Some(interval) => SettleStrategy::PollBalance {
                interval: Duration::from_millis(interval),
                max_attempts: self.settle_poll_attempts,
            },
            None => SettleStrategy::FixedDelay(Duration::from_millis(self.settle_delay_ms)),
        }
    }
}
