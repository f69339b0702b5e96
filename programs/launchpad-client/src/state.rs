use anchor_lang::prelude::*;
use anchor_lang::Discriminator;
use serde::Serialize;

use crate::curve::{price_per_token, to_display};
use crate::errors::CurveError;

/// Bonding curve account owned by the launchpad program.
///
/// Read from the ledger, never mutated by the client. The virtual reserves are
/// fixed at initialization; every swap is priced against virtual + real reserves.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct BondingCurveState {
    /// Token mint address
    pub token_mint: Pubkey,
    /// Creator of the token
    pub creator: Pubkey,
    /// Virtual SOL reserve seeding the price curve
    pub virtual_sol_reserves: u64,
    /// Virtual token reserve seeding the price curve
    pub virtual_token_reserves: u64,
    /// Real SOL accumulated from buys
    pub real_sol_reserves: u64,
    /// Real tokens held by the curve
    pub real_token_reserves: u64,
    pub total_supply: u64,
    /// Real SOL level at which the curve migrates
    pub migration_threshold: u64,
    pub is_migrated: bool,
    /// First buyer, all zeroes until the first buy lands
    pub first_buyer: Pubkey,
    pub first_buyer_locked_amount: u64,
    pub first_buyer_lock_active: bool,
    pub holder_threshold: u64,
    pub volume_threshold_cents: u64,
    pub current_holder_count: u64,
    pub total_volume_usd_cents: u64,
    /// Holder and volume thresholds both met
    pub unlockable: bool,
    /// Bump seed for this bonding curve PDA
    pub bump: u8,
}

impl Discriminator for BondingCurveState {
    // sha256("account:BondingCurve")[..8]
    const DISCRIMINATOR: [u8; 8] = [23, 183, 248, 55, 96, 216, 172, 96];
}

impl AccountDeserialize for BondingCurveState {
    fn try_deserialize(buf: &mut &[u8]) -> Result<Self> {
        if buf.len() < Self::DISCRIMINATOR.len() {
            return Err(ErrorCode::AccountDiscriminatorNotFound.into());
        }
        if buf[..8] != Self::DISCRIMINATOR {
            return Err(ErrorCode::AccountDiscriminatorMismatch.into());
        }
        Self::try_deserialize_unchecked(buf)
    }

    fn try_deserialize_unchecked(buf: &mut &[u8]) -> Result<Self> {
        if buf.len() < Self::DISCRIMINATOR.len() {
            return Err(ErrorCode::AccountDiscriminatorNotFound.into());
        }
        let mut data: &[u8] = &buf[8..];
        AnchorDeserialize::deserialize(&mut data)
            .map_err(|_| ErrorCode::AccountDidNotDeserialize.into())
    }
}

impl BondingCurveState {
    /// Effective SOL reserve used in every swap computation
    pub fn total_sol_reserves(&self) -> std::result::Result<u64, CurveError> {
        self.virtual_sol_reserves
            .checked_add(self.real_sol_reserves)
            .ok_or(CurveError::MathOverflow)
    }

    /// Effective token reserve used in every swap computation
    pub fn total_token_reserves(&self) -> std::result::Result<u64, CurveError> {
        self.virtual_token_reserves
            .checked_add(self.real_token_reserves)
            .ok_or(CurveError::MathOverflow)
    }

    /// None until the first buy
    pub fn first_buyer(&self) -> Option<Pubkey> {
        if self.first_buyer == Pubkey::default() {
            None
        } else {
            Some(self.first_buyer)
        }
    }

    /// Reject account data that breaks `real_token_reserves <= total_supply`
    pub fn check_invariants(&self) -> std::result::Result<(), CurveError> {
        if self.real_token_reserves > self.total_supply {
            return Err(CurveError::ReserveInconsistency);
        }
        Ok(())
    }

    /// Migration progress in percent, capped at 100
    pub fn migration_progress_percent(&self) -> f64 {
        if self.is_migrated {
            return 100.0;
        }
        if self.migration_threshold == 0 {
            return 0.0;
        }
        let progress = self.real_sol_reserves as f64 / self.migration_threshold as f64 * 100.0;
        progress.min(100.0)
    }
}

/// Display projection of a bonding curve
#[derive(Clone, Debug, PartialEq)]
pub struct CurveInfoView {
    pub token_mint: Pubkey,
    pub creator: Pubkey,
    pub virtual_sol_reserves: f64,
    pub virtual_token_reserves: f64,
    pub real_sol_reserves: f64,
    pub real_token_reserves: f64,
    pub total_supply: f64,
    pub price_per_token_sol: f64,
    pub price_per_token_usd: f64,
    pub market_cap_usd: f64,
    pub sol_usd_price: f64,
    pub migration_threshold_sol: f64,
    pub migration_progress_percent: f64,
    pub is_migrated: bool,
    pub first_buyer: Option<Pubkey>,
    pub first_buyer_locked_amount: f64,
    pub first_buyer_lock_active: bool,
    pub current_holder_count: u64,
    pub holder_threshold: u64,
    pub total_volume_usd: f64,
    pub volume_threshold_usd: f64,
    pub unlockable: bool,
}

impl CurveInfoView {
    pub fn from_state(
        state: &BondingCurveState,
        sol_usd_price: f64,
    ) -> std::result::Result<Self, CurveError> {
        let total_sol = state.total_sol_reserves()?;
        let total_token = state.total_token_reserves()?;
        let price_per_token_sol = price_per_token(total_sol, total_token);
        let price_per_token_usd = price_per_token_sol * sol_usd_price;

        Ok(Self {
            token_mint: state.token_mint,
            creator: state.creator,
            virtual_sol_reserves: to_display(state.virtual_sol_reserves),
            virtual_token_reserves: to_display(state.virtual_token_reserves),
            real_sol_reserves: to_display(state.real_sol_reserves),
            real_token_reserves: to_display(state.real_token_reserves),
            total_supply: to_display(state.total_supply),
            price_per_token_sol,
            price_per_token_usd,
            market_cap_usd: price_per_token_usd * to_display(state.total_supply),
            sol_usd_price,
            migration_threshold_sol: to_display(state.migration_threshold),
            migration_progress_percent: state.migration_progress_percent(),
            is_migrated: state.is_migrated,
            first_buyer: state.first_buyer(),
            first_buyer_locked_amount: to_display(state.first_buyer_locked_amount),
            first_buyer_lock_active: state.first_buyer_lock_active,
            current_holder_count: state.current_holder_count,
            holder_threshold: state.holder_threshold,
            total_volume_usd: state.total_volume_usd_cents as f64 / 100.0,
            volume_threshold_usd: state.volume_threshold_cents as f64 / 100.0,
            unlockable: state.unlockable,
        })
    }
}

/// Quote for a prospective trade. Amounts are in base units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PriceQuote {
    pub input: u64,
    pub output: u64,
    /// Output after the caller's slippage bound
    pub min_output: u64,
    /// SOL per whole token at the trade's effective price
    pub price_per_token: f64,
    pub price_impact_percent: f64,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::constants::*;

    pub(crate) fn fresh_curve(mint: Pubkey, creator: Pubkey) -> BondingCurveState {
        BondingCurveState {
            token_mint: mint,
            creator,
            virtual_sol_reserves: INITIAL_VIRTUAL_SOL_RESERVES,
            virtual_token_reserves: INITIAL_VIRTUAL_TOKEN_RESERVES,
            total_supply: TOTAL_SUPPLY,
            real_token_reserves: 0,
            migration_threshold: MIGRATION_THRESHOLD,
            holder_threshold: HOLDER_THRESHOLD,
            volume_threshold_cents: VOLUME_THRESHOLD_CENTS,
            bump: 254,
            ..Default::default()
        }
    }

    pub(crate) fn encode(state: &BondingCurveState) -> Vec<u8> {
        let mut data = BondingCurveState::DISCRIMINATOR.to_vec();
        state.serialize(&mut data).unwrap();
        data
    }

    #[test]
    fn test_decode_account_data() {
        let state = fresh_curve(Pubkey::new_unique(), Pubkey::new_unique());
        let data = encode(&state);

        let decoded = BondingCurveState::try_deserialize(&mut data.as_slice()).unwrap();
        assert_eq!(decoded, state);
        assert_eq!(decoded.first_buyer(), None);
    }

    #[test]
    fn test_decode_rejects_foreign_account() {
        let state = fresh_curve(Pubkey::new_unique(), Pubkey::new_unique());
        let mut data = encode(&state);
        data[0] ^= 0xff;

        assert!(BondingCurveState::try_deserialize(&mut data.as_slice()).is_err());
        assert!(BondingCurveState::try_deserialize(&mut &data[..4]).is_err());
    }

    #[test]
    fn test_total_reserves_include_virtual() {
        let mut state = fresh_curve(Pubkey::new_unique(), Pubkey::new_unique());
        state.real_sol_reserves = 2_000_000_000;
        state.real_token_reserves = 5;

        assert_eq!(state.total_sol_reserves().unwrap(), 32_000_000_000);
        assert_eq!(
            state.total_token_reserves().unwrap(),
            INITIAL_VIRTUAL_TOKEN_RESERVES + 5
        );
    }

    #[test]
    fn test_invariant_check() {
        let mut state = fresh_curve(Pubkey::new_unique(), Pubkey::new_unique());
        assert!(state.check_invariants().is_ok());

        state.real_token_reserves = state.total_supply + 1;
        assert_eq!(state.check_invariants(), Err(CurveError::ReserveInconsistency));
    }

    #[test]
    fn test_info_view_caps_progress() {
        let mut state = fresh_curve(Pubkey::new_unique(), Pubkey::new_unique());
        state.real_sol_reserves = MIGRATION_THRESHOLD / 2;
        let view = CurveInfoView::from_state(&state, 100.0).unwrap();
        assert!((view.migration_progress_percent - 50.0).abs() < 1e-9);
        assert_eq!(view.sol_usd_price, 100.0);
        assert!(view.price_per_token_usd > 0.0);

        state.real_sol_reserves = MIGRATION_THRESHOLD * 3;
        let view = CurveInfoView::from_state(&state, 100.0).unwrap();
        assert_eq!(view.migration_progress_percent, 100.0);
    }
}
