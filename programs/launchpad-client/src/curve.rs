use crate::constants::*;
use crate::errors::{CurveError, InputError};
use crate::math::U256;

/// Calculate the constant product k = x * y
/// where x = SOL reserve, y = token reserve
#[inline]
pub fn calculate_k(sol_reserves: u64, token_reserves: u64) -> u128 {
    (sol_reserves as u128) * (token_reserves as u128)
}

/// Output of a constant product swap.
///
/// `amount_in` is added to `reserve_in`, the new `reserve_out` is
/// `floor(k / (reserve_in + amount_in))` and the difference is paid out.
fn swap_out(amount_in: u64, reserve_in: u64, reserve_out: u64) -> Result<u64, CurveError> {
    if amount_in == 0 {
        return Ok(0);
    }
    if reserve_in == 0 || reserve_out == 0 {
        return Err(CurveError::InvalidReserves);
    }

    let k = calculate_k(reserve_in, reserve_out);
    let new_reserve_in = (reserve_in as u128)
        .checked_add(amount_in as u128)
        .ok_or(CurveError::MathOverflow)?;

    let new_reserve_out = k / new_reserve_in;

    (reserve_out as u128)
        .checked_sub(new_reserve_out)
        .ok_or(CurveError::ReserveInconsistency)
        .map(|out| out as u64)
}

/// Calculate tokens out given SOL in
/// Maintains k = (sol_reserves + sol_in) * (token_reserves - tokens_out), floor-rounded
pub fn tokens_out(sol_in: u64, sol_reserves: u64, token_reserves: u64) -> Result<u64, CurveError> {
    swap_out(sol_in, sol_reserves, token_reserves)
}

/// Calculate SOL out given tokens in
/// Maintains k = (token_reserves + tokens_in) * (sol_reserves - sol_out), floor-rounded
pub fn sol_out(tokens_in: u64, token_reserves: u64, sol_reserves: u64) -> Result<u64, CurveError> {
    swap_out(tokens_in, token_reserves, sol_reserves)
}

/// Minimum acceptable output: floor(out * (10000 - slippage_bps) / 10000)
pub fn min_out(out: u64, slippage_bps: u16) -> Result<u64, InputError> {
    let bps = slippage_bps as u128;
    if bps > BPS_DENOMINATOR as u128 {
        return Err(InputError::InvalidSlippage(slippage_bps));
    }
    let bounded = (out as u128) * (BPS_DENOMINATOR as u128 - bps) / BPS_DENOMINATOR as u128;
    Ok(bounded as u64)
}

/// Price impact of a trade in percent.
///
/// Compares the effective price `amount_in / amount_out` with the spot price
/// `reserves_in / reserves_out`. For a buy the input side is SOL, for a sell
/// the input side is the token; the caller passes the reserves accordingly.
///
/// Both prices are cross-multiplied into 256-bit integers, so the only
/// floating point step is the final conversion of the 1e9-scaled percent.
pub fn price_impact_percent(
    amount_in: u64,
    reserves_in: u64,
    reserves_out: u64,
    is_buy: bool,
) -> Result<f64, CurveError> {
    let amount_out = if is_buy {
        tokens_out(amount_in, reserves_in, reserves_out)?
    } else {
        sol_out(amount_in, reserves_in, reserves_out)?
    };
    if amount_out == 0 {
        return Ok(0.0);
    }

    // effective / spot = (amount_in * reserves_out) / (reserves_in * amount_out)
    let effective = (amount_in as u128) * (reserves_out as u128);
    let spot = (reserves_in as u128) * (amount_out as u128);
    let diff = U256::from(effective.abs_diff(spot));

    let impact_scaled = diff * U256::from(100u64) * U256::from(PRICE_SCALE) / U256::from(spot);
    if impact_scaled > U256::from(u128::MAX) {
        return Err(CurveError::MathOverflow);
    }

    Ok(scaled_to_display(impact_scaled.as_u128()))
}

/// Tokens withheld from a first buy into the lock vault
pub fn first_buyer_locked(tokens_out: u64) -> u64 {
    ((tokens_out as u128) * (FIRST_BUYER_LOCK_BPS as u128) / (BPS_DENOMINATOR as u128)) as u64
}

/// Price of one whole token in SOL. Display only.
pub fn price_per_token(sol_reserves: u64, token_reserves: u64) -> f64 {
    if token_reserves == 0 {
        return 0.0;
    }
    sol_reserves as f64 / token_reserves as f64
}

/// Convert a 9-decimal base amount into a human readable number. Display only.
pub fn to_display(amount: u64) -> f64 {
    amount as f64 / PRICE_SCALE as f64
}

/// Convert a 1e9-scaled price into a human readable number. Display only.
pub fn scaled_to_display(value: u128) -> f64 {
    value as f64 / PRICE_SCALE as f64
}
