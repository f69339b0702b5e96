/// Token decimals used by every launchpad mint (matches lamports)
pub const TOKEN_DECIMALS: u8 = 9;

/// Fixed-point scale shared by SOL and token amounts
pub const PRICE_SCALE: u64 = 1_000_000_000; // 10^9

/// Basis point denominator for slippage bounds
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Default slippage tolerance (1% = 100 bps)
pub const DEFAULT_SLIPPAGE_BPS: u16 = 100;

/// PDA seeds
pub const BONDING_CURVE_SEED: &[u8] = b"bonding_curve";
pub const TOKEN_VAULT_SEED: &[u8] = b"token_vault";
pub const FIRST_BUYER_LOCK_VAULT_SEED: &[u8] = b"first_buyer_lock_vault";
pub const SOL_VAULT_SEED: &[u8] = b"sol_vault";

/// Total token supply: 1 billion tokens with 9 decimals
pub const TOTAL_SUPPLY: u64 = 1_000_000_000_000_000_000; // 1B * 10^9

/// Initial virtual SOL reserve (starting point for bonding curve)
/// This determines the starting price
pub const INITIAL_VIRTUAL_SOL_RESERVES: u64 = 30_000_000_000; // 30 SOL in lamports

/// Initial virtual token reserve (starting point for bonding curve)
pub const INITIAL_VIRTUAL_TOKEN_RESERVES: u64 = 1_073_000_000_000_000_000; // 1.073B * 10^9

/// Real SOL accumulated before the curve migrates to a DEX pool
pub const MIGRATION_THRESHOLD: u64 = 85_000_000_000; // 85 SOL in lamports

/// Holder count required before the first buyer's lock can be released
pub const HOLDER_THRESHOLD: u64 = 100;

/// Traded volume required before the first buyer's lock can be released
pub const VOLUME_THRESHOLD_CENTS: u64 = 5_000_000; // $50,000

/// Share of the first buyer's tokens locked by the program, informational only
pub const FIRST_BUYER_LOCK_BPS: u64 = 6_000; // 60%

/// Last known SOL/USD price used when the price feed is unavailable
pub const FALLBACK_SOL_USD_PRICE: f64 = 150.0;

/// Default wait between minting the supply and moving it into the vault
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3_000;
