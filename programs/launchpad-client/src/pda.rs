use anchor_lang::prelude::*;

use crate::constants::*;

/// The four program-derived accounts that hold a token's trading state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurveAccounts {
    pub curve_state: Pubkey,
    pub token_vault: Pubkey,
    pub first_buyer_lock_vault: Pubkey,
    pub sol_vault: Pubkey,
}

fn derive(seed: &[u8], token_mint: &Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[seed, token_mint.as_ref()], program_id).0
}

/// Derive every curve account for `token_mint` under `program_id`.
///
/// Pure; callers re-derive per operation instead of caching across mints.
pub fn derive_accounts(program_id: &Pubkey, token_mint: &Pubkey) -> CurveAccounts {
    CurveAccounts {
        curve_state: derive(BONDING_CURVE_SEED, token_mint, program_id),
        token_vault: derive(TOKEN_VAULT_SEED, token_mint, program_id),
        first_buyer_lock_vault: derive(FIRST_BUYER_LOCK_VAULT_SEED, token_mint, program_id),
        sol_vault: derive(SOL_VAULT_SEED, token_mint, program_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation_is_deterministic() {
        let program_id = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        assert_eq!(
            derive_accounts(&program_id, &mint),
            derive_accounts(&program_id, &mint)
        );
    }

    #[test]
    fn test_every_account_changes_with_mint() {
        let program_id = Pubkey::new_unique();
        let a = derive_accounts(&program_id, &Pubkey::new_unique());
        let b = derive_accounts(&program_id, &Pubkey::new_unique());

        assert_ne!(a.curve_state, b.curve_state);
        assert_ne!(a.token_vault, b.token_vault);
        assert_ne!(a.first_buyer_lock_vault, b.first_buyer_lock_vault);
        assert_ne!(a.sol_vault, b.sol_vault);
    }

    #[test]
    fn test_accounts_are_distinct_and_match_seeds() {
        let program_id = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let accounts = derive_accounts(&program_id, &mint);

        let (expected, _) =
            Pubkey::find_program_address(&[b"bonding_curve", mint.as_ref()], &program_id);
        assert_eq!(accounts.curve_state, expected);

        let all = [
            accounts.curve_state,
            accounts.token_vault,
            accounts.first_buyer_lock_vault,
            accounts.sol_vault,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_program_id_changes_addresses() {
        let mint = Pubkey::new_unique();
        let a = derive_accounts(&Pubkey::new_unique(), &mint);
        let b = derive_accounts(&Pubkey::new_unique(), &mint);
        assert_ne!(a.curve_state, b.curve_state);
    }
}
