use anchor_lang::prelude::*;
use anchor_lang::solana_program::{instruction::Instruction, system_program, sysvar};
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};
use anchor_spl::token::{self, spl_token};

use crate::constants::*;
use crate::errors::{LaunchpadError, LaunchpadResult, SubmissionStage};
use crate::pda::CurveAccounts;

/// Arguments of the program's `initialize_bonding_curve` entry point
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitializeBondingCurve {
    pub virtual_sol_reserves: u64,
    pub virtual_token_reserves: u64,
    pub migration_threshold: u64,
    pub total_supply: u64,
    pub holder_threshold: u64,
    pub volume_threshold_cents: u64,
}

impl Discriminator for InitializeBondingCurve {
    const DISCRIMINATOR: [u8; 8] = [140, 201, 166, 55, 224, 232, 206, 114];
}

impl InstructionData for InitializeBondingCurve {}

impl Default for InitializeBondingCurve {
    /// Platform launch constants
    fn default() -> Self {
        Self {
            virtual_sol_reserves: INITIAL_VIRTUAL_SOL_RESERVES,
            virtual_token_reserves: INITIAL_VIRTUAL_TOKEN_RESERVES,
            migration_threshold: MIGRATION_THRESHOLD,
            total_supply: TOTAL_SUPPLY,
            holder_threshold: HOLDER_THRESHOLD,
            volume_threshold_cents: VOLUME_THRESHOLD_CENTS,
        }
    }
}

/// Accounts:
/// - curve_state: Bonding curve state account (PDA, created)
/// - token_vault: Curve token vault (PDA, created)
/// - first_buyer_lock_vault: First buyer lock vault (PDA, created)
/// - sol_vault: SOL vault (PDA, created)
/// - token_mint: Token mint
/// - creator_token_account: Creator's token account holding the minted supply
/// - creator: Token creator (signer, pays rent)
/// - token_program: SPL Token program
/// - system_program: System program
/// - rent: Rent sysvar
#[derive(Clone, Copy, Debug)]
pub struct InitializeBondingCurveAccounts {
    pub curve: CurveAccounts,
    pub token_mint: Pubkey,
    pub creator_token_account: Pubkey,
    pub creator: Pubkey,
}

impl ToAccountMetas for InitializeBondingCurveAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.curve.curve_state, false),
            AccountMeta::new(self.curve.token_vault, false),
            AccountMeta::new(self.curve.first_buyer_lock_vault, false),
            AccountMeta::new(self.curve.sol_vault, false),
            AccountMeta::new(self.token_mint, false),
            AccountMeta::new(self.creator_token_account, false),
            AccountMeta::new(self.creator, true),
            AccountMeta::new_readonly(token::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
        ]
    }
}

pub fn initialize_bonding_curve(
    program_id: &Pubkey,
    accounts: &InitializeBondingCurveAccounts,
    args: &InitializeBondingCurve,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: args.data(),
    }
}

/// The complete launch: create the curve, move the full supply into the
/// vault and revoke minting. Returned as one list so it is submitted as one
/// atomic transaction.
pub fn launch_instructions(
    program_id: &Pubkey,
    accounts: &InitializeBondingCurveAccounts,
    args: &InitializeBondingCurve,
) -> LaunchpadResult<Vec<Instruction>> {
    let build_err = |e: ProgramError| LaunchpadError::submission(SubmissionStage::Build, e.to_string());

    let transfer_supply = spl_token::instruction::transfer(
        &token::ID,
        &accounts.creator_token_account,
        &accounts.curve.token_vault,
        &accounts.creator,
        &[],
        args.total_supply,
    )
    .map_err(build_err)?;

    let revoke_mint = spl_token::instruction::set_authority(
        &token::ID,
        &accounts.token_mint,
        None,
        spl_token::instruction::AuthorityType::MintTokens,
        &accounts.creator,
        &[],
    )
    .map_err(build_err)?;

    Ok(vec![
        initialize_bonding_curve(program_id, accounts, args),
        transfer_supply,
        revoke_mint,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pda::derive_accounts;

    #[test]
    fn test_launch_is_three_ordered_instructions() {
        let program_id = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let creator = Pubkey::new_unique();
        let accounts = InitializeBondingCurveAccounts {
            curve: derive_accounts(&program_id, &mint),
            token_mint: mint,
            creator_token_account: Pubkey::new_unique(),
            creator,
        };

        let ixs = launch_instructions(&program_id, &accounts, &InitializeBondingCurve::default())
            .unwrap();

        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].program_id, program_id);
        assert_eq!(ixs[0].data[..8], InitializeBondingCurve::DISCRIMINATOR);
        assert_eq!(ixs[0].accounts.len(), 10);
        assert_eq!(ixs[0].accounts[0].pubkey, accounts.curve.curve_state);
        assert!(ixs[0].accounts[6].is_signer);
        assert_eq!(ixs[1].program_id, token::ID);
        assert_eq!(ixs[1].accounts[1].pubkey, accounts.curve.token_vault);
        assert_eq!(ixs[2].program_id, token::ID);
        assert_eq!(ixs[2].accounts[0].pubkey, mint);
    }

    #[test]
    fn test_args_encode_after_discriminator() {
        let args = InitializeBondingCurve::default();
        let data = args.data();

        assert_eq!(data.len(), 8 + 6 * 8);
        let decoded = InitializeBondingCurve::deserialize(&mut &data[8..]).unwrap();
        assert_eq!(decoded, args);
        assert_eq!(decoded.virtual_sol_reserves, 30_000_000_000);
    }
}
