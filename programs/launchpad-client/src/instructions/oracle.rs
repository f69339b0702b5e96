use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};

/// Push holder count and volume data to a curve.
///
/// Only the oracle authority may sign; the program recomputes `unlockable`
/// from the new counters.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchUpdateData {
    pub holder_count: u64,
    pub volume_cents_to_add: u64,
}

impl Discriminator for BatchUpdateData {
    const DISCRIMINATOR: [u8; 8] = [102, 47, 141, 221, 158, 86, 58, 24];
}

impl InstructionData for BatchUpdateData {}

/// Re-evaluate the unlock thresholds against the stored counters
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CheckUnlockConditions {}

impl Discriminator for CheckUnlockConditions {
    const DISCRIMINATOR: [u8; 8] = [104, 249, 33, 140, 131, 164, 187, 94];
}

impl InstructionData for CheckUnlockConditions {}

/// Accounts:
/// - curve_state: Bonding curve state account
/// - authority: Oracle (or any caller for unlock checks), signer
#[derive(Clone, Copy, Debug)]
pub struct CurveAuthorityAccounts {
    pub curve_state: Pubkey,
    pub authority: Pubkey,
}

impl ToAccountMetas for CurveAuthorityAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.curve_state, false),
            AccountMeta::new_readonly(self.authority, true),
        ]
    }
}

pub fn batch_update_data(
    program_id: &Pubkey,
    accounts: &CurveAuthorityAccounts,
    args: &BatchUpdateData,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: args.data(),
    }
}

pub fn check_unlock_conditions(program_id: &Pubkey, accounts: &CurveAuthorityAccounts) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: CheckUnlockConditions {}.data(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_update_layout() {
        let program_id = Pubkey::new_unique();
        let accounts = CurveAuthorityAccounts {
            curve_state: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
        };
        let ix = batch_update_data(
            &program_id,
            &accounts,
            &BatchUpdateData {
                holder_count: 120,
                volume_cents_to_add: 250_000,
            },
        );

        assert_eq!(ix.data.len(), 24);
        assert_eq!(ix.data[..8], BatchUpdateData::DISCRIMINATOR);
        assert_eq!(ix.data[8..16], 120u64.to_le_bytes());
        assert!(ix.accounts[0].is_writable && !ix.accounts[0].is_signer);
        assert!(ix.accounts[1].is_signer && !ix.accounts[1].is_writable);
    }

    #[test]
    fn test_check_unlock_is_bare_discriminator() {
        let accounts = CurveAuthorityAccounts {
            curve_state: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
        };
        let ix = check_unlock_conditions(&Pubkey::new_unique(), &accounts);

        assert_eq!(ix.data, CheckUnlockConditions::DISCRIMINATOR.to_vec());
    }
}
