use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::token;

use crate::pda::CurveAccounts;

/// Release the first buyer's locked tokens once the curve is unlockable
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnlockFirstBuyerTokens {}

impl Discriminator for UnlockFirstBuyerTokens {
    const DISCRIMINATOR: [u8; 8] = [123, 147, 234, 28, 72, 46, 5, 188];
}

impl InstructionData for UnlockFirstBuyerTokens {}

/// Accounts:
/// - curve_state: Bonding curve state account
/// - token_mint: Token mint account
/// - first_buyer_lock_vault: Lock vault (pays out the locked tokens)
/// - first_buyer_token_account: First buyer's associated token account
/// - first_buyer: First buyer (signer)
/// - token_program: SPL Token program
#[derive(Clone, Copy, Debug)]
pub struct UnlockAccounts {
    pub curve: CurveAccounts,
    pub token_mint: Pubkey,
    pub first_buyer_token_account: Pubkey,
    pub first_buyer: Pubkey,
}

impl UnlockAccounts {
    pub fn new(curve: CurveAccounts, token_mint: Pubkey, first_buyer: Pubkey) -> Self {
        Self {
            curve,
            token_mint,
            first_buyer_token_account: get_associated_token_address(&first_buyer, &token_mint),
            first_buyer,
        }
    }
}

impl ToAccountMetas for UnlockAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.curve.curve_state, false),
            AccountMeta::new_readonly(self.token_mint, false),
            AccountMeta::new(self.curve.first_buyer_lock_vault, false),
            AccountMeta::new(self.first_buyer_token_account, false),
            AccountMeta::new(self.first_buyer, true),
            AccountMeta::new_readonly(token::ID, false),
        ]
    }
}

pub fn unlock_first_buyer_tokens(program_id: &Pubkey, accounts: &UnlockAccounts) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: UnlockFirstBuyerTokens {}.data(),
    }
}
