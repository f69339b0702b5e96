use anchor_lang::prelude::*;
use anchor_lang::solana_program::{instruction::Instruction, system_program};
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::token;

use crate::pda::CurveAccounts;

/// Sell tokens back to the bonding curve
///
/// When selling: tokens in → SOL out
/// New reserves: (y + token_amount) * (x - sol_out) = k
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sell {
    pub token_amount: u64,
    pub min_sol_out: u64,
}

impl Discriminator for Sell {
    const DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];
}

impl InstructionData for Sell {}

/// Accounts:
/// - curve_state: Bonding curve state account
/// - token_mint: Token mint account
/// - token_vault: Curve token vault (receives tokens)
/// - sol_vault: SOL vault (pays out SOL)
/// - seller_token_account: Seller's associated token account
/// - seller: Token seller (signer)
/// - token_program: SPL Token program
/// - system_program: System program
#[derive(Clone, Copy, Debug)]
pub struct SellAccounts {
    pub curve: CurveAccounts,
    pub token_mint: Pubkey,
    pub seller_token_account: Pubkey,
    pub seller: Pubkey,
}

impl SellAccounts {
    pub fn new(curve: CurveAccounts, token_mint: Pubkey, seller: Pubkey) -> Self {
        Self {
            curve,
            token_mint,
            seller_token_account: get_associated_token_address(&seller, &token_mint),
            seller,
        }
    }
}

impl ToAccountMetas for SellAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.curve.curve_state, false),
            AccountMeta::new_readonly(self.token_mint, false),
            AccountMeta::new(self.curve.token_vault, false),
            AccountMeta::new(self.curve.sol_vault, false),
            AccountMeta::new(self.seller_token_account, false),
            AccountMeta::new(self.seller, true),
            AccountMeta::new_readonly(token::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ]
    }
}

pub fn sell(program_id: &Pubkey, accounts: &SellAccounts, args: &Sell) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: args.data(),
    }
}
