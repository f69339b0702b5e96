use anchor_lang::prelude::*;
use anchor_lang::solana_program::{instruction::Instruction, system_program};
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};
use anchor_spl::associated_token::{self, get_associated_token_address};
use anchor_spl::associated_token::spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use anchor_spl::token;

use crate::pda::CurveAccounts;

/// Buy tokens from the bonding curve
///
/// Formula: constant product (x * y = k) over the effective reserves
/// - x = virtual + real SOL reserve
/// - y = virtual + real token reserve
///
/// When buying: SOL in → tokens out
/// New reserves: (x + sol_amount) * (y - tokens_out) = k
///
/// The program rejects the trade when fewer than `min_tokens_out` would be
/// delivered.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Buy {
    pub sol_amount: u64,
    pub min_tokens_out: u64,
}

impl Discriminator for Buy {
    const DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
}

impl InstructionData for Buy {}

/// Accounts:
/// - curve_state: Bonding curve state account
/// - token_mint: Token mint account
/// - token_vault: Curve token vault (pays out tokens)
/// - first_buyer_lock_vault: Receives the locked share of the first buy
/// - sol_vault: SOL vault (receives SOL)
/// - buyer_token_account: Buyer's associated token account
/// - buyer: Token buyer (signer, pays SOL)
/// - token_program: SPL Token program
/// - associated_token_program: Associated Token program
/// - system_program: System program
#[derive(Clone, Copy, Debug)]
pub struct BuyAccounts {
    pub curve: CurveAccounts,
    pub token_mint: Pubkey,
    pub buyer_token_account: Pubkey,
    pub buyer: Pubkey,
}

impl BuyAccounts {
    pub fn new(curve: CurveAccounts, token_mint: Pubkey, buyer: Pubkey) -> Self {
        Self {
            curve,
            token_mint,
            buyer_token_account: get_associated_token_address(&buyer, &token_mint),
            buyer,
        }
    }
}

impl ToAccountMetas for BuyAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.curve.curve_state, false),
            AccountMeta::new_readonly(self.token_mint, false),
            AccountMeta::new(self.curve.token_vault, false),
            AccountMeta::new(self.curve.first_buyer_lock_vault, false),
            AccountMeta::new(self.curve.sol_vault, false),
            AccountMeta::new(self.buyer_token_account, false),
            AccountMeta::new(self.buyer, true),
            AccountMeta::new_readonly(token::ID, false),
            AccountMeta::new_readonly(associated_token::ID, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ]
    }
}

pub fn buy(program_id: &Pubkey, accounts: &BuyAccounts, args: &Buy) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(None),
        data: args.data(),
    }
}

/// Buyer ATA creation (no-op when it exists) followed by the buy
pub fn buy_instructions(program_id: &Pubkey, accounts: &BuyAccounts, args: &Buy) -> Vec<Instruction> {
    vec![
        create_associated_token_account_idempotent(
            &accounts.buyer,
            &accounts.buyer,
            &accounts.token_mint,
            &token::ID,
        ),
        buy(program_id, accounts, args),
    ]
}
