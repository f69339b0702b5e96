use anchor_lang::prelude::*;
use anchor_lang::solana_program::{instruction::Instruction, program_pack::Pack, system_instruction};
use anchor_spl::associated_token::get_associated_token_address;
use anchor_spl::associated_token::spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use anchor_spl::metadata::mpl_token_metadata::{
    accounts::Metadata, instructions::CreateMetadataAccountV3Builder, types::DataV2,
};
use anchor_spl::token::{self, spl_token};

use crate::constants::TOKEN_DECIMALS;
use crate::errors::{LaunchpadError, LaunchpadResult, SubmissionStage};

/// Name, symbol and pinned metadata location of a new token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

fn build_error(e: ProgramError) -> LaunchpadError {
    LaunchpadError::submission(SubmissionStage::Build, e.to_string())
}

/// Creates a new SPL mint with Metaplex metadata
///
/// Accounts:
/// - creator: Token creator (signer, pays rent, mint and update authority)
/// - mint: New token mint (signer, created here)
/// - metadata: Metadata PDA of the mint
///
/// `mint_rent` is the rent-exempt minimum for an SPL mint account. Freeze
/// authority is never set.
pub fn create_mint_and_metadata(
    creator: &Pubkey,
    mint: &Pubkey,
    mint_rent: u64,
    metadata: &TokenMetadata,
) -> LaunchpadResult<Vec<Instruction>> {
    let create_account = system_instruction::create_account(
        creator,
        mint,
        mint_rent,
        spl_token::state::Mint::LEN as u64,
        &token::ID,
    );

    let initialize_mint =
        spl_token::instruction::initialize_mint2(&token::ID, mint, creator, None, TOKEN_DECIMALS)
            .map_err(build_error)?;

    let (metadata_account, _) = Metadata::find_pda(mint);
    let create_metadata = CreateMetadataAccountV3Builder::new()
        .metadata(metadata_account)
        .mint(*mint)
        .mint_authority(*creator)
        .payer(*creator)
        .update_authority(*creator, true)
        .data(DataV2 {
            name: metadata.name.clone(),
            symbol: metadata.symbol.clone(),
            uri: metadata.uri.clone(),
            seller_fee_basis_points: 0,
            creators: None,
            collection: None,
            uses: None,
        })
        .is_mutable(true)
        .instruction();

    Ok(vec![create_account, initialize_mint, create_metadata])
}

/// Mints `amount` to the creator's associated token account, creating it
/// first when absent.
///
/// Accounts:
/// - creator: Mint authority and ATA owner (signer)
/// - mint: Token mint
pub fn mint_supply_to_creator(
    creator: &Pubkey,
    mint: &Pubkey,
    amount: u64,
) -> LaunchpadResult<Vec<Instruction>> {
    let creator_token_account = get_associated_token_address(creator, mint);

    let mint_to = spl_token::instruction::mint_to(
        &token::ID,
        mint,
        &creator_token_account,
        creator,
        &[],
        amount,
    )
    .map_err(build_error)?;

    Ok(vec![
        create_associated_token_account_idempotent(creator, creator, mint, &token::ID),
        mint_to,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_spl::associated_token;
    use anchor_spl::metadata::mpl_token_metadata;

    fn metadata() -> TokenMetadata {
        TokenMetadata {
            name: "Launch".into(),
            symbol: "LNCH".into(),
            uri: "ipfs://launch".into(),
        }
    }

    #[test]
    fn test_mint_and_metadata_sequence() {
        let creator = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ixs = create_mint_and_metadata(&creator, &mint, 1_461_600, &metadata()).unwrap();

        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].program_id, anchor_lang::system_program::ID);
        assert_eq!(ixs[1].program_id, token::ID);
        assert_eq!(ixs[2].program_id, mpl_token_metadata::ID);
        assert_eq!(ixs[2].accounts[0].pubkey, Metadata::find_pda(&mint).0);
        // the new mint must sign its own creation
        assert!(ixs[0].accounts[1].is_signer);
    }

    #[test]
    fn test_mint_supply_targets_creator_ata() {
        let creator = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ixs = mint_supply_to_creator(&creator, &mint, 1_000).unwrap();

        assert_eq!(ixs[0].program_id, associated_token::ID);
        assert_eq!(ixs[1].program_id, token::ID);
        assert_eq!(
            ixs[1].accounts[1].pubkey,
            get_associated_token_address(&creator, &mint)
        );
    }
}
