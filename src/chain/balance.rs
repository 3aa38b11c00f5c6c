// Thin readers over `getAccountInfo` / `getBalance` / `getTokenAccountBalance`.

use solana_sdk::{account::Account, program_pack::Pack, pubkey::Pubkey};
use spl_associated_token_account::get_associated_token_address_with_program_id;
use tracing::{debug, info};

use super::constants::WSOL_MINT;
use super::rpc::ChainRpc;
use crate::error::{LaunchError, Result};

/// Fetch an account, `None` when it does not exist
pub async fn fetch_account(rpc: &dyn ChainRpc, pubkey: &Pubkey) -> Result<Option<Account>> {
    let account = rpc.get_account(pubkey).await?;
    debug!(
        "Fetched account {}: {}",
        pubkey,
        account
            .as_ref()
            .map(|a| format!("{} bytes, owner {}", a.data.len(), a.owner))
            .unwrap_or_else(|| "missing".to_string())
    );
    Ok(account)
}

pub async fn get_lamports(rpc: &dyn ChainRpc, owner: &Pubkey) -> Result<u64> {
    rpc.get_balance(owner).await
}

/// Balance of the owner's associated token account, `0` when it does not exist
pub async fn get_token_balance(
    rpc: &dyn ChainRpc,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Result<u64> {
    let ata = get_associated_token_address_with_program_id(owner, mint, token_program);
    Ok(rpc.get_token_account_balance(&ata).await?.unwrap_or(0))
}

/// Lamports when `mint` is WSOL, otherwise the token balance
pub async fn get_mint_balance(
    rpc: &dyn ChainRpc,
    owner: &Pubkey,
    mint: &Pubkey,
    token_program: &Pubkey,
) -> Result<u64> {
    if *mint == WSOL_MINT {
        get_lamports(rpc, owner).await
    } else {
        get_token_balance(rpc, owner, mint, token_program).await
    }
}

/// Mint decimals and owning token program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintInfo {
    pub mint: Pubkey,
    pub decimals: u8,
    pub token_program: Pubkey,
}

/// Decode the base SPL mint layout (shared by Token-2022 mints)
pub fn decode_mint(mint: &Pubkey, account: &Account) -> Result<MintInfo> {
    let len = spl_token::state::Mint::LEN;
    if account.data.len() < len {
        return Err(LaunchError::InvalidMarket(format!(
            "mint {} has {} bytes, expected at least {}",
            mint,
            account.data.len(),
            len
        )));
    }

    let state = spl_token::state::Mint::unpack_from_slice(&account.data[..len])
        .map_err(|e| LaunchError::InvalidMarket(format!("mint {}: {}", mint, e)))?;

    Ok(MintInfo {
        mint: *mint,
        decimals: state.decimals,
        token_program: account.owner,
    })
}

/// Log the wallet's SOL balance
pub async fn output_balance(rpc: &dyn ChainRpc, owner: &Pubkey) -> Result<u64> {
    let lamports = get_lamports(rpc, owner).await?;
    info!(
        "💰 Wallet {} balance: {:.4} SOL ({} lamports)",
        owner,
        lamports as f64 / 1e9,
        lamports
    );
    Ok(lamports)
}
