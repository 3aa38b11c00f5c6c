// Burn the LP wallet's entire LP token balance for the recorded pool,
// locking the initial liquidity. Marks the state file `removed` once the
// burn is confirmed.

use solana_sdk::signature::{Keypair, Signer};
use spl_associated_token_account::get_associated_token_address;
use tracing::{info, warn};

use super::executor::RunOutcome;
use crate::chain::balance::get_token_balance;
use crate::chain::rpc::ChainRpc;
use crate::chain::transaction_builder::{
    prepare_recent_blockhash, sign_transaction, AddressLookupTableCache, TransactionAssembler,
};
use crate::chain::transaction_sender::TransactionSender;
use crate::data::StateStore;
use crate::dex::raydium::InnerTransaction;
use crate::error::{LaunchError, Result};

pub async fn burn_lp(
    rpc: &dyn ChainRpc,
    sender: &TransactionSender,
    store: &StateStore,
    lp_wallet: &Keypair,
) -> Result<RunOutcome> {
    let mut state = store.load().await?;
    let Some(pool_keys) = state.pool_keys.clone() else {
        return Ok(RunOutcome::Aborted(format!(
            "no pool recorded in {}",
            store.file_path().display()
        )));
    };

    let owner = lp_wallet.pubkey();
    let lp_account = get_associated_token_address(&owner, &pool_keys.lp_mint);
    let amount = get_token_balance(rpc, &owner, &pool_keys.lp_mint, &spl_token::id()).await?;
    info!("LP token amount: {} ({})", amount, lp_account);
    if amount == 0 {
        warn!("No LP tokens to burn for pool {}", pool_keys.id);
        return Ok(RunOutcome::Aborted("LP token balance is 0".to_string()));
    }

    let burn = spl_token::instruction::burn(
        &spl_token::id(),
        &lp_account,
        &pool_keys.lp_mint,
        &owner,
        &[],
        amount,
    )
    .map_err(|e| LaunchError::Instruction(format!("burn: {}", e)))?;

    let blockhash = match prepare_recent_blockhash(rpc).await {
        Ok(blockhash) => blockhash,
        Err(e @ LaunchError::PrepareTransaction) => return Ok(RunOutcome::Err(e.to_string())),
        Err(e) => return Err(e),
    };
    let assembler = TransactionAssembler::new(owner, &AddressLookupTableCache::new(), blockhash);
    let unsigned = assembler.build_simple_transactions(&[InnerTransaction::new(vec![burn])])?;

    for tx in &unsigned {
        let tx = sign_transaction(tx, &[lp_wallet])?;
        sender.simulate(&tx).await?;

        let result = sender.execute(&tx).await?;
        if !result.confirmed {
            return Ok(RunOutcome::Aborted(format!(
                "burn {} not confirmed: {}",
                result.signature,
                result.error.as_deref().unwrap_or("unknown")
            )));
        }
        info!("LP burned, signature: {}", result.signature);
    }

    state.removed = Some(true);
    store.save(&state).await?;
    Ok(RunOutcome::Done)
}
