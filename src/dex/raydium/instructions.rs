//! AMM v4 instruction builders: pool creation and swaps.
//!
//! Builders return `InnerTransaction`s, i.e. ordered instruction groups that
//! the assembler packs into versioned transactions.

use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    signature::Keypair,
    system_instruction, system_program, sysvar,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::sync::Arc;
use tracing::debug;

use super::pool_keys::{amm_config_id, PoolKeys};
use crate::chain::constants::{ProgramIds, WSOL_MINT};
use crate::error::{LaunchError, Result};
use crate::utils::TokenAmount;

const INITIALIZE2_TAG: u8 = 1;
const SWAP_BASE_IN_TAG: u8 = 9;
const SWAP_BASE_OUT_TAG: u8 = 11;

pub const DEFAULT_COMPUTE_UNITS: u32 = 400_000;
pub const DEFAULT_MICRO_LAMPORTS: u64 = 300_000;

/// Ordered instructions that should land in one transaction when they fit
#[derive(Debug, Clone, Default)]
pub struct InnerTransaction {
    pub instructions: Vec<Instruction>,
    /// Signers required besides the fee payer
    pub extra_signers: Vec<Arc<Keypair>>,
}

impl InnerTransaction {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            extra_signers: Vec::new(),
        }
    }
}

/// Which side of the swap is exact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedSide {
    /// Exact input, minimum output
    In,
    /// Exact output, maximum input
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudgetConfig {
    pub units: u32,
    pub micro_lamports: u64,
}

impl Default for ComputeBudgetConfig {
    fn default() -> Self {
        Self {
            units: DEFAULT_COMPUTE_UNITS,
            micro_lamports: DEFAULT_MICRO_LAMPORTS,
        }
    }
}

/// Pool creation inputs, amounts in base units
#[derive(Debug, Clone, Copy)]
pub struct CreatePoolParams<'a> {
    pub programs: ProgramIds,
    pub pool_keys: &'a PoolKeys,
    pub owner: Pubkey,
    pub base_amount: u64,
    pub quote_amount: u64,
    /// Unix seconds at which trading opens
    pub open_time: u64,
}

fn map_program_error(context: &str) -> impl FnOnce(ProgramError) -> LaunchError + '_ {
    move |e| LaunchError::Instruction(format!("{}: {}", context, e))
}

/// Create the WSOL ATA, fund it and mark it native
fn wrap_sol_instructions(owner: &Pubkey, lamports: u64) -> Result<Vec<Instruction>> {
    let wsol_account = get_associated_token_address(owner, &WSOL_MINT);
    Ok(vec![
        create_associated_token_account_idempotent(owner, owner, &WSOL_MINT, &spl_token::id()),
        system_instruction::transfer(owner, &wsol_account, lamports),
        spl_token::instruction::sync_native(&spl_token::id(), &wsol_account)
            .map_err(map_program_error("sync_native"))?,
    ])
}

fn close_wsol_instruction(owner: &Pubkey) -> Result<Instruction> {
    let wsol_account = get_associated_token_address(owner, &WSOL_MINT);
    spl_token::instruction::close_account(&spl_token::id(), &wsol_account, owner, owner, &[])
        .map_err(map_program_error("close_account"))
}

/// Raw `initialize2` instruction
pub fn initialize2_instruction(params: &CreatePoolParams<'_>) -> Instruction {
    let keys = params.pool_keys;
    let owner = params.owner;

    let mut data = Vec::with_capacity(26);
    data.push(INITIALIZE2_TAG);
    data.push(keys.nonce);
    data.extend_from_slice(&params.open_time.to_le_bytes());
    data.extend_from_slice(&params.quote_amount.to_le_bytes());
    data.extend_from_slice(&params.base_amount.to_le_bytes());

    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(spl_associated_token_account::id(), false),
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new(keys.id, false),
        AccountMeta::new_readonly(keys.authority, false),
        AccountMeta::new(keys.open_orders, false),
        AccountMeta::new(keys.lp_mint, false),
        AccountMeta::new_readonly(keys.base_mint, false),
        AccountMeta::new_readonly(keys.quote_mint, false),
        AccountMeta::new(keys.base_vault, false),
        AccountMeta::new(keys.quote_vault, false),
        AccountMeta::new(keys.target_orders, false),
        AccountMeta::new_readonly(amm_config_id(&keys.program_id), false),
        AccountMeta::new(params.programs.create_pool_fee, false),
        AccountMeta::new_readonly(keys.market_program_id, false),
        AccountMeta::new_readonly(keys.market_id, false),
        AccountMeta::new(owner, true),
        AccountMeta::new(get_associated_token_address(&owner, &keys.base_mint), false),
        AccountMeta::new(get_associated_token_address(&owner, &keys.quote_mint), false),
        AccountMeta::new(get_associated_token_address(&owner, &keys.lp_mint), false),
    ];

    Instruction {
        program_id: keys.program_id,
        accounts,
        data,
    }
}

pub fn build_create_pool_instructions(params: &CreatePoolParams<'_>) -> Result<Vec<InnerTransaction>> {
    let keys = params.pool_keys;
    let owner = params.owner;
    let mut instructions = Vec::new();

    for (mint, amount) in [
        (keys.base_mint, params.base_amount),
        (keys.quote_mint, params.quote_amount),
    ] {
        if mint == WSOL_MINT {
            instructions.extend(wrap_sol_instructions(&owner, amount)?);
        } else {
            instructions.push(create_associated_token_account_idempotent(
                &owner,
                &owner,
                &mint,
                &spl_token::id(),
            ));
        }
    }

    instructions.push(initialize2_instruction(params));

    if keys.base_mint == WSOL_MINT || keys.quote_mint == WSOL_MINT {
        instructions.push(close_wsol_instruction(&owner)?);
    }

    debug!(
        "Built create pool instructions for {}: base={}, quote={}, open_time={}",
        keys.id,
        params.base_amount,
        params.quote_amount,
        params.open_time
    );

    Ok(vec![InnerTransaction::new(instructions)])
}

/// Raw `swap_base_in` / `swap_base_out` instruction
pub fn swap_instruction(
    keys: &PoolKeys,
    owner: &Pubkey,
    user_source: &Pubkey,
    user_destination: &Pubkey,
    amount_in: u64,
    amount_out: u64,
    fixed_side: FixedSide,
) -> Instruction {
    let tag = match fixed_side {
        FixedSide::In => SWAP_BASE_IN_TAG,
        FixedSide::Out => SWAP_BASE_OUT_TAG,
    };

    let mut data = Vec::with_capacity(17);
    data.push(tag);
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&amount_out.to_le_bytes());

    let accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(keys.id, false),
        AccountMeta::new_readonly(keys.authority, false),
        AccountMeta::new(keys.open_orders, false),
        AccountMeta::new(keys.target_orders, false),
        AccountMeta::new(keys.base_vault, false),
        AccountMeta::new(keys.quote_vault, false),
        AccountMeta::new_readonly(keys.market_program_id, false),
        AccountMeta::new(keys.market_id, false),
        AccountMeta::new(keys.market_bids, false),
        AccountMeta::new(keys.market_asks, false),
        AccountMeta::new(keys.market_event_queue, false),
        AccountMeta::new(keys.market_base_vault, false),
        AccountMeta::new(keys.market_quote_vault, false),
        AccountMeta::new_readonly(keys.market_authority, false),
        AccountMeta::new(*user_source, false),
        AccountMeta::new(*user_destination, false),
        AccountMeta::new_readonly(*owner, true),
    ];

    Instruction {
        program_id: keys.program_id,
        accounts,
        data,
    }
}

fn build_swap_instructions(
    keys: &PoolKeys,
    owner: &Keypair,
    amount_in: &TokenAmount,
    amount_out: &TokenAmount,
    fixed_side: FixedSide,
    compute_budget: ComputeBudgetConfig,
) -> Result<Vec<InnerTransaction>> {
    use solana_sdk::signer::Signer;

    let pool_mints = [keys.base_mint, keys.quote_mint];
    if !pool_mints.contains(&amount_in.mint)
        || !pool_mints.contains(&amount_out.mint)
        || amount_in.mint == amount_out.mint
    {
        return Err(LaunchError::Instruction(format!(
            "swap {} -> {} does not match pool {}",
            amount_in.mint, amount_out.mint, keys.id
        )));
    }

    let owner_key = owner.pubkey();
    let source = get_associated_token_address(&owner_key, &amount_in.mint);
    let destination = get_associated_token_address(&owner_key, &amount_out.mint);

    let mut instructions = vec![
        ComputeBudgetInstruction::set_compute_unit_price(compute_budget.micro_lamports),
        ComputeBudgetInstruction::set_compute_unit_limit(compute_budget.units),
    ];

    if amount_in.mint == WSOL_MINT {
        instructions.extend(wrap_sol_instructions(&owner_key, amount_in.raw)?);
    }
    instructions.push(create_associated_token_account_idempotent(
        &owner_key,
        &owner_key,
        &amount_out.mint,
        &spl_token::id(),
    ));

    instructions.push(swap_instruction(
        keys,
        &owner_key,
        &source,
        &destination,
        amount_in.raw,
        amount_out.raw,
        fixed_side,
    ));

    if amount_in.mint == WSOL_MINT || amount_out.mint == WSOL_MINT {
        instructions.push(close_wsol_instruction(&owner_key)?);
    }

    debug!(
        "Built {:?} swap for {}: in={} ({}), out={} ({})",
        fixed_side, owner_key, amount_in.raw, amount_in.mint, amount_out.raw, amount_out.mint
    );

    Ok(vec![InnerTransaction::new(instructions)])
}

/// Exact input buy: spend `amount_in`, receive at least `min_amount_out`
pub fn build_swap_buy_instructions(
    keys: &PoolKeys,
    owner: &Keypair,
    amount_in: &TokenAmount,
    min_amount_out: &TokenAmount,
    compute_budget: ComputeBudgetConfig,
) -> Result<Vec<InnerTransaction>> {
    build_swap_instructions(keys, owner, amount_in, min_amount_out, FixedSide::In, compute_budget)
}

/// Exact output sell: receive `amount_out`, spend at most `max_amount_in`
pub fn build_swap_sell_instructions(
    keys: &PoolKeys,
    owner: &Keypair,
    max_amount_in: &TokenAmount,
    amount_out: &TokenAmount,
    compute_budget: ComputeBudgetConfig,
) -> Result<Vec<InnerTransaction>> {
    build_swap_instructions(keys, owner, max_amount_in, amount_out, FixedSide::Out, compute_budget)
}
