//! Deterministic AMM v4 pool key derivation.
//!
//! Every pool account is a PDA of the AMM program seeded with the market
//! id, so the full key set is known before the pool exists.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use super::market::MarketStateV3;
use crate::chain::constants::ProgramIds;
use crate::error::{LaunchError, Result};
use crate::utils::serde_helpers::pubkey_string;

const AMM_ID_SEED: &[u8] = b"amm_associated_seed";
const AMM_AUTHORITY_SEED: &[u8] = b"amm authority";
const OPEN_ORDERS_SEED: &[u8] = b"open_order_associated_seed";
const LP_MINT_SEED: &[u8] = b"lp_mint_associated_seed";
const BASE_VAULT_SEED: &[u8] = b"coin_vault_associated_seed";
const QUOTE_VAULT_SEED: &[u8] = b"pc_vault_associated_seed";
const TARGET_ORDERS_SEED: &[u8] = b"target_associated_seed";
const WITHDRAW_QUEUE_SEED: &[u8] = b"withdraw_associated_seed";
const LP_VAULT_SEED: &[u8] = b"temp_lp_token_associated_seed";
const AMM_CONFIG_SEED: &[u8] = b"amm_config_account_seed";

const MARKET_AUTHORITY_NONCE_LIMIT: u64 = 100;

/// Account set of an AMM v4 pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolKeys {
    #[serde(with = "pubkey_string")]
    pub id: Pubkey,
    #[serde(with = "pubkey_string")]
    pub base_mint: Pubkey,
    #[serde(with = "pubkey_string")]
    pub quote_mint: Pubkey,
    #[serde(with = "pubkey_string")]
    pub lp_mint: Pubkey,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub lp_decimals: u8,
    pub version: u8,
    #[serde(with = "pubkey_string")]
    pub program_id: Pubkey,
    #[serde(with = "pubkey_string")]
    pub authority: Pubkey,
    pub nonce: u8,
    #[serde(with = "pubkey_string")]
    pub open_orders: Pubkey,
    #[serde(with = "pubkey_string")]
    pub target_orders: Pubkey,
    #[serde(with = "pubkey_string")]
    pub base_vault: Pubkey,
    #[serde(with = "pubkey_string")]
    pub quote_vault: Pubkey,
    #[serde(with = "pubkey_string")]
    pub withdraw_queue: Pubkey,
    #[serde(with = "pubkey_string")]
    pub lp_vault: Pubkey,
    pub market_version: u8,
    #[serde(with = "pubkey_string")]
    pub market_program_id: Pubkey,
    #[serde(with = "pubkey_string")]
    pub market_id: Pubkey,
    #[serde(with = "pubkey_string")]
    pub market_authority: Pubkey,
    #[serde(with = "pubkey_string")]
    pub market_base_vault: Pubkey,
    #[serde(with = "pubkey_string")]
    pub market_quote_vault: Pubkey,
    #[serde(with = "pubkey_string")]
    pub market_bids: Pubkey,
    #[serde(with = "pubkey_string")]
    pub market_asks: Pubkey,
    #[serde(with = "pubkey_string")]
    pub market_event_queue: Pubkey,
    #[serde(with = "pubkey_string")]
    pub lookup_table_account: Pubkey,
}

/// Inputs to `derive_pool_keys`
#[derive(Debug, Clone, Copy)]
pub struct PoolKeyInputs {
    pub market_id: Pubkey,
    pub market: MarketStateV3,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub programs: ProgramIds,
}

fn market_pda(program_id: &Pubkey, market_id: &Pubkey, seed: &[u8]) -> Pubkey {
    Pubkey::find_program_address(&[program_id.as_ref(), market_id.as_ref(), seed], program_id).0
}

/// AMM authority and its bump
pub fn amm_authority(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[AMM_AUTHORITY_SEED], program_id)
}

/// Global AMM config account read by `initialize2`
pub fn amm_config_id(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[AMM_CONFIG_SEED], program_id).0
}

/// Vault signer of an OpenBook market: first nonce giving an off-curve address
pub fn market_authority(market_program: &Pubkey, market_id: &Pubkey) -> Result<Pubkey> {
    (0..MARKET_AUTHORITY_NONCE_LIMIT)
        .find_map(|nonce| {
            Pubkey::create_program_address(
                &[market_id.as_ref(), &nonce.to_le_bytes()],
                market_program,
            )
            .ok()
        })
        .ok_or_else(|| {
            LaunchError::InvalidMarket(format!(
                "no market authority nonce below {} for {}",
                MARKET_AUTHORITY_NONCE_LIMIT, market_id
            ))
        })
}

pub fn derive_pool_keys(inputs: &PoolKeyInputs) -> Result<PoolKeys> {
    let program_id = inputs.programs.amm_v4;
    let market_program_id = inputs.programs.openbook_market;
    let market_id = inputs.market_id;
    let (authority, nonce) = amm_authority(&program_id);

    Ok(PoolKeys {
        id: market_pda(&program_id, &market_id, AMM_ID_SEED),
        base_mint: inputs.market.base_mint,
        quote_mint: inputs.market.quote_mint,
        lp_mint: market_pda(&program_id, &market_id, LP_MINT_SEED),
        base_decimals: inputs.base_decimals,
        quote_decimals: inputs.quote_decimals,
        lp_decimals: inputs.base_decimals,
        version: 4,
        program_id,
        authority,
        nonce,
        open_orders: market_pda(&program_id, &market_id, OPEN_ORDERS_SEED),
        target_orders: market_pda(&program_id, &market_id, TARGET_ORDERS_SEED),
        base_vault: market_pda(&program_id, &market_id, BASE_VAULT_SEED),
        quote_vault: market_pda(&program_id, &market_id, QUOTE_VAULT_SEED),
        withdraw_queue: market_pda(&program_id, &market_id, WITHDRAW_QUEUE_SEED),
        lp_vault: market_pda(&program_id, &market_id, LP_VAULT_SEED),
        market_version: 3,
        market_program_id,
        market_id,
        market_authority: market_authority(&market_program_id, &market_id)?,
        market_base_vault: inputs.market.base_vault,
        market_quote_vault: inputs.market.quote_vault,
        market_bids: inputs.market.bids,
        market_asks: inputs.market.asks,
        market_event_queue: inputs.market.event_queue,
        lookup_table_account: Pubkey::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::constants::WSOL_MINT;

    fn inputs() -> PoolKeyInputs {
        let market_id = Pubkey::new_unique();
        PoolKeyInputs {
            market_id,
            market: MarketStateV3 {
                own_address: market_id,
                vault_signer_nonce: 0,
                base_mint: Pubkey::new_unique(),
                quote_mint: WSOL_MINT,
                base_vault: Pubkey::new_unique(),
                quote_vault: Pubkey::new_unique(),
                request_queue: Pubkey::new_unique(),
                event_queue: Pubkey::new_unique(),
                bids: Pubkey::new_unique(),
                asks: Pubkey::new_unique(),
                base_lot_size: 1,
                quote_lot_size: 1,
            },
            base_decimals: 6,
            quote_decimals: 9,
            programs: ProgramIds::DEVNET,
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let inputs = inputs();
        let a = derive_pool_keys(&inputs).unwrap();
        let b = derive_pool_keys(&inputs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derived_accounts_are_distinct() {
        let keys = derive_pool_keys(&inputs()).unwrap();
        let accounts = [
            keys.id,
            keys.lp_mint,
            keys.authority,
            keys.open_orders,
            keys.target_orders,
            keys.base_vault,
            keys.quote_vault,
            keys.withdraw_queue,
            keys.lp_vault,
        ];
        for (i, a) in accounts.iter().enumerate() {
            for b in accounts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_pool_id_depends_on_market() {
        let first = inputs();
        let mut second = first;
        second.market_id = Pubkey::new_unique();
        assert_ne!(
            derive_pool_keys(&first).unwrap().id,
            derive_pool_keys(&second).unwrap().id
        );
    }

    #[test]
    fn test_authority_is_shared_across_pools() {
        let first = derive_pool_keys(&inputs()).unwrap();
        let second = derive_pool_keys(&inputs()).unwrap();
        assert_eq!(first.authority, second.authority);
        assert_eq!(first.nonce, second.nonce);
    }

    #[test]
    fn test_market_authority_matches_nonce_seed() {
        let inputs = inputs();
        let keys = derive_pool_keys(&inputs).unwrap();
        let nonce = (0u64..100)
            .find(|n| {
                Pubkey::create_program_address(
                    &[inputs.market_id.as_ref(), &n.to_le_bytes()],
                    &inputs.programs.openbook_market,
                )
                .map(|k| k == keys.market_authority)
                .unwrap_or(false)
            });
        assert!(nonce.is_some());
    }

    #[test]
    fn test_pool_keys_serialize_as_camel_case_strings() {
        let keys = derive_pool_keys(&inputs()).unwrap();
        let json = serde_json::to_value(&keys).unwrap();
        assert_eq!(json["id"], keys.id.to_string());
        assert_eq!(json["marketEventQueue"], keys.market_event_queue.to_string());
        assert_eq!(json["lpDecimals"], 6);

        let back: PoolKeys = serde_json::from_value(json).unwrap();
        assert_eq!(back, keys);
    }
}
