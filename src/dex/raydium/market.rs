//! OpenBook (Serum v3) market account decoding.
//!
//! Layout: 5-byte "serum" head, account flags, then the fields below,
//! 7 bytes of tail padding. Total 388 bytes.

use solana_sdk::pubkey::Pubkey;

use crate::error::{LaunchError, Result};

pub const MARKET_STATE_V3_LEN: usize = 388;

const OWN_ADDRESS_OFFSET: usize = 13;
const VAULT_SIGNER_NONCE_OFFSET: usize = 45;
const BASE_MINT_OFFSET: usize = 53;
const QUOTE_MINT_OFFSET: usize = 85;
const BASE_VAULT_OFFSET: usize = 117;
const QUOTE_VAULT_OFFSET: usize = 165;
const REQUEST_QUEUE_OFFSET: usize = 221;
const EVENT_QUEUE_OFFSET: usize = 253;
const BIDS_OFFSET: usize = 285;
const ASKS_OFFSET: usize = 317;
const BASE_LOT_SIZE_OFFSET: usize = 349;
const QUOTE_LOT_SIZE_OFFSET: usize = 357;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketStateV3 {
    pub own_address: Pubkey,
    pub vault_signer_nonce: u64,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
}

impl MarketStateV3 {
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < MARKET_STATE_V3_LEN {
            return Err(LaunchError::InvalidMarket(format!(
                "market account has {} bytes, expected {}",
                data.len(),
                MARKET_STATE_V3_LEN
            )));
        }

        Ok(Self {
            own_address: read_pubkey(data, OWN_ADDRESS_OFFSET),
            vault_signer_nonce: read_u64(data, VAULT_SIGNER_NONCE_OFFSET),
            base_mint: read_pubkey(data, BASE_MINT_OFFSET),
            quote_mint: read_pubkey(data, QUOTE_MINT_OFFSET),
            base_vault: read_pubkey(data, BASE_VAULT_OFFSET),
            quote_vault: read_pubkey(data, QUOTE_VAULT_OFFSET),
            request_queue: read_pubkey(data, REQUEST_QUEUE_OFFSET),
            event_queue: read_pubkey(data, EVENT_QUEUE_OFFSET),
            bids: read_pubkey(data, BIDS_OFFSET),
            asks: read_pubkey(data, ASKS_OFFSET),
            base_lot_size: read_u64(data, BASE_LOT_SIZE_OFFSET),
            quote_lot_size: read_u64(data, QUOTE_LOT_SIZE_OFFSET),
        })
    }

    /// Encode into a zeroed 388-byte buffer, used to stage market accounts
    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; MARKET_STATE_V3_LEN];
        data[..5].copy_from_slice(b"serum");
        data[MARKET_STATE_V3_LEN - 7..].copy_from_slice(b"padding");
        write_pubkey(&mut data, OWN_ADDRESS_OFFSET, &self.own_address);
        write_u64(&mut data, VAULT_SIGNER_NONCE_OFFSET, self.vault_signer_nonce);
        write_pubkey(&mut data, BASE_MINT_OFFSET, &self.base_mint);
        write_pubkey(&mut data, QUOTE_MINT_OFFSET, &self.quote_mint);
        write_pubkey(&mut data, BASE_VAULT_OFFSET, &self.base_vault);
        write_pubkey(&mut data, QUOTE_VAULT_OFFSET, &self.quote_vault);
        write_pubkey(&mut data, REQUEST_QUEUE_OFFSET, &self.request_queue);
        write_pubkey(&mut data, EVENT_QUEUE_OFFSET, &self.event_queue);
        write_pubkey(&mut data, BIDS_OFFSET, &self.bids);
        write_pubkey(&mut data, ASKS_OFFSET, &self.asks);
        write_u64(&mut data, BASE_LOT_SIZE_OFFSET, self.base_lot_size);
        write_u64(&mut data, QUOTE_LOT_SIZE_OFFSET, self.quote_lot_size);
        data
    }
}

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::new_from_array(bytes)
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn write_pubkey(data: &mut [u8], offset: usize, key: &Pubkey) {
    data[offset..offset + 32].copy_from_slice(key.as_ref());
}

fn write_u64(data: &mut [u8], offset: usize, value: u64) {
    data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MarketStateV3 {
        MarketStateV3 {
            own_address: Pubkey::new_unique(),
            vault_signer_nonce: 3,
            base_mint: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            event_queue: Pubkey::new_unique(),
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            base_lot_size: 1_000_000,
            quote_lot_size: 10_000,
        }
    }

    #[test]
    fn test_decode_reads_fields_at_layout_offsets() {
        let market = sample();
        let data = market.encode();

        assert_eq!(&data[..5], b"serum");
        assert_eq!(&data[BASE_MINT_OFFSET..BASE_MINT_OFFSET + 32], market.base_mint.as_ref());
        assert_eq!(MarketStateV3::decode(&data).unwrap(), market);
    }

    #[test]
    fn test_decode_rejects_short_account() {
        let err = MarketStateV3::decode(&[0u8; 100]).unwrap_err();
        assert!(matches!(err, LaunchError::InvalidMarket(_)));
    }
}
