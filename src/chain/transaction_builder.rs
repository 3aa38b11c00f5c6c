// Versioned transaction assembly
//
// Packs instruction groups into v0 transactions that fit the packet limit,
// compressing account keys through the address lookup tables in the cache.
// A group that does not fit is split greedily across consecutive
// transactions in instruction order.

use solana_sdk::{
    address_lookup_table::{state::AddressLookupTable, AddressLookupTableAccount},
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    packet::PACKET_DATA_SIZE,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::VersionedTransaction,
};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

use super::rpc::ChainRpc;
use crate::dex::raydium::InnerTransaction;
use crate::error::{LaunchError, Result};
use crate::utils::RetryPolicy;

/// Lookup tables loaded once per run
#[derive(Debug, Clone, Default)]
pub struct AddressLookupTableCache {
    tables: HashMap<Pubkey, AddressLookupTableAccount>,
}

impl AddressLookupTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: AddressLookupTableAccount) {
        self.tables.insert(table.key, table);
    }

    /// Fetch and decode each table; missing tables are skipped with a warning
    pub async fn load(rpc: &dyn ChainRpc, addresses: &[Pubkey]) -> Result<Self> {
        let mut cache = Self::new();

        for address in addresses {
            let Some(account) = rpc.get_account(address).await? else {
                warn!("Lookup table {} not found, skipping", address);
                continue;
            };

            let table = AddressLookupTable::deserialize(&account.data).map_err(|e| {
                LaunchError::Compile(format!("lookup table {}: {:?}", address, e))
            })?;

            cache.insert(AddressLookupTableAccount {
                key: *address,
                addresses: table.addresses.to_vec(),
            });
        }

        info!("Loaded {} address lookup tables", cache.len());
        Ok(cache)
    }

    pub fn accounts(&self) -> Vec<AddressLookupTableAccount> {
        self.tables.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Latest blockhash with one retry; a second failure is `PrepareTransaction`
pub async fn prepare_recent_blockhash(rpc: &dyn ChainRpc) -> Result<Hash> {
    RetryPolicy::single_retry()
        .retry_async(|| rpc.get_latest_blockhash())
        .await
        .map_err(|get_latest_blockhash_error| {
            error!(
                "Failed to fetch latest blockhash: {}",
                get_latest_blockhash_error
            );
            LaunchError::PrepareTransaction
        })
}

/// Packs instruction groups into unsigned v0 transactions
pub struct TransactionAssembler {
    payer: Pubkey,
    lookup_tables: Vec<AddressLookupTableAccount>,
    recent_blockhash: Hash,
}

impl TransactionAssembler {
    pub fn new(payer: Pubkey, lookup_tables: &AddressLookupTableCache, recent_blockhash: Hash) -> Self {
        Self {
            payer,
            lookup_tables: lookup_tables.accounts(),
            recent_blockhash,
        }
    }

    fn compile(&self, instructions: &[Instruction]) -> Result<VersionedTransaction> {
        let message = v0::Message::try_compile(
            &self.payer,
            instructions,
            &self.lookup_tables,
            self.recent_blockhash,
        )
        .map_err(|e| LaunchError::Compile(e.to_string()))?;

        let signature_count = usize::from(message.header.num_required_signatures);
        Ok(VersionedTransaction {
            signatures: vec![Signature::default(); signature_count],
            message: VersionedMessage::V0(message),
        })
    }

    /// Compile, returning the serialized size and whether it fits a packet
    fn compile_within_limit(&self, instructions: &[Instruction]) -> Result<(VersionedTransaction, usize, bool)> {
        let tx = self.compile(instructions)?;
        let size = serialized_size(&tx)?;
        Ok((tx, size, size <= PACKET_DATA_SIZE))
    }

    /// One transaction per group when it fits, otherwise consecutive chunks
    pub fn build_simple_transactions(&self, inner: &[InnerTransaction]) -> Result<Vec<VersionedTransaction>> {
        let mut transactions = Vec::new();

        for group in inner {
            let (tx, size, fits) = self.compile_within_limit(&group.instructions)?;
            if fits {
                debug!(
                    "Packed {} instructions into one transaction ({} bytes)",
                    group.instructions.len(),
                    size
                );
                transactions.push(tx);
                continue;
            }

            debug!(
                "Group of {} instructions is {} bytes, splitting",
                group.instructions.len(),
                size
            );
            transactions.extend(self.split_group(&group.instructions)?);
        }

        Ok(transactions)
    }

    fn split_group(&self, instructions: &[Instruction]) -> Result<Vec<VersionedTransaction>> {
        let mut transactions = Vec::new();
        let mut current: Vec<Instruction> = Vec::new();
        let mut current_tx: Option<VersionedTransaction> = None;

        for (index, ix) in instructions.iter().enumerate() {
            current.push(ix.clone());
            let (tx, size, fits) = self.compile_within_limit(&current)?;
            if fits {
                current_tx = Some(tx);
                continue;
            }

            current.pop();
            let Some(done) = current_tx.take() else {
                return Err(LaunchError::TransactionTooLarge { index, size });
            };
            transactions.push(done);

            current = vec![ix.clone()];
            let (tx, size, fits) = self.compile_within_limit(&current)?;
            if !fits {
                return Err(LaunchError::TransactionTooLarge { index, size });
            }
            current_tx = Some(tx);
        }

        if let Some(tx) = current_tx {
            transactions.push(tx);
        }
        Ok(transactions)
    }
}

pub fn serialized_size(tx: &VersionedTransaction) -> Result<usize> {
    bincode::serialized_size(tx)
        .map(|size| size as usize)
        .map_err(|e| LaunchError::Compile(e.to_string()))
}

/// Sign an assembled transaction with its designated keypairs
pub fn sign_transaction(tx: &VersionedTransaction, signers: &[&Keypair]) -> Result<VersionedTransaction> {
    VersionedTransaction::try_new(tx.message.clone(), signers)
        .map_err(|e| LaunchError::Signing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{signer::Signer, system_instruction};

    fn transfers(payer: &Pubkey, count: usize) -> Vec<Instruction> {
        (0..count)
            .map(|_| system_instruction::transfer(payer, &Pubkey::new_unique(), 1))
            .collect()
    }

    #[test]
    fn test_small_group_packs_into_one_transaction() {
        let payer = Keypair::new();
        let assembler = TransactionAssembler::new(payer.pubkey(), &AddressLookupTableCache::new(), Hash::new_unique());

        let txs = assembler
            .build_simple_transactions(&[InnerTransaction::new(transfers(&payer.pubkey(), 3))])
            .unwrap();

        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].signatures.len(), 1);
        assert!(serialized_size(&txs[0]).unwrap() <= PACKET_DATA_SIZE);
    }

    #[test]
    fn test_oversized_group_is_split_in_order() {
        let payer = Keypair::new();
        let assembler = TransactionAssembler::new(payer.pubkey(), &AddressLookupTableCache::new(), Hash::new_unique());
        let instructions = transfers(&payer.pubkey(), 40);

        let txs = assembler
            .build_simple_transactions(&[InnerTransaction::new(instructions.clone())])
            .unwrap();

        assert!(txs.len() > 1);
        let mut packed = 0;
        for tx in &txs {
            assert!(serialized_size(tx).unwrap() <= PACKET_DATA_SIZE);
            packed += tx.message.instructions().len();
        }
        assert_eq!(packed, instructions.len());
    }

    #[test]
    fn test_single_instruction_too_large_is_rejected() {
        let payer = Keypair::new();
        let assembler = TransactionAssembler::new(payer.pubkey(), &AddressLookupTableCache::new(), Hash::new_unique());
        let huge = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![],
            data: vec![7u8; PACKET_DATA_SIZE],
        };

        let err = assembler
            .build_simple_transactions(&[InnerTransaction::new(vec![huge])])
            .unwrap_err();
        assert!(matches!(err, LaunchError::TransactionTooLarge { index: 0, .. }));
    }

    #[test]
    fn test_lookup_table_shrinks_transaction() {
        let payer = Keypair::new();
        let instructions = transfers(&payer.pubkey(), 10);
        let destinations: Vec<Pubkey> = instructions
            .iter()
            .map(|ix| ix.accounts[1].pubkey)
            .collect();

        let mut cache = AddressLookupTableCache::new();
        cache.insert(AddressLookupTableAccount {
            key: Pubkey::new_unique(),
            addresses: destinations,
        });

        let blockhash = Hash::new_unique();
        let plain = TransactionAssembler::new(payer.pubkey(), &AddressLookupTableCache::new(), blockhash)
            .build_simple_transactions(&[InnerTransaction::new(instructions.clone())])
            .unwrap();
        let compact = TransactionAssembler::new(payer.pubkey(), &cache, blockhash)
            .build_simple_transactions(&[InnerTransaction::new(instructions)])
            .unwrap();

        assert!(serialized_size(&compact[0]).unwrap() < serialized_size(&plain[0]).unwrap());
    }

    #[test]
    fn test_sign_transaction_fills_signature() {
        let payer = Keypair::new();
        let assembler = TransactionAssembler::new(payer.pubkey(), &AddressLookupTableCache::new(), Hash::new_unique());
        let tx = assembler
            .build_simple_transactions(&[InnerTransaction::new(transfers(&payer.pubkey(), 1))])
            .unwrap()
            .remove(0);

        let signed = sign_transaction(&tx, &[&payer]).unwrap();
        assert_ne!(signed.signatures[0], Signature::default());
        assert!(signed.verify_with_results().iter().all(|ok| *ok));
    }
}
