// Shared fixtures for launch integration tests
//
// `FakeRpc` is an in-memory node: staged accounts and balances, a scripted
// number of blockhash failures, and a record of every transaction sent.
// Sent transactions confirm on the next status poll unless confirmation is
// switched off.

#![allow(dead_code)]

use async_trait::async_trait;
use raydium_launch_bundler::{
    chain::{
        bundle::{BundleRelay, BundleResult},
        constants::WSOL_MINT,
        rpc::{ChainRpc, SignatureState, SimulationReport},
    },
    data::{LaunchState, StateStore},
    dex::raydium::MarketStateV3,
    error::{LaunchError, Result},
};
use solana_sdk::{
    account::Account,
    hash::Hash,
    program_option::COption,
    program_pack::Pack,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use spl_associated_token_account::get_associated_token_address;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
pub const BASE_DECIMALS: u8 = 6;

#[derive(Default)]
pub struct FakeRpc {
    accounts: Mutex<HashMap<Pubkey, Account>>,
    lamports: Mutex<HashMap<Pubkey, u64>>,
    token_balances: Mutex<HashMap<Pubkey, u64>>,
    blockhash_failures: AtomicU32,
    blockhash_calls: AtomicU32,
    withhold_confirmation: AtomicBool,
    simulated: Mutex<Vec<VersionedTransaction>>,
    sent: Mutex<Vec<VersionedTransaction>>,
}

impl FakeRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account(&self, pubkey: Pubkey, account: Account) {
        self.accounts.lock().unwrap().insert(pubkey, account);
    }

    pub fn set_lamports(&self, owner: Pubkey, lamports: u64) {
        self.lamports.lock().unwrap().insert(owner, lamports);
    }

    /// Balance of `owner`'s associated token account for `mint`
    pub fn set_token_balance(&self, owner: &Pubkey, mint: &Pubkey, amount: u64) {
        self.token_balances
            .lock()
            .unwrap()
            .insert(get_associated_token_address(owner, mint), amount);
    }

    /// The next `count` blockhash requests fail
    pub fn fail_blockhash(&self, count: u32) {
        self.blockhash_failures.store(count, Ordering::SeqCst);
    }

    pub fn withhold_confirmation(&self) {
        self.withhold_confirmation.store(true, Ordering::SeqCst);
    }

    pub fn blockhash_calls(&self) -> u32 {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<VersionedTransaction> {
        self.sent.lock().unwrap().clone()
    }

    pub fn simulated(&self) -> Vec<VersionedTransaction> {
        self.simulated.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainRpc for FakeRpc {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>> {
        Ok(self.accounts.lock().unwrap().get(pubkey).cloned())
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64> {
        Ok(self.lamports.lock().unwrap().get(pubkey).copied().unwrap_or(0))
    }

    async fn get_token_account_balance(&self, token_account: &Pubkey) -> Result<Option<u64>> {
        Ok(self.token_balances.lock().unwrap().get(token_account).copied())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.blockhash_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.blockhash_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(LaunchError::Rpc("node is behind".to_string()));
        }
        Ok(Hash::new_unique())
    }

    async fn simulate_transaction(&self, tx: &VersionedTransaction) -> Result<SimulationReport> {
        self.simulated.lock().unwrap().push(tx.clone());
        Ok(SimulationReport {
            err: None,
            logs: vec!["Program log: ok".to_string()],
            units_consumed: Some(42_000),
        })
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature> {
        self.sent.lock().unwrap().push(tx.clone());
        Ok(tx.signatures[0])
    }

    async fn get_signature_state(&self, signature: &Signature) -> Result<Option<SignatureState>> {
        if self.withhold_confirmation.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let landed = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .any(|tx| tx.signatures[0] == *signature);
        Ok(landed.then_some(SignatureState::Confirmed { slot: 1 }))
    }
}

/// Relay that records every bundle and confirms after `confirm_on` attempts
pub struct RecordingRelay {
    confirm_on: u32,
    attempts: AtomicU32,
    bundles: Mutex<Vec<Vec<VersionedTransaction>>>,
}

impl RecordingRelay {
    pub fn confirming_on(confirm_on: u32) -> Self {
        Self {
            confirm_on,
            attempts: AtomicU32::new(0),
            bundles: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn bundles(&self) -> Vec<Vec<VersionedTransaction>> {
        self.bundles.lock().unwrap().clone()
    }
}

#[async_trait]
impl BundleRelay for RecordingRelay {
    async fn send_bundle(&self, transactions: &[VersionedTransaction]) -> Result<BundleResult> {
        self.bundles.lock().unwrap().push(transactions.to_vec());
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(BundleResult {
            confirmed: attempt >= self.confirm_on,
            tip_signature: Some(Signature::new_unique()),
            bundle_ids: vec![format!("bundle-{}", attempt)],
        })
    }
}

pub fn mint_account(decimals: u8) -> Account {
    let state = spl_token::state::Mint {
        mint_authority: COption::None,
        supply: 1_000_000_000_000,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    let mut data = vec![0u8; spl_token::state::Mint::LEN];
    spl_token::state::Mint::pack(state, &mut data).unwrap();
    Account {
        lamports: 1_461_600,
        data,
        owner: spl_token::id(),
        executable: false,
        rent_epoch: 0,
    }
}

pub fn market_account(market: &MarketStateV3, market_program: Pubkey) -> Account {
    Account {
        lamports: 1_000_000,
        data: market.encode(),
        owner: market_program,
        executable: false,
        rent_epoch: 0,
    }
}

/// A base token paired with WSOL on a staged market, an LP wallet holding
/// SOL and base tokens, and a state file naming the market
pub struct LaunchFixture {
    pub rpc: Arc<FakeRpc>,
    pub lp_wallet: Arc<Keypair>,
    pub swap_wallets: Vec<Arc<Keypair>>,
    pub base_mint: Pubkey,
    pub market_id: Pubkey,
    pub store: StateStore,
    pub dir: TempDir,
}

impl LaunchFixture {
    pub async fn new(swap_wallet_count: usize, market_program: Pubkey) -> Self {
        let rpc = Arc::new(FakeRpc::new());
        let lp_wallet = Arc::new(Keypair::new());
        let swap_wallets: Vec<_> = (0..swap_wallet_count).map(|_| Arc::new(Keypair::new())).collect();
        let base_mint = Pubkey::new_unique();
        let market_id = Pubkey::new_unique();

        let market = MarketStateV3 {
            own_address: market_id,
            vault_signer_nonce: 0,
            base_mint,
            quote_mint: WSOL_MINT,
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            event_queue: Pubkey::new_unique(),
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            base_lot_size: 1_000,
            quote_lot_size: 100,
        };
        rpc.set_account(market_id, market_account(&market, market_program));
        rpc.set_account(base_mint, mint_account(BASE_DECIMALS));
        rpc.set_account(WSOL_MINT, mint_account(9));

        rpc.set_lamports(lp_wallet.pubkey(), 10 * LAMPORTS_PER_SOL);
        rpc.set_token_balance(&lp_wallet.pubkey(), &base_mint, 1_000_000 * 10u64.pow(BASE_DECIMALS as u32));
        for wallet in &swap_wallets {
            rpc.set_lamports(wallet.pubkey(), LAMPORTS_PER_SOL);
        }

        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("data.json"));
        store
            .save(&LaunchState {
                mint: Some(base_mint),
                market_id: Some(market_id),
                ..Default::default()
            })
            .await
            .unwrap();

        Self {
            rpc,
            lp_wallet,
            swap_wallets,
            base_mint,
            market_id,
            store,
            dir,
        }
    }

    pub fn state_path(&self) -> std::path::PathBuf {
        self.dir.path().join("data.json")
    }
}

/// Fee payer of a transaction
pub fn payer_of(tx: &VersionedTransaction) -> Pubkey {
    tx.message.static_account_keys()[0]
}
