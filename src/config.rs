use anyhow::{bail, Context, Result};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::chain::constants::{ProgramIds, DEFAULT_BLOCK_ENGINE_URLS, MAX_BUNDLE_TRANSACTIONS};

/// Target cluster; selects program ids and the submission path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    /// Direct submission, one transaction at a time
    Devnet,
    /// Atomic Jito bundle
    Mainnet,
}

impl Cluster {
    pub fn program_ids(&self) -> ProgramIds {
        match self {
            Cluster::Devnet => ProgramIds::DEVNET,
            Cluster::Mainnet => ProgramIds::MAINNET,
        }
    }
}

impl FromStr for Cluster {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::Mainnet),
            other => bail!("Unknown cluster '{}', expected devnet or mainnet", other),
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cluster::Devnet => write!(f, "devnet"),
            Cluster::Mainnet => write!(f, "mainnet"),
        }
    }
}

/// Launch configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: Cluster,
    pub rpc: RpcConfig,
    pub wallet: WalletConfig,
    pub launch: LaunchConfig,
    pub jito: JitoConfig,
    pub execution: ExecutionConfig,
    pub state_file: PathBuf,
}

/// RPC endpoint configuration
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub url: String,
    pub commitment_level: String,
    pub confirm_timeout_ms: u64,
    pub lookup_table_addresses: Vec<Pubkey>,
}

/// Wallet credentials, still encoded; see `load_keypair`
#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub keypair_path: Option<String>,
    pub private_key: Option<String>,
    pub swap_private_keys: Vec<String>,
}

/// Amounts in human units
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub quote_mint_amount: f64,
    /// Fraction of the LP wallet's base balance deposited, in (0, 1]
    pub base_mint_percentage: f64,
    /// Quote spent by each swap wallet
    pub swap_sol_amount: f64,
    /// Seconds added to now for the pool open time
    pub delay_pool_open_time: u64,
}

#[derive(Debug, Clone)]
pub struct JitoConfig {
    pub fee_lamports: u64,
    pub block_engine_urls: Vec<String>,
    /// `None` retries until confirmed
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    pub compute_unit_limit: u32,
    pub compute_unit_price: u64,
}

impl RpcConfig {
    pub fn commitment(&self) -> Result<CommitmentConfig> {
        CommitmentConfig::from_str(&self.commitment_level)
            .map_err(|e| anyhow::anyhow!("Invalid COMMITMENT_LEVEL '{}': {}", self.commitment_level, e))
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let cluster: Cluster = get_env_or_default("CLUSTER", "devnet").parse()?;

        let rpc = RpcConfig {
            url: std::env::var("RPC_URL").context("RPC_URL not set")?,
            commitment_level: get_env_or_default("COMMITMENT_LEVEL", "confirmed"),
            confirm_timeout_ms: get_u64_env("CONFIRM_TIMEOUT_MS", 60_000)?,
            lookup_table_addresses: parse_pubkey_list(&get_env_or_default("LOOKUP_TABLE_ADDRESSES", ""))?,
        };

        let wallet = WalletConfig {
            keypair_path: std::env::var("LP_WALLET_KEYPAIR_PATH").ok(),
            private_key: std::env::var("LP_WALLET_PRIVATE_KEY").ok(),
            swap_private_keys: parse_string_list(&get_env_or_default("SWAP_WALLET_PRIVATE_KEYS", "")),
        };
        if wallet.keypair_path.is_none() && wallet.private_key.is_none() {
            bail!("No LP wallet configured. Set LP_WALLET_KEYPAIR_PATH or LP_WALLET_PRIVATE_KEY");
        }
        // A mainnet bundle carries the tip and the pool transaction besides the swaps
        let max_swap_wallets = MAX_BUNDLE_TRANSACTIONS - 2;
        if cluster == Cluster::Mainnet && wallet.swap_private_keys.len() > max_swap_wallets {
            bail!(
                "{} swap wallets configured, a mainnet bundle fits at most {}",
                wallet.swap_private_keys.len(),
                max_swap_wallets
            );
        }

        let launch = LaunchConfig {
            quote_mint_amount: get_f64_env_required("QUOTE_MINT_AMOUNT")?,
            base_mint_percentage: get_f64_env("INPUT_BASE_MINT_TOKENS_PERCENTAGE", 1.0)?,
            swap_sol_amount: get_f64_env_required("SWAP_SOL_AMOUNT")?,
            delay_pool_open_time: get_u64_env("DELAY_POOL_OPEN_TIME", 0)?,
        };
        if !(launch.base_mint_percentage > 0.0 && launch.base_mint_percentage <= 1.0) {
            bail!(
                "INPUT_BASE_MINT_TOKENS_PERCENTAGE must be in (0, 1], got {}",
                launch.base_mint_percentage
            );
        }

        let block_engine_urls = parse_string_list(&get_env_or_default("BLOCK_ENGINE_URLS", ""));
        let jito = JitoConfig {
            fee_lamports: get_u64_env("JITO_FEE_LAMPORTS", 1_000_000)?,
            block_engine_urls: if block_engine_urls.is_empty() {
                DEFAULT_BLOCK_ENGINE_URLS.iter().map(|s| s.to_string()).collect()
            } else {
                block_engine_urls
            },
            max_attempts: std::env::var("BUNDLE_MAX_ATTEMPTS")
                .ok()
                .map(|v| v.parse().context("Failed to parse BUNDLE_MAX_ATTEMPTS as u32"))
                .transpose()?,
        };

        let execution = ExecutionConfig {
            compute_unit_limit: get_u32_env("COMPUTE_UNIT_LIMIT", 400_000)?,
            compute_unit_price: get_u64_env("COMPUTE_UNIT_PRICE", 300_000)?,
        };

        let config = Config {
            cluster,
            rpc,
            wallet,
            launch,
            jito,
            execution,
            state_file: PathBuf::from(get_env_or_default("STATE_FILE", "data.json")),
        };
        config.rpc.commitment()?;

        Ok(config)
    }
}

/// Load the LP wallet keypair from file or base58 private key
pub fn load_keypair(wallet: &WalletConfig) -> Result<Arc<Keypair>> {
    if let Some(ref keypair_path) = wallet.keypair_path {
        info!("Loading LP keypair from file: {}", keypair_path);
        read_keypair_file(keypair_path)
            .map(Arc::new)
            .map_err(|e| anyhow::anyhow!("Failed to read keypair file: {}", e))
    } else if let Some(ref private_key) = wallet.private_key {
        info!("Loading LP keypair from environment variable");
        decode_keypair(private_key).map(Arc::new)
    } else {
        bail!("No wallet configuration found. Set LP_WALLET_KEYPAIR_PATH or LP_WALLET_PRIVATE_KEY")
    }
}

/// Swap wallets in configured order
pub fn load_swap_keypairs(wallet: &WalletConfig) -> Result<Vec<Arc<Keypair>>> {
    wallet
        .swap_private_keys
        .iter()
        .enumerate()
        .map(|(i, key)| {
            decode_keypair(key)
                .map(Arc::new)
                .with_context(|| format!("Invalid swap wallet #{}", i + 1))
        })
        .collect()
}

fn decode_keypair(private_key: &str) -> Result<Keypair> {
    let decoded = bs58::decode(private_key.trim())
        .into_vec()
        .context("Failed to decode base58 private key")?;
    Keypair::from_bytes(&decoded).context("Failed to create keypair from bytes")
}

// ============================================================================
// Helper Functions for Environment Variable Parsing
// ============================================================================

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_u32_env(key: &str, default: u32) -> Result<u32> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .context(format!("Failed to parse {} as u32", key))
}

fn get_u64_env(key: &str, default: u64) -> Result<u64> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .context(format!("Failed to parse {} as u64", key))
}

fn get_f64_env(key: &str, default: f64) -> Result<f64> {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .context(format!("Failed to parse {} as f64", key))
}

fn get_f64_env_required(key: &str) -> Result<f64> {
    std::env::var(key)
        .context(format!("{} not set", key))?
        .parse()
        .context(format!("Failed to parse {} as f64", key))
}

/// Parse comma-separated string list
fn parse_string_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse comma-separated list of pubkeys
fn parse_pubkey_list(input: &str) -> Result<Vec<Pubkey>> {
    parse_string_list(input)
        .iter()
        .map(|s| Pubkey::from_str(s).context(format!("Failed to parse '{}' as Pubkey", s)))
        .collect()
}
