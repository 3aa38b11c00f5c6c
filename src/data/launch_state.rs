// Persisted launch state
//
// A single JSON document (default `data.json`) shared between runs: the
// operator seeds `mint` and `marketId`, the launch writes back `poolId`,
// `poolKeys` and the LP wallet, and `burn-lp` flips `removed`.
//
// The whole document is rewritten on every save. Keys this crate does not
// know about are carried through untouched.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::dex::raydium::PoolKeys;
use crate::error::{LaunchError, Result};
use crate::utils::serde_helpers::option_pubkey_string;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchState {
    /// Base token mint
    #[serde(default, with = "option_pubkey_string", skip_serializing_if = "Option::is_none")]
    pub mint: Option<Pubkey>,
    /// OpenBook market the pool is created on
    #[serde(default, with = "option_pubkey_string", skip_serializing_if = "Option::is_none")]
    pub market_id: Option<Pubkey>,
    #[serde(default, with = "option_pubkey_string", skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<Pubkey>,
    /// LP wallet public key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_kp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_keys: Option<PoolKeys>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LaunchState {
    /// Record the resolved pool so later commands can find it
    pub fn record_pool(&mut self, pool_keys: &PoolKeys, lp_wallet: &Pubkey) {
        self.pool_id = Some(pool_keys.id);
        self.market_id = Some(pool_keys.market_id);
        self.mint = Some(pool_keys.base_mint);
        self.main_kp = Some(lp_wallet.to_string());
        self.pool_keys = Some(pool_keys.clone());
    }
}

/// Reads and overwrites the state file
pub struct StateStore {
    file_path: PathBuf,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Missing file reads as an empty state
    pub async fn load(&self) -> Result<LaunchState> {
        let contents = match tokio::fs::read_to_string(&self.file_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "State file does not exist yet: {}",
                    self.file_path.display()
                );
                return Ok(LaunchState::default());
            }
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(LaunchState::default());
        }

        serde_json::from_str(&contents).map_err(|e| {
            LaunchError::State(format!("{}: {}", self.file_path.display(), e))
        })
    }

    pub async fn save(&self, state: &LaunchState) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.file_path, json).await?;

        debug!("Saved launch state to {}", self.file_path.display());
        Ok(())
    }
}
