//! Atomic bundle submission through Jito block engines.
//!
//! The relay prepends a tip transfer to the caller's transactions, fans the
//! bundle out to every configured block engine and then confirms the tip
//! signature. A landed tip means the whole bundle landed.

use async_trait::async_trait;
use futures::future::join_all;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use solana_sdk::{
    hash::Hash,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    system_instruction,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use super::constants::{JITO_TIP_ACCOUNTS, MAX_BUNDLE_TRANSACTIONS};
use super::rpc::ChainRpc;
use super::transaction_sender::{await_confirmation, POLL_INTERVAL};
use crate::error::{LaunchError, Result};

/// Outcome of one bundle submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleResult {
    pub confirmed: bool,
    pub tip_signature: Option<Signature>,
    /// Bundle ids returned by the engines that accepted the bundle
    pub bundle_ids: Vec<String>,
}

impl BundleResult {
    pub fn rejected() -> Self {
        Self {
            confirmed: false,
            tip_signature: None,
            bundle_ids: Vec::new(),
        }
    }
}

/// Submits an ordered list of signed transactions as one atomic unit
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BundleRelay: Send + Sync {
    async fn send_bundle(&self, transactions: &[VersionedTransaction]) -> Result<BundleResult>;
}

#[derive(Debug, Deserialize)]
struct SendBundleResponse {
    result: Option<String>,
    error: Option<serde_json::Value>,
}

pub struct JitoRelay {
    client: Client,
    rpc: Arc<dyn ChainRpc>,
    tip_payer: Arc<Keypair>,
    tip_lamports: u64,
    endpoints: Vec<String>,
    confirmation_timeout: Duration,
}

impl JitoRelay {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        tip_payer: Arc<Keypair>,
        tip_lamports: u64,
        endpoints: Vec<String>,
        confirmation_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LaunchError::Relay(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rpc,
            tip_payer,
            tip_lamports,
            endpoints,
            confirmation_timeout,
        })
    }

    /// Signed transfer from the tip payer to a random tip account
    pub fn build_tip_transaction(&self, recent_blockhash: Hash) -> Result<VersionedTransaction> {
        let tip_account = JITO_TIP_ACCOUNTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(JITO_TIP_ACCOUNTS[0]);
        build_tip_transaction(&self.tip_payer, &tip_account, self.tip_lamports, recent_blockhash)
    }

    async fn post_bundle(&self, endpoint: &str, payload: &serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LaunchError::Relay(format!(
                "{} returned {}: {}",
                endpoint, status, error_text
            )));
        }

        let body: SendBundleResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(LaunchError::Relay(format!("{} rejected bundle: {}", endpoint, error)));
        }
        body.result
            .ok_or_else(|| LaunchError::Relay(format!("{} returned no bundle id", endpoint)))
    }
}

#[async_trait]
impl BundleRelay for JitoRelay {
    async fn send_bundle(&self, transactions: &[VersionedTransaction]) -> Result<BundleResult> {
        let count = transactions.len() + 1;
        if count > MAX_BUNDLE_TRANSACTIONS {
            return Err(LaunchError::BundleTooLarge {
                count,
                max: MAX_BUNDLE_TRANSACTIONS,
            });
        }
        let Some(first) = transactions.first() else {
            return Err(LaunchError::Relay("empty bundle".to_string()));
        };

        let tip_tx = self.build_tip_transaction(*first.message.recent_blockhash())?;
        let tip_signature = tip_tx.signatures[0];

        let mut bundle = Vec::with_capacity(count);
        bundle.push(tip_tx);
        bundle.extend_from_slice(transactions);
        let payload = send_bundle_payload(&bundle)?;

        let responses = join_all(
            self.endpoints
                .iter()
                .map(|endpoint| self.post_bundle(endpoint, &payload)),
        )
        .await;

        let mut bundle_ids = Vec::new();
        for (endpoint, response) in self.endpoints.iter().zip(responses) {
            match response {
                Ok(bundle_id) => {
                    debug!("{} accepted bundle {}", endpoint, bundle_id);
                    bundle_ids.push(bundle_id);
                }
                Err(e) => warn!("{}", e),
            }
        }

        if bundle_ids.is_empty() {
            warn!("No block engine accepted the bundle");
            return Ok(BundleResult::rejected());
        }
        info!(
            "Bundle accepted by {}/{} block engines, tip {}",
            bundle_ids.len(),
            self.endpoints.len(),
            tip_signature
        );

        let (confirmed, slot, error) = await_confirmation(
            self.rpc.as_ref(),
            &tip_signature,
            self.confirmation_timeout,
            POLL_INTERVAL,
        )
        .await;
        match (confirmed, slot) {
            (true, Some(slot)) => info!("Bundle landed in slot {}", slot),
            _ => warn!(
                "Bundle tip {} not confirmed: {}",
                tip_signature,
                error.as_deref().unwrap_or("unknown")
            ),
        }

        Ok(BundleResult {
            confirmed,
            tip_signature: Some(tip_signature),
            bundle_ids,
        })
    }
}

pub fn build_tip_transaction(
    payer: &Keypair,
    tip_account: &Pubkey,
    lamports: u64,
    recent_blockhash: Hash,
) -> Result<VersionedTransaction> {
    let instruction = system_instruction::transfer(&payer.pubkey(), tip_account, lamports);
    let message = v0::Message::try_compile(&payer.pubkey(), &[instruction], &[], recent_blockhash)
        .map_err(|e| LaunchError::Compile(e.to_string()))?;
    VersionedTransaction::try_new(VersionedMessage::V0(message), &[payer])
        .map_err(|e| LaunchError::Signing(e.to_string()))
}

/// `sendBundle` JSON-RPC body with base58 encoded transactions
pub fn send_bundle_payload(transactions: &[VersionedTransaction]) -> Result<serde_json::Value> {
    let encoded = transactions
        .iter()
        .map(|tx| {
            bincode::serialize(tx)
                .map(|bytes| bs58::encode(bytes).into_string())
                .map_err(|e| LaunchError::Relay(format!("failed to serialize transaction: {}", e)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "sendBundle",
        "params": [encoded],
    }))
}
