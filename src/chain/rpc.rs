// RPC seam for the launch flow.
//
// Everything the orchestrator needs from a Solana node goes through
// `ChainRpc`, so the run can be driven against an in-memory node in tests.

use async_trait::async_trait;
use solana_client::client_error::ClientErrorKind;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcSimulateTransactionConfig};
use solana_client::rpc_request::RpcError;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::TransactionConfirmationStatus;
use tracing::debug;

use crate::error::Result;

/// JSON-RPC code returned by `getTokenAccountBalance` for an unknown account
const INVALID_PARAMS_CODE: i64 = -32602;

/// Outcome of `simulateTransaction`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub err: Option<String>,
    pub logs: Vec<String>,
    pub units_consumed: Option<u64>,
}

impl SimulationReport {
    pub fn succeeded(&self) -> bool {
        self.err.is_none()
    }
}

/// Status of a submitted signature as seen by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    Processed,
    Confirmed { slot: u64 },
    Failed(String),
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// `getAccountInfo`; `None` when the account does not exist
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>>;

    /// `getBalance` in lamports
    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64>;

    /// `getTokenAccountBalance` raw amount; `None` when the account does not exist
    async fn get_token_account_balance(&self, token_account: &Pubkey) -> Result<Option<u64>>;

    async fn get_latest_blockhash(&self) -> Result<Hash>;

    async fn simulate_transaction(&self, tx: &VersionedTransaction) -> Result<SimulationReport>;

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature>;

    /// `getSignatureStatuses` for a single signature; `None` while unknown
    async fn get_signature_state(&self, signature: &Signature) -> Result<Option<SignatureState>>;
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn get_account(&self, pubkey: &Pubkey) -> Result<Option<Account>> {
        let response = self
            .get_account_with_commitment(pubkey, self.commitment())
            .await?;
        Ok(response.value)
    }

    async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64> {
        Ok(RpcClient::get_balance(self, pubkey).await?)
    }

    async fn get_token_account_balance(&self, token_account: &Pubkey) -> Result<Option<u64>> {
        match RpcClient::get_token_account_balance(self, token_account).await {
            Ok(ui_amount) => {
                let raw = ui_amount.amount.parse::<u64>().map_err(|e| {
                    crate::error::LaunchError::Rpc(format!(
                        "unparseable token amount '{}': {}",
                        ui_amount.amount, e
                    ))
                })?;
                Ok(Some(raw))
            }
            Err(e) => match e.kind() {
                ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. })
                    if *code == INVALID_PARAMS_CODE =>
                {
                    debug!("Token account {} not found", token_account);
                    Ok(None)
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(RpcClient::get_latest_blockhash(self).await?)
    }

    async fn simulate_transaction(&self, tx: &VersionedTransaction) -> Result<SimulationReport> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: false,
            commitment: Some(CommitmentConfig::processed()),
            ..Default::default()
        };

        let value = self
            .simulate_transaction_with_config(tx, config)
            .await?
            .value;

        Ok(SimulationReport {
            err: value.err.map(|e| format!("{:?}", e)),
            logs: value.logs.unwrap_or_default(),
            units_consumed: value.units_consumed,
        })
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature> {
        // Already simulated by the caller
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            ..Default::default()
        };
        Ok(self.send_transaction_with_config(tx, config).await?)
    }

    async fn get_signature_state(&self, signature: &Signature) -> Result<Option<SignatureState>> {
        let response = self.get_signature_statuses(&[*signature]).await?;

        let Some(Some(status)) = response.value.into_iter().next() else {
            return Ok(None);
        };

        if let Some(err) = status.err {
            return Ok(Some(SignatureState::Failed(format!("{:?}", err))));
        }

        let state = match status.confirmation_status {
            Some(TransactionConfirmationStatus::Confirmed)
            | Some(TransactionConfirmationStatus::Finalized) => {
                SignatureState::Confirmed { slot: status.slot }
            }
            _ => SignatureState::Processed,
        };
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulation_report_success() {
        let report = SimulationReport::default();
        assert!(report.succeeded());

        let failed = SimulationReport {
            err: Some("InstructionError(0, Custom(1))".to_string()),
            ..Default::default()
        };
        assert!(!failed.succeeded());
    }
}
