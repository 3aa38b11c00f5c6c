// Direct transaction submission
//
// Used on devnet where there is no block engine:
// 1. Simulate for diagnostics (logs and compute units)
// 2. Send to the RPC node
// 3. Poll the signature until confirmed or the timeout elapses
// 4. Log the explorer URL once per confirmed signature

use solana_sdk::{signature::Signature, transaction::VersionedTransaction};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, error, info, warn};

use super::rpc::{ChainRpc, SignatureState, SimulationReport};
use crate::config::Cluster;
use crate::error::Result;

pub const POLL_INTERVAL: Duration = Duration::from_millis(400);

/// Result of a direct submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendResult {
    pub signature: Signature,
    pub confirmed: bool,
    pub slot: Option<u64>,
    pub confirmation_time_ms: u64,
    /// Set only for confirmed signatures
    pub explorer_url: Option<String>,
    pub error: Option<String>,
}

/// Solscan link for a signature on the given cluster
pub fn explorer_url(signature: &Signature, cluster: Cluster) -> String {
    match cluster {
        Cluster::Devnet => format!("https://solscan.io/tx/{}?cluster=devnet", signature),
        Cluster::Mainnet => format!("https://solscan.io/tx/{}", signature),
    }
}

/// Sends signed transactions straight to the RPC node
pub struct TransactionSender {
    rpc: Arc<dyn ChainRpc>,
    cluster: Cluster,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl TransactionSender {
    pub fn new(rpc: Arc<dyn ChainRpc>, cluster: Cluster, confirmation_timeout: Duration) -> Self {
        Self {
            rpc,
            cluster,
            confirmation_timeout,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Simulate and log the outcome; simulation failures are reported, not raised
    pub async fn simulate(&self, tx: &VersionedTransaction) -> Result<SimulationReport> {
        let report = self.rpc.simulate_transaction(tx).await?;

        match &report.err {
            None => info!(
                "✅ Simulation successful, compute units consumed: {}",
                report.units_consumed.unwrap_or(0)
            ),
            Some(err) => {
                error!("❌ Simulation failed with error: {}", err);
                for (idx, log) in report.logs.iter().enumerate() {
                    error!("  Log[{}]: {}", idx, log);
                }
            }
        }
        for (idx, log) in report.logs.iter().enumerate() {
            debug!("  [{}] {}", idx, log);
        }

        Ok(report)
    }

    /// Send and wait for confirmation
    pub async fn execute(&self, tx: &VersionedTransaction) -> Result<SendResult> {
        let start_time = Instant::now();
        let signature = self.rpc.send_transaction(tx).await?;
        debug!("Transaction sent: {}", signature);

        let (confirmed, slot, error) = await_confirmation(
            self.rpc.as_ref(),
            &signature,
            self.confirmation_timeout,
            self.poll_interval,
        )
        .await;
        let confirmation_time_ms = start_time.elapsed().as_millis() as u64;

        let explorer_url = if confirmed {
            let url = explorer_url(&signature, self.cluster);
            info!("🔗 {}", url);
            Some(url)
        } else {
            warn!(
                "Transaction {} not confirmed: {}",
                signature,
                error.as_deref().unwrap_or("unknown")
            );
            None
        };

        Ok(SendResult {
            signature,
            confirmed,
            slot,
            confirmation_time_ms,
            explorer_url,
            error,
        })
    }
}

/// Poll a signature until it lands, fails or `limit` elapses.
///
/// Returns `(confirmed, slot, error)`; status lookups that error are retried.
pub async fn await_confirmation(
    rpc: &dyn ChainRpc,
    signature: &Signature,
    limit: Duration,
    poll_interval: Duration,
) -> (bool, Option<u64>, Option<String>) {
    let result = timeout(limit, async {
        loop {
            match rpc.get_signature_state(signature).await {
                Ok(Some(SignatureState::Confirmed { slot })) => return (true, Some(slot), None),
                Ok(Some(SignatureState::Failed(err))) => return (false, None, Some(err)),
                Ok(_) => {}
                Err(e) => debug!("Error checking signature status: {}", e),
            }
            sleep(poll_interval).await;
        }
    })
    .await;

    result.unwrap_or_else(|_| {
        (
            false,
            None,
            Some(format!("confirmation timeout after {}ms", limit.as_millis())),
        )
    })
}
