use serde::{Deserialize, Serialize};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::VersionedTransaction,
};
use std::fmt;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::chain::balance::{decode_mint, fetch_account, get_lamports, get_mint_balance, output_balance, MintInfo};
use crate::chain::bundle::{BundleRelay, BundleResult};
use crate::chain::constants::ProgramIds;
use crate::chain::rpc::ChainRpc;
use crate::chain::transaction_builder::{
    prepare_recent_blockhash, sign_transaction, AddressLookupTableCache, TransactionAssembler,
};
use crate::chain::transaction_sender::TransactionSender;
use crate::config::{Cluster, Config};
use crate::data::StateStore;
use crate::dex::raydium::{
    build_create_pool_instructions, build_swap_buy_instructions, derive_pool_keys,
    ComputeBudgetConfig, CreatePoolParams, InnerTransaction, MarketStateV3, PoolKeyInputs, PoolKeys,
};
use crate::error::{LaunchError, Result};
use crate::utils::amount::{ensure_sufficient, fraction_of, ui_to_raw};
use crate::utils::TokenAmount;

/// Minimum base received per buy, in raw units
const MIN_BUY_AMOUNT_OUT: u64 = 1;

/// Terminal result of a launch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Done,
    /// Preconditions not met; nothing was submitted
    Aborted(String),
    Err(String),
}

/// Progress of a launch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStage {
    Idle,
    PoolKeysResolved,
    PoolTxBuilt,
    PoolSubmitted,
    SwapTxBuilt(usize),
    BundleSubmitted,
    Done,
}

impl fmt::Display for LaunchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchStage::SwapTxBuilt(i) => write!(f, "SwapTxBuilt({})", i),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Run parameters resolved from `Config`
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub cluster: Cluster,
    pub programs: ProgramIds,
    pub quote_mint_amount: f64,
    pub base_mint_percentage: f64,
    pub swap_sol_amount: f64,
    pub delay_pool_open_time: u64,
    pub compute_budget: ComputeBudgetConfig,
    pub lookup_table_addresses: Vec<Pubkey>,
    pub confirm_timeout: Duration,
    pub bundle_max_attempts: Option<u32>,
    pub bundle_retry_delay: Duration,
}

impl LaunchSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cluster: config.cluster,
            programs: config.cluster.program_ids(),
            quote_mint_amount: config.launch.quote_mint_amount,
            base_mint_percentage: config.launch.base_mint_percentage,
            swap_sol_amount: config.launch.swap_sol_amount,
            delay_pool_open_time: config.launch.delay_pool_open_time,
            compute_budget: ComputeBudgetConfig {
                units: config.execution.compute_unit_limit,
                micro_lamports: config.execution.compute_unit_price,
            },
            lookup_table_addresses: config.rpc.lookup_table_addresses.clone(),
            confirm_timeout: Duration::from_millis(config.rpc.confirm_timeout_ms),
            bundle_max_attempts: config.jito.max_attempts,
            bundle_retry_delay: Duration::from_secs(1),
        }
    }
}

/// Market and mint data the pool is derived from
struct ResolvedMarket {
    market_id: Pubkey,
    market: MarketStateV3,
    base: MintInfo,
    quote: MintInfo,
}

/// Creates the pool, funds it and buys from every swap wallet
pub struct LaunchExecutor {
    rpc: Arc<dyn ChainRpc>,
    relay: Arc<dyn BundleRelay>,
    store: StateStore,
    sender: TransactionSender,
    lp_wallet: Arc<Keypair>,
    swap_wallets: Vec<Arc<Keypair>>,
    settings: LaunchSettings,
    stage: LaunchStage,
}

impl LaunchExecutor {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        relay: Arc<dyn BundleRelay>,
        store: StateStore,
        lp_wallet: Arc<Keypair>,
        swap_wallets: Vec<Arc<Keypair>>,
        settings: LaunchSettings,
    ) -> Self {
        let sender = TransactionSender::new(Arc::clone(&rpc), settings.cluster, settings.confirm_timeout);
        Self {
            rpc,
            relay,
            store,
            sender,
            lp_wallet,
            swap_wallets,
            settings,
            stage: LaunchStage::Idle,
        }
    }

    pub fn stage(&self) -> LaunchStage {
        self.stage
    }

    fn transition(&mut self, stage: LaunchStage) {
        info!("Launch stage: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Run the launch end to end.
    ///
    /// Missing accounts or an empty LP wallet abort the run, a blockhash that
    /// cannot be fetched ends it with `RunOutcome::Err`. Everything else that
    /// goes wrong is returned as an error.
    pub async fn run(&mut self) -> Result<RunOutcome> {
        match self.run_inner().await {
            Err(LaunchError::PrepareTransaction) => {
                let message = LaunchError::PrepareTransaction.to_string();
                error!("{}", message);
                Ok(RunOutcome::Err(message))
            }
            other => other,
        }
    }

    async fn run_inner(&mut self) -> Result<RunOutcome> {
        let lp_key = self.lp_wallet.pubkey();
        info!("🚀 Launching pool from LP wallet {} on {}", lp_key, self.settings.cluster);

        let resolved = match self.resolve_market().await? {
            Ok(resolved) => resolved,
            Err(reason) => {
                warn!("Launch aborted: {}", reason);
                return Ok(RunOutcome::Aborted(reason));
            }
        };

        let pool_keys = derive_pool_keys(&PoolKeyInputs {
            market_id: resolved.market_id,
            market: resolved.market,
            base_decimals: resolved.base.decimals,
            quote_decimals: resolved.quote.decimals,
            programs: self.settings.programs,
        })?;
        info!("AMM ID: {}", pool_keys.id);
        info!("LP mint: {}", pool_keys.lp_mint);

        let mut state = self.store.load().await?;
        state.record_pool(&pool_keys, &lp_key);
        self.store.save(&state).await?;
        self.transition(LaunchStage::PoolKeysResolved);

        let lamports = get_lamports(self.rpc.as_ref(), &lp_key).await?;
        if lamports == 0 {
            let reason = format!("LP wallet {} has no SOL", lp_key);
            warn!("Launch aborted: {}", reason);
            return Ok(RunOutcome::Aborted(reason));
        }

        let quote_amount = ui_to_raw(self.settings.quote_mint_amount, resolved.quote.decimals)?;
        let quote_balance = get_mint_balance(
            self.rpc.as_ref(),
            &lp_key,
            &resolved.quote.mint,
            &resolved.quote.token_program,
        )
        .await?;
        info!("Quote balance: {} (input {})", quote_balance, quote_amount);
        ensure_sufficient(quote_amount, quote_balance)?;

        let base_balance = get_mint_balance(
            self.rpc.as_ref(),
            &lp_key,
            &resolved.base.mint,
            &resolved.base.token_program,
        )
        .await?;
        let base_amount = fraction_of(base_balance, self.settings.base_mint_percentage)?;
        info!("Input base: {} of {}", base_amount, base_balance);

        let lookup_tables =
            AddressLookupTableCache::load(self.rpc.as_ref(), &self.settings.lookup_table_addresses).await?;

        let pool_txs = self
            .build_pool_transactions(&pool_keys, base_amount, quote_amount, &lookup_tables)
            .await?;
        self.transition(LaunchStage::PoolTxBuilt);

        for tx in &pool_txs {
            self.sender.simulate(tx).await?;
        }

        if self.settings.cluster == Cluster::Devnet {
            for tx in &pool_txs {
                let result = self.sender.execute(tx).await?;
                if !result.confirmed {
                    let reason = format!(
                        "pool transaction {} not confirmed: {}",
                        result.signature,
                        result.error.as_deref().unwrap_or("unknown")
                    );
                    warn!("Launch aborted: {}", reason);
                    return Ok(RunOutcome::Aborted(reason));
                }
            }
            info!("Pool created: {}", pool_keys.id);
            output_balance(self.rpc.as_ref(), &lp_key).await?;
            self.transition(LaunchStage::PoolSubmitted);
        }

        let mut bundle = pool_txs;
        let swap_wallets = self.swap_wallets.clone();
        for (index, wallet) in swap_wallets.iter().enumerate() {
            let swap_txs = self
                .build_swap_transactions(&pool_keys, wallet, &lookup_tables)
                .await?;
            self.transition(LaunchStage::SwapTxBuilt(index));

            for tx in &swap_txs {
                self.sender.simulate(tx).await?;
            }

            if self.settings.cluster == Cluster::Devnet {
                for tx in &swap_txs {
                    let result = self.sender.execute(tx).await?;
                    if result.confirmed {
                        info!("Token bought by swap wallet #{} ({})", index + 1, wallet.pubkey());
                    } else {
                        warn!(
                            "Buy from swap wallet #{} not confirmed: {}",
                            index + 1,
                            result.error.as_deref().unwrap_or("unknown")
                        );
                    }
                }
            }
            bundle.extend(swap_txs);
            output_balance(self.rpc.as_ref(), &lp_key).await?;
        }

        if self.settings.cluster == Cluster::Mainnet {
            info!("Submitting bundle of {} transactions", bundle.len());
            let (result, attempts) = submit_bundle_until_confirmed(
                self.relay.as_ref(),
                &bundle,
                self.settings.bundle_max_attempts,
                self.settings.bundle_retry_delay,
            )
            .await?;
            info!(
                "Bundle confirmed after {} attempt(s), tip {}",
                attempts,
                result
                    .tip_signature
                    .map(|s| s.to_string())
                    .unwrap_or_default()
            );
            self.transition(LaunchStage::BundleSubmitted);
        }

        self.transition(LaunchStage::Done);
        Ok(RunOutcome::Done)
    }

    /// Market and mints named in the state file; `Err(reason)` aborts the run
    async fn resolve_market(&self) -> Result<std::result::Result<ResolvedMarket, String>> {
        let state = self.store.load().await?;
        let Some(market_id) = state.market_id else {
            return Ok(Err(format!(
                "state file {} must name marketId",
                self.store.file_path().display()
            )));
        };

        let Some(market_account) = fetch_account(self.rpc.as_ref(), &market_id).await? else {
            return Ok(Err(LaunchError::MissingAccount(market_id).to_string()));
        };
        let market = MarketStateV3::decode(&market_account.data)?;
        // Base mint comes from the market; `mint` is written back with the pool
        if let Some(base_mint) = state.mint {
            if market.base_mint != base_mint {
                return Err(LaunchError::InvalidMarket(format!(
                    "market {} trades {}, state names mint {}",
                    market_id, market.base_mint, base_mint
                )));
            }
        }

        let mut mints = Vec::with_capacity(2);
        for mint in [market.base_mint, market.quote_mint] {
            let Some(account) = fetch_account(self.rpc.as_ref(), &mint).await? else {
                return Ok(Err(LaunchError::MissingAccount(mint).to_string()));
            };
            mints.push(decode_mint(&mint, &account)?);
        }
        let (base, quote) = (mints[0], mints[1]);
        info!("Base decimals: {}, quote decimals: {}", base.decimals, quote.decimals);

        Ok(Ok(ResolvedMarket {
            market_id,
            market,
            base,
            quote,
        }))
    }

    async fn build_pool_transactions(
        &self,
        pool_keys: &PoolKeys,
        base_amount: u64,
        quote_amount: u64,
        lookup_tables: &AddressLookupTableCache,
    ) -> Result<Vec<VersionedTransaction>> {
        let open_time = (chrono::Utc::now().timestamp().max(0) as u64) + self.settings.delay_pool_open_time;
        let inner = build_create_pool_instructions(&CreatePoolParams {
            programs: self.settings.programs,
            pool_keys,
            owner: self.lp_wallet.pubkey(),
            base_amount,
            quote_amount,
            open_time,
        })?;

        let blockhash = prepare_recent_blockhash(self.rpc.as_ref()).await?;
        let assembler = TransactionAssembler::new(self.lp_wallet.pubkey(), lookup_tables, blockhash);
        let unsigned = assembler.build_simple_transactions(&inner)?;
        sign_all(&unsigned, &self.lp_wallet, &inner)
    }

    async fn build_swap_transactions(
        &self,
        pool_keys: &PoolKeys,
        wallet: &Keypair,
        lookup_tables: &AddressLookupTableCache,
    ) -> Result<Vec<VersionedTransaction>> {
        let amount_in = TokenAmount::from_ui(
            pool_keys.quote_mint,
            pool_keys.quote_decimals,
            self.settings.swap_sol_amount,
        )?;
        let min_amount_out = TokenAmount::new(pool_keys.base_mint, pool_keys.base_decimals, MIN_BUY_AMOUNT_OUT);

        let inner = build_swap_buy_instructions(
            pool_keys,
            wallet,
            &amount_in,
            &min_amount_out,
            self.settings.compute_budget,
        )?;

        let blockhash = prepare_recent_blockhash(self.rpc.as_ref()).await?;
        let assembler = TransactionAssembler::new(wallet.pubkey(), lookup_tables, blockhash);
        let unsigned = assembler.build_simple_transactions(&inner)?;
        sign_all(&unsigned, wallet, &inner)
    }
}

/// Sign each transaction with the payer plus whichever extra signers it requires
fn sign_all(
    unsigned: &[VersionedTransaction],
    payer: &Keypair,
    inner: &[InnerTransaction],
) -> Result<Vec<VersionedTransaction>> {
    let extra: Vec<&Keypair> = inner
        .iter()
        .flat_map(|group| group.extra_signers.iter().map(|k| k.as_ref()))
        .collect();

    unsigned
        .iter()
        .map(|tx| {
            let required = usize::from(tx.message.header().num_required_signatures);
            let required_keys = &tx.message.static_account_keys()[..required];
            let mut signers = vec![payer];
            signers.extend(
                extra
                    .iter()
                    .copied()
                    .filter(|k| k.pubkey() != payer.pubkey() && required_keys.contains(&k.pubkey())),
            );
            sign_transaction(tx, &signers)
        })
        .collect()
}

/// Resubmit the bundle until the relay reports it confirmed.
///
/// Relay errors and unconfirmed results both retry; only an oversized bundle
/// or reaching `max_attempts` stops the loop early. Returns the confirming
/// result and the number of attempts made.
pub async fn submit_bundle_until_confirmed(
    relay: &dyn BundleRelay,
    transactions: &[VersionedTransaction],
    max_attempts: Option<u32>,
    retry_delay: Duration,
) -> Result<(BundleResult, u32)> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match relay.send_bundle(transactions).await {
            Ok(result) if result.confirmed => return Ok((result, attempts)),
            Ok(_) => warn!("Bundle attempt {} not confirmed, retrying", attempts),
            Err(e @ LaunchError::BundleTooLarge { .. }) => return Err(e),
            Err(e) => warn!("Bundle attempt {} failed: {}", attempts, e),
        }

        if max_attempts.is_some_and(|max| attempts >= max) {
            return Err(LaunchError::BundleNotConfirmed { attempts });
        }
        sleep(retry_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::bundle::MockBundleRelay;
    use mockall::Sequence;
    use solana_sdk::signature::Signature;

    fn confirmed() -> BundleResult {
        BundleResult {
            confirmed: true,
            tip_signature: Some(Signature::default()),
            bundle_ids: vec!["bundle".to_string()],
        }
    }

    #[test]
    fn test_run_outcome_serialization() {
        assert_eq!(
            serde_json::to_string(&RunOutcome::Err("Failed to prepare transaction".to_string())).unwrap(),
            r#"{"Err":"Failed to prepare transaction"}"#
        );
        assert_eq!(serde_json::to_string(&RunOutcome::Done).unwrap(), r#""Done""#);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(LaunchStage::SwapTxBuilt(2).to_string(), "SwapTxBuilt(2)");
        assert_eq!(LaunchStage::PoolKeysResolved.to_string(), "PoolKeysResolved");
    }

    #[tokio::test]
    async fn test_bundle_loop_retries_until_confirmed() {
        let mut relay = MockBundleRelay::new();
        let mut seq = Sequence::new();
        relay
            .expect_send_bundle()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(BundleResult::rejected()));
        relay
            .expect_send_bundle()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(LaunchError::Relay("timeout".to_string())));
        relay
            .expect_send_bundle()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(confirmed()));

        let (result, attempts) = submit_bundle_until_confirmed(&relay, &[], None, Duration::ZERO)
            .await
            .unwrap();
        assert!(result.confirmed);
        assert_eq!(attempts, 4);
    }

    #[tokio::test]
    async fn test_bundle_loop_respects_attempt_cap() {
        let mut relay = MockBundleRelay::new();
        relay
            .expect_send_bundle()
            .times(3)
            .returning(|_| Ok(BundleResult::rejected()));

        let err = submit_bundle_until_confirmed(&relay, &[], Some(3), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::BundleNotConfirmed { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_oversized_bundle_is_not_retried() {
        let mut relay = MockBundleRelay::new();
        relay
            .expect_send_bundle()
            .times(1)
            .returning(|_| Err(LaunchError::BundleTooLarge { count: 7, max: 5 }));

        let err = submit_bundle_until_confirmed(&relay, &[], None, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::BundleTooLarge { .. }));
    }
}
