use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use raydium_launch_bundler::{
    chain::{balance::output_balance, ChainRpc, JitoRelay, TransactionSender},
    config::{load_keypair, load_swap_keypairs, Config},
    data::StateStore,
    launch::{burn_lp, LaunchExecutor, LaunchSettings, RunOutcome},
};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::signer::Signer;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "launch-bundler", about = "Create a Raydium AMM v4 pool and bundle the first buys")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the pool, fund it and buy from every swap wallet (default)
    Launch,
    /// Burn the LP wallet's LP tokens for the recorded pool
    BurnLp,
    /// Print the persisted state file
    ShowState,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _guard = init_tracing()?;

    info!("🚀 Starting Raydium launch bundler...");

    let config = Config::load().context("Failed to load configuration")?;
    info!("✅ Configuration loaded successfully");
    debug!("Cluster: {}, state file: {}", config.cluster, config.state_file.display());

    let store = StateStore::new(&config.state_file);

    match cli.command.unwrap_or(Command::Launch) {
        Command::ShowState => {
            let state = store.load().await.context("Failed to read state file")?;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
        Command::Launch => launch(config, store).await,
        Command::BurnLp => burn(config, store).await,
    }
}

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create EnvFilter")?;

    let (file_layer, guard) = match std::env::var("LOG_FILE") {
        Ok(path) => {
            let path = Path::new(&path);
            let directory = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .context("LOG_FILE must name a file")?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer()
            .with_target(false)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

fn rpc_client(config: &Config) -> Result<Arc<RpcClient>> {
    let commitment = config.rpc.commitment()?;
    info!("✅ RPC client initialized");
    info!("   RPC: {}", config.rpc.url);
    info!("   Commitment: {}", config.rpc.commitment_level);
    Ok(Arc::new(RpcClient::new_with_commitment(config.rpc.url.clone(), commitment)))
}

async fn launch(config: Config, store: StateStore) -> Result<()> {
    let lp_wallet = load_keypair(&config.wallet)?;
    let swap_wallets = load_swap_keypairs(&config.wallet)?;
    info!("✅ LP wallet loaded: {}", lp_wallet.pubkey());
    info!("   Swap wallets: {}", swap_wallets.len());
    if swap_wallets.is_empty() {
        warn!("No swap wallets configured, only the pool will be created");
    }

    let rpc: Arc<dyn ChainRpc> = rpc_client(&config)?;
    output_balance(rpc.as_ref(), &lp_wallet.pubkey()).await?;

    let relay = JitoRelay::new(
        Arc::clone(&rpc),
        Arc::clone(&lp_wallet),
        config.jito.fee_lamports,
        config.jito.block_engine_urls.clone(),
        Duration::from_millis(config.rpc.confirm_timeout_ms),
    )?;
    info!(
        "✅ Jito relay initialized: {} block engines, tip {} lamports",
        config.jito.block_engine_urls.len(),
        config.jito.fee_lamports
    );

    let mut executor = LaunchExecutor::new(
        rpc,
        Arc::new(relay),
        store,
        lp_wallet,
        swap_wallets,
        LaunchSettings::from_config(&config),
    );

    let outcome = executor.run().await.context("Launch failed")?;
    report(&outcome)
}

async fn burn(config: Config, store: StateStore) -> Result<()> {
    let lp_wallet = load_keypair(&config.wallet)?;
    let rpc: Arc<dyn ChainRpc> = rpc_client(&config)?;
    let sender = TransactionSender::new(
        Arc::clone(&rpc),
        config.cluster,
        Duration::from_millis(config.rpc.confirm_timeout_ms),
    );

    let outcome = burn_lp(rpc.as_ref(), &sender, &store, &lp_wallet)
        .await
        .context("LP burn failed")?;
    report(&outcome)
}

fn report(outcome: &RunOutcome) -> Result<()> {
    match outcome {
        RunOutcome::Done => info!("✅ Done"),
        RunOutcome::Aborted(reason) => warn!("⚠️  Aborted: {}", reason),
        RunOutcome::Err(message) => error!("❌ {}", message),
    }
    println!("{}", serde_json::to_string(outcome)?);
    Ok(())
}
