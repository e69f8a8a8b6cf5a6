use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use config_manager::{validate_lookback_days, SystemConfig};
use dex_client::{build_clients, ShyftClient, SolanaTrackerClient};
use job_orchestrator::{
    discover_candidates, screen_candidates, CandidateDiscovery, WalletQualificationPipeline,
};
use persistence_layer::WalletStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use wallet_core::{
    is_valid_wallet_address, HistoryPaginator, ProfitabilityFilter, SnipingDetector, TradeClassifier,
};

#[derive(Parser, Debug)]
#[command(name = "wallet_screener", version, about = "Finds profitable Solana wallets that do not snipe")]
struct Cli {
    /// Configuration file, merged over defaults and under the environment
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover candidates, then screen them
    Run {
        /// Screen the existing candidates file only
        #[arg(long)]
        skip_discovery: bool,
    },
    /// Append discovered candidates to the candidates file
    Discover,
    /// Screen the candidates file
    Screen,
    /// Print one wallet's classified trades within the lookback window
    History {
        /// Defaults to `screening.account`
        wallet: Option<String>,
        #[arg(long)]
        days: Option<i64>,
    },
    /// Print the effective configuration with API keys masked
    Config,
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = SystemConfig::load_from_path(&cli.config);
    let debug = match &config {
        Ok(config) => config.system.debug_mode,
        Err(_) => std::env::var("DEBUG").map(|v| v == "true").unwrap_or(false),
    };
    init_tracing(debug);
    let config = config.context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config.to_redacted_json())?);
        }
        Command::History { wallet, days } => {
            let wallet = wallet
                .or_else(|| config.screening.account.clone())
                .context("No wallet given and screening.account is not set")?;
            show_history(&config, &wallet, days).await?;
        }
        Command::Discover => {
            let (_, tracker) = clients(&config)?;
            let store = WalletStore::open(&config.system.outputs_dir).await?;
            discover(&config, tracker, &store).await?;
        }
        Command::Screen => {
            let (shyft, tracker) = clients(&config)?;
            let store = WalletStore::open(&config.system.outputs_dir).await?;
            screen(&config, shyft, tracker, &store).await?;
        }
        Command::Run { skip_discovery } => {
            let (shyft, tracker) = clients(&config)?;
            let store = WalletStore::open(&config.system.outputs_dir).await?;

            if skip_discovery || !config.discovery.enabled {
                info!("⏭️  Skipping discovery");
            } else {
                discover(&config, tracker.clone(), &store).await?;
            }
            screen(&config, shyft, tracker, &store).await?;
        }
    }

    Ok(())
}

fn clients(config: &SystemConfig) -> Result<(Arc<ShyftClient>, Arc<SolanaTrackerClient>)> {
    let (shyft, tracker) = build_clients(config)?;
    Ok((Arc::new(shyft), Arc::new(tracker)))
}

async fn discover(
    config: &SystemConfig,
    tracker: Arc<SolanaTrackerClient>,
    store: &WalletStore,
) -> Result<()> {
    let filter = ProfitabilityFilter::from_config(&config.thresholds)?;
    let discovery = CandidateDiscovery::new(tracker, filter, config.discovery.clone());
    let stats = discover_candidates(&discovery, store).await?;
    for error in &stats.errors {
        warn!("Discovery error: {}", error);
    }
    Ok(())
}

async fn screen(
    config: &SystemConfig,
    shyft: Arc<ShyftClient>,
    tracker: Arc<SolanaTrackerClient>,
    store: &WalletStore,
) -> Result<()> {
    let pipeline = WalletQualificationPipeline::new(config, shyft, tracker.clone(), tracker)?;
    let stats = screen_candidates(&pipeline, store).await?;
    info!(
        "🏁 {} of {} candidates qualified, see {}",
        stats.qualified,
        stats.candidates,
        store.outputs_dir().display()
    );
    Ok(())
}

async fn show_history(config: &SystemConfig, wallet: &str, days: Option<i64>) -> Result<()> {
    if !is_valid_wallet_address(wallet) {
        bail!("{} is not a valid wallet address", wallet);
    }
    let days = days.unwrap_or(config.screening.lookback_days);
    validate_lookback_days(days).context("Invalid --days")?;

    let (shyft, tracker) = build_clients(config)?;
    let classifier = TradeClassifier::new(config.screening.native_symbol.clone());
    let paginator =
        HistoryPaginator::new(shyft, classifier).with_batch_size(config.shyft.page_size);

    let history = paginator
        .fetch_history(wallet, Some(Duration::days(days)))
        .await?;

    if let Some(window) = history.window {
        info!(
            "📜 {} trades for {} between {} and {}",
            history.len(),
            wallet,
            window
                .start
                .map(|s| s.to_rfc3339())
                .unwrap_or_else(|| "the beginning".to_string()),
            window.end.to_rfc3339()
        );
    }
    for trade in &history {
        println!(
            "{}  {:<7}  {} -> {}  {}",
            trade.timestamp.to_rfc3339(),
            format!("{:?}", trade.trade_type),
            trade.token_in,
            trade.token_out,
            trade.signature
        );
    }

    if history.is_empty() {
        return Ok(());
    }
    let detector = SnipingDetector::new(
        tracker,
        Duration::seconds(config.screening.sniping_window_seconds),
    );
    let report = detector.evaluate(wallet, history.as_slice()).await;
    if report.is_sniper {
        for sniped in &report.sniped_tokens {
            println!(
                "🎯 sniped {}: first buy {}s from pool creation",
                sniped.token_address, sniped.seconds_from_pool_creation
            );
        }
    } else {
        println!(
            "✅ no sniping across {} tokens ({} skipped)",
            report.tokens_checked,
            report.skipped_tokens.len()
        );
    }
    Ok(())
}
