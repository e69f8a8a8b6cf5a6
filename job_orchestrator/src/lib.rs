use persistence_layer::{PersistenceError, WalletList, WalletStore};
use thiserror::Error;
use tracing::{info, warn};
use wallet_core::{
    is_valid_wallet_address, CoreError, HistoryError, PoolInfoSource, SourceError,
    TransactionHistorySource, WalletPnlSource,
};

pub mod discovery;
pub mod pipeline;

pub use discovery::{
    CandidateDiscovery, CandidateSource, DiscoveryStats, LeaderboardPage, RankedWallet,
    TradesPage, TrendingMint,
};
pub use pipeline::{RunStats, WalletQualificationPipeline};

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("PnL lookup failed for {wallet}: {source}")]
    Pnl { wallet: String, source: SourceError },
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl From<CoreError> for OrchestratorError {
    fn from(err: CoreError) -> Self {
        OrchestratorError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;

/// Runs discovery and appends everything found to the candidates file
pub async fn discover_candidates<C: CandidateSource>(
    discovery: &CandidateDiscovery<C>,
    store: &WalletStore,
) -> Result<DiscoveryStats> {
    let (wallets, stats) = discovery.discover().await;
    store.append_wallets(WalletList::Candidates, &wallets).await?;
    info!(
        "💾 Saved {} candidates to {}",
        wallets.len(),
        store.path(WalletList::Candidates).display()
    );
    Ok(stats)
}

/// Deduplicated candidates file, without lines that are not wallet addresses
pub async fn load_candidates(store: &WalletStore) -> Result<Vec<String>> {
    let unique = store.dedup(WalletList::Candidates).await?;
    let (valid, invalid): (Vec<_>, Vec<_>) = unique
        .into_iter()
        .partition(|wallet| is_valid_wallet_address(wallet));

    for line in &invalid {
        warn!("Ignoring invalid wallet address in candidates file: {:?}", line);
    }
    Ok(valid)
}

/// Screens the candidates file end to end: qualification, deduplication
/// of the stage files and the CSV verdict report.
pub async fn screen_candidates<H, P, W>(
    pipeline: &WalletQualificationPipeline<H, P, W>,
    store: &WalletStore,
) -> Result<RunStats>
where
    H: TransactionHistorySource,
    P: PoolInfoSource,
    W: WalletPnlSource,
{
    let candidates = load_candidates(store).await?;
    if candidates.is_empty() {
        warn!(
            "No candidates in {}, nothing to screen",
            store.path(WalletList::Candidates).display()
        );
    }

    let (stats, report) = pipeline.run(&candidates, store).await?;

    store.dedup(WalletList::Profitable).await?;
    store.dedup(WalletList::Qualified).await?;
    report.write_to(store.outputs_dir()).await?;

    stats.log_summary();
    Ok(stats)
}
