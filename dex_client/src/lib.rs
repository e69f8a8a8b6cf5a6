// Provider clients: Shyft for wallet transaction history, Solana Tracker for
// PnL, token pools and candidate discovery

pub mod shyft_client;
pub mod solana_tracker_client;
pub mod types;

pub use config_manager::{ShyftConfig, SolanaTrackerConfig};

pub use shyft_client::{ShyftClient, ShyftError};
pub use solana_tracker_client::{SolanaTrackerClient, SolanaTrackerError};
pub use types::{
    LeaderboardWallet, ShyftTransaction, TokenInfoResponse, TokenTopTrader, TokenTrade,
    TokenTradesPage, TopTradersPage, TraderSummary, TrendingToken, TrendingTokenEntry,
};

use config_manager::SystemConfig;
use rate_limiter::build_limiter;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DexClientError {
    #[error("Shyft client error: {0}")]
    Shyft(#[from] ShyftError),
    #[error("Solana Tracker client error: {0}")]
    SolanaTracker(#[from] SolanaTrackerError),
}

/// Both clients, each behind its own provider-wide limiter
pub fn build_clients(
    config: &SystemConfig,
) -> Result<(ShyftClient, SolanaTrackerClient), DexClientError> {
    let shyft = ShyftClient::new(
        config.shyft.clone(),
        build_limiter(shyft_client::PROVIDER, &config.shyft.rate_limit),
    )?;
    let tracker = SolanaTrackerClient::new(
        config.solana_tracker.clone(),
        build_limiter(solana_tracker_client::PROVIDER, &config.solana_tracker.rate_limit),
    )?;
    Ok((shyft, tracker))
}
