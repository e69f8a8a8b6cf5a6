use async_trait::async_trait;
use config_manager::DiscoveryConfig;
use dex_client::SolanaTrackerClient;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wallet_core::{ProfitabilityFilter, SourceError, WalletPnlSummary};

/// A wallet as ranked by a leaderboard, with the PnL the leaderboard reports
#[derive(Debug, Clone)]
pub struct RankedWallet {
    pub wallet: String,
    pub summary: WalletPnlSummary,
}

#[derive(Debug, Clone)]
pub struct LeaderboardPage {
    pub wallets: Vec<RankedWallet>,
    pub has_next: bool,
}

#[derive(Debug, Clone)]
pub struct TrendingMint {
    pub mint: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TradesPage {
    pub wallets: Vec<String>,
    pub next_cursor: Option<String>,
    pub has_next: bool,
}

/// Where candidate wallets come from
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// 1-based page of the global top-traders leaderboard
    async fn leaderboard_page(&self, page: u32) -> Result<LeaderboardPage, SourceError>;

    async fn trending_tokens(&self, timeframe: &str) -> Result<Vec<TrendingMint>, SourceError>;

    async fn token_top_traders(&self, token: &str) -> Result<Vec<RankedWallet>, SourceError>;

    async fn token_trades(
        &self,
        token: &str,
        cursor: Option<&str>,
    ) -> Result<TradesPage, SourceError>;
}

#[async_trait]
impl CandidateSource for SolanaTrackerClient {
    async fn leaderboard_page(&self, page: u32) -> Result<LeaderboardPage, SourceError> {
        let page = self.get_top_traders_page(page).await?;
        Ok(LeaderboardPage {
            wallets: page
                .wallets
                .into_iter()
                .filter_map(|entry| {
                    let summary = entry.summary?.to_pnl_summary();
                    Some(RankedWallet {
                        wallet: entry.wallet,
                        summary,
                    })
                })
                .collect(),
            has_next: page.has_next,
        })
    }

    async fn trending_tokens(&self, timeframe: &str) -> Result<Vec<TrendingMint>, SourceError> {
        Ok(self
            .get_trending_tokens(timeframe)
            .await?
            .into_iter()
            .map(|entry| TrendingMint {
                mint: entry.token.mint,
                name: entry.token.name,
            })
            .collect())
    }

    async fn token_top_traders(&self, token: &str) -> Result<Vec<RankedWallet>, SourceError> {
        Ok(self
            .get_token_top_traders(token)
            .await?
            .into_iter()
            .map(|trader| RankedWallet {
                summary: trader.to_pnl_summary(),
                wallet: trader.wallet,
            })
            .collect())
    }

    async fn token_trades(
        &self,
        token: &str,
        cursor: Option<&str>,
    ) -> Result<TradesPage, SourceError> {
        let page = self.get_token_trades(token, cursor).await?;
        Ok(TradesPage {
            next_cursor: page.cursor(),
            has_next: page.has_next_page,
            wallets: page.trades.into_iter().map(|trade| trade.wallet).collect(),
        })
    }
}

#[async_trait]
impl<C: CandidateSource + ?Sized> CandidateSource for &C {
    async fn leaderboard_page(&self, page: u32) -> Result<LeaderboardPage, SourceError> {
        (**self).leaderboard_page(page).await
    }

    async fn trending_tokens(&self, timeframe: &str) -> Result<Vec<TrendingMint>, SourceError> {
        (**self).trending_tokens(timeframe).await
    }

    async fn token_top_traders(&self, token: &str) -> Result<Vec<RankedWallet>, SourceError> {
        (**self).token_top_traders(token).await
    }

    async fn token_trades(
        &self,
        token: &str,
        cursor: Option<&str>,
    ) -> Result<TradesPage, SourceError> {
        (**self).token_trades(token, cursor).await
    }
}

#[async_trait]
impl<C: CandidateSource + ?Sized> CandidateSource for Arc<C> {
    async fn leaderboard_page(&self, page: u32) -> Result<LeaderboardPage, SourceError> {
        (**self).leaderboard_page(page).await
    }

    async fn trending_tokens(&self, timeframe: &str) -> Result<Vec<TrendingMint>, SourceError> {
        (**self).trending_tokens(timeframe).await
    }

    async fn token_top_traders(&self, token: &str) -> Result<Vec<RankedWallet>, SourceError> {
        (**self).token_top_traders(token).await
    }

    async fn token_trades(
        &self,
        token: &str,
        cursor: Option<&str>,
    ) -> Result<TradesPage, SourceError> {
        (**self).token_trades(token, cursor).await
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryStats {
    pub leaderboard_pages: u32,
    pub leaderboard_wallets: usize,
    pub tokens_scanned: usize,
    pub token_traders: usize,
    pub trade_wallets: usize,
    pub candidates: usize,
    pub errors: Vec<String>,
}

/// Unique wallets in the order they were first seen
#[derive(Default)]
struct CandidateSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl CandidateSet {
    fn insert(&mut self, wallet: String) -> bool {
        if self.seen.insert(wallet.clone()) {
            self.ordered.push(wallet);
            true
        } else {
            false
        }
    }
}

/// Collects candidate wallets from the leaderboards and from recent
/// traders of trending tokens. Every failure is logged and skipped.
pub struct CandidateDiscovery<C> {
    source: C,
    filter: ProfitabilityFilter,
    config: DiscoveryConfig,
}

impl<C: CandidateSource> CandidateDiscovery<C> {
    pub fn new(source: C, filter: ProfitabilityFilter, config: DiscoveryConfig) -> Self {
        Self {
            source,
            filter,
            config,
        }
    }

    pub async fn discover(&self) -> (Vec<String>, DiscoveryStats) {
        info!("🔍 Starting candidate discovery");
        let mut candidates = CandidateSet::default();
        let mut stats = DiscoveryStats::default();

        self.scan_leaderboard(&mut candidates, &mut stats).await;
        self.scan_trending_tokens(&mut candidates, &mut stats).await;

        stats.candidates = candidates.ordered.len();
        info!(
            "✅ Discovery found {} candidates ({} leaderboard, {} token traders, {} recent traders, {} errors)",
            stats.candidates,
            stats.leaderboard_wallets,
            stats.token_traders,
            stats.trade_wallets,
            stats.errors.len()
        );
        (candidates.ordered, stats)
    }

    async fn scan_leaderboard(&self, candidates: &mut CandidateSet, stats: &mut DiscoveryStats) {
        for page in 1..=self.config.max_top_trader_pages {
            let leaderboard = match self.source.leaderboard_page(page).await {
                Ok(leaderboard) => leaderboard,
                Err(e) => {
                    warn!("❌ Leaderboard page {} failed: {}", page, e);
                    stats.errors.push(format!("leaderboard page {}: {}", page, e));
                    break;
                }
            };
            stats.leaderboard_pages += 1;

            let before = stats.leaderboard_wallets;
            for ranked in leaderboard.wallets {
                if self
                    .filter
                    .evaluate(&ranked.wallet, &ranked.summary)
                    .passes_leaderboard()
                    && candidates.insert(ranked.wallet)
                {
                    stats.leaderboard_wallets += 1;
                }
            }
            info!(
                "📄 Leaderboard page {}: {} profitable wallets",
                page,
                stats.leaderboard_wallets - before
            );

            if !leaderboard.has_next {
                break;
            }
        }
    }

    async fn scan_trending_tokens(&self, candidates: &mut CandidateSet, stats: &mut DiscoveryStats) {
        let tokens = match self
            .source
            .trending_tokens(&self.config.trending_timeframe)
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("❌ Trending tokens lookup failed: {}", e);
                stats.errors.push(format!("trending tokens: {}", e));
                return;
            }
        };

        let selected = tokens
            .into_iter()
            .filter(|token| !self.config.excluded_tokens.contains(&token.mint))
            .take(self.config.max_trending_tokens);

        for token in selected {
            info!(
                "🔥 Scanning trending token {} ({})",
                token.name.as_deref().unwrap_or("N/A"),
                token.mint
            );
            stats.tokens_scanned += 1;
            self.scan_token_top_traders(&token.mint, candidates, stats)
                .await;
            self.scan_token_trades(&token.mint, candidates, stats).await;
        }
    }

    async fn scan_token_top_traders(
        &self,
        mint: &str,
        candidates: &mut CandidateSet,
        stats: &mut DiscoveryStats,
    ) {
        match self.source.token_top_traders(mint).await {
            Ok(traders) => {
                for ranked in traders {
                    if self
                        .filter
                        .evaluate(&ranked.wallet, &ranked.summary)
                        .passes_token_leaderboard()
                        && candidates.insert(ranked.wallet)
                    {
                        stats.token_traders += 1;
                    }
                }
            }
            Err(e) => {
                warn!("❌ Top traders for {} failed: {}", mint, e);
                stats.errors.push(format!("top traders {}: {}", mint, e));
            }
        }
    }

    async fn scan_token_trades(
        &self,
        mint: &str,
        candidates: &mut CandidateSet,
        stats: &mut DiscoveryStats,
    ) {
        let mut cursor: Option<String> = None;

        for page in 1..=self.config.max_trade_pages {
            let trades = match self.source.token_trades(mint, cursor.as_deref()).await {
                Ok(trades) => trades,
                Err(e) => {
                    warn!("❌ Trades page {} for {} failed: {}", page, mint, e);
                    stats.errors.push(format!("trades {} page {}: {}", mint, page, e));
                    break;
                }
            };

            let count = trades.wallets.len();
            for wallet in trades.wallets {
                if candidates.insert(wallet) {
                    stats.trade_wallets += 1;
                }
            }
            debug!("📄 Trades page {} for {}: {} trades", page, mint, count);

            match trades.next_cursor {
                Some(next) if trades.has_next => cursor = Some(next),
                _ => break,
            }
        }
    }
}
