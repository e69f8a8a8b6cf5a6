use async_trait::async_trait;
use config_manager::{DiscoveryConfig, SystemConfig};
use job_orchestrator::{
    discover_candidates, CandidateDiscovery, CandidateSource, LeaderboardPage, RankedWallet,
    TradesPage, TrendingMint,
};
use persistence_layer::{WalletList, WalletStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Mutex;
use wallet_core::{ProfitabilityFilter, SourceError, WalletPnlSummary};

const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

fn filter() -> ProfitabilityFilter {
    ProfitabilityFilter {
        winrate_min: dec!(50),
        winrate_max: dec!(95),
        roi_min: dec!(20),
        invested_min: dec!(100),
    }
}

fn ranked(wallet: &str, win: Option<Decimal>, profit: Decimal, invested: Decimal) -> RankedWallet {
    RankedWallet {
        wallet: wallet.to_string(),
        summary: WalletPnlSummary {
            win_percentage: win,
            total_profit: profit,
            total_invested: invested,
        },
    }
}

fn api_error(message: &str) -> SourceError {
    SourceError::Api {
        provider: "fake_tracker",
        message: message.to_string(),
    }
}

#[derive(Default)]
struct FakeTracker {
    leaderboard: Vec<LeaderboardPage>,
    leaderboard_fails: bool,
    trending: Vec<TrendingMint>,
    top_traders: HashMap<String, Vec<RankedWallet>>,
    /// Keyed by the cursor the page is requested with ("" for the first)
    trades: HashMap<String, TradesPage>,
    leaderboard_calls: Mutex<Vec<u32>>,
    trade_calls: Mutex<usize>,
}

#[async_trait]
impl CandidateSource for FakeTracker {
    async fn leaderboard_page(&self, page: u32) -> Result<LeaderboardPage, SourceError> {
        self.leaderboard_calls.lock().unwrap().push(page);
        if self.leaderboard_fails {
            return Err(api_error("HTTP 500"));
        }
        self.leaderboard
            .get(page as usize - 1)
            .cloned()
            .ok_or_else(|| api_error("no such page"))
    }

    async fn trending_tokens(&self, _timeframe: &str) -> Result<Vec<TrendingMint>, SourceError> {
        Ok(self.trending.clone())
    }

    async fn token_top_traders(&self, token: &str) -> Result<Vec<RankedWallet>, SourceError> {
        self.top_traders
            .get(token)
            .cloned()
            .ok_or_else(|| api_error("unknown token"))
    }

    async fn token_trades(
        &self,
        _token: &str,
        cursor: Option<&str>,
    ) -> Result<TradesPage, SourceError> {
        *self.trade_calls.lock().unwrap() += 1;
        self.trades
            .get(cursor.unwrap_or(""))
            .cloned()
            .ok_or_else(|| api_error("HTTP 502"))
    }
}

fn mint(mint: &str) -> TrendingMint {
    TrendingMint {
        mint: mint.to_string(),
        name: Some(mint.to_uppercase()),
    }
}

fn config() -> DiscoveryConfig {
    let mut config = SystemConfig::default().discovery;
    config.max_top_trader_pages = 3;
    config.max_trending_tokens = 1;
    config.max_trade_pages = 5;
    config
}

fn tracker() -> FakeTracker {
    let mut tracker = FakeTracker {
        leaderboard: vec![
            LeaderboardPage {
                wallets: vec![
                    ranked("lead_a", Some(dec!(70)), dec!(500), dec!(1000)),
                    ranked("lead_low_winrate", Some(dec!(30)), dec!(500), dec!(1000)),
                ],
                has_next: true,
            },
            LeaderboardPage {
                wallets: vec![
                    ranked("lead_b", Some(dec!(80)), dec!(300), dec!(1000)),
                    ranked("lead_low_roi", Some(dec!(80)), dec!(10), dec!(1000)),
                ],
                has_next: false,
            },
        ],
        trending: vec![mint(SOL_MINT), mint("hot"), mint("warm")],
        ..FakeTracker::default()
    };
    tracker.top_traders.insert(
        "hot".to_string(),
        vec![
            ranked("lead_a", None, dec!(500), dec!(1000)),
            ranked("token_a", None, dec!(900), dec!(1000)),
            ranked("token_small", None, dec!(40), dec!(50)),
        ],
    );
    tracker.trades.insert(
        String::new(),
        TradesPage {
            wallets: vec!["trader_a".to_string(), "token_a".to_string()],
            next_cursor: Some("c1".to_string()),
            has_next: true,
        },
    );
    tracker.trades.insert(
        "c1".to_string(),
        TradesPage {
            wallets: vec!["trader_b".to_string(), "trader_a".to_string()],
            next_cursor: Some("c2".to_string()),
            has_next: false,
        },
    );
    tracker
}

#[tokio::test]
async fn test_discovery_merges_all_sources_in_first_seen_order() {
    let discovery = CandidateDiscovery::new(tracker(), filter(), config());

    let (wallets, stats) = discovery.discover().await;

    assert_eq!(
        wallets,
        vec!["lead_a", "lead_b", "token_a", "trader_a", "trader_b"]
    );
    assert_eq!(stats.leaderboard_pages, 2);
    assert_eq!(stats.leaderboard_wallets, 2);
    assert_eq!(stats.tokens_scanned, 1);
    assert_eq!(stats.token_traders, 1);
    assert_eq!(stats.trade_wallets, 2);
    assert_eq!(stats.candidates, 5);
    assert!(stats.errors.is_empty());
}

#[tokio::test]
async fn test_leaderboard_stops_without_next_page() {
    let tracker = tracker();
    let discovery = CandidateDiscovery::new(&tracker, filter(), config());

    discovery.discover().await;

    assert_eq!(*tracker.leaderboard_calls.lock().unwrap(), vec![1, 2]);
    // Page one had a next page, page two did not
    assert_eq!(*tracker.trade_calls.lock().unwrap(), 2);
}

#[tokio::test]
async fn test_excluded_tokens_are_never_scanned() {
    let mut tracker = tracker();
    tracker.trending = vec![mint(SOL_MINT)];
    let discovery = CandidateDiscovery::new(tracker, filter(), config());

    let (wallets, stats) = discovery.discover().await;

    assert_eq!(stats.tokens_scanned, 0);
    assert_eq!(wallets, vec!["lead_a", "lead_b"]);
}

#[tokio::test]
async fn test_failures_are_recorded_and_skipped() {
    let mut tracker = tracker();
    tracker.leaderboard_fails = true;
    tracker.trades.remove("c1");
    let discovery = CandidateDiscovery::new(tracker, filter(), config());

    let (wallets, stats) = discovery.discover().await;

    assert_eq!(wallets, vec!["lead_a", "token_a", "trader_a"]);
    assert_eq!(stats.leaderboard_pages, 0);
    assert_eq!(stats.errors.len(), 2);
}

#[tokio::test]
async fn test_discovered_candidates_are_appended() {
    let dir = tempfile::tempdir().unwrap();
    let store = WalletStore::open(dir.path()).await.unwrap();
    store
        .append_wallet(WalletList::Candidates, "earlier")
        .await
        .unwrap();
    let discovery = CandidateDiscovery::new(tracker(), filter(), config());

    let stats = discover_candidates(&discovery, &store).await.unwrap();

    let saved = store.read_wallets(WalletList::Candidates).await.unwrap();
    assert_eq!(stats.candidates, 5);
    assert_eq!(saved.len(), 6);
    assert_eq!(saved[0], "earlier");
}
