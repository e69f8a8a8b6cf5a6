use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::{NormalizedTrade, PoolInfoSource, TradeType};

/// A token the wallet entered within the sniping window of its first pool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnipedToken {
    pub token_address: String,
    pub first_buy: DateTime<Utc>,
    pub pool_created: DateTime<Utc>,
    /// Absolute distance between the two, in seconds
    pub seconds_from_pool_creation: i64,
}

/// Evidence behind a sniping verdict
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SnipingReport {
    pub wallet: String,
    pub is_sniper: bool,
    pub tokens_checked: usize,
    pub sniped_tokens: Vec<SnipedToken>,
    /// Tokens whose pool lookup failed and were left out of the check
    pub skipped_tokens: Vec<String>,
}

/// Flags wallets whose first buy of any token landed within `window` of
/// that token's earliest pool creation.
pub struct SnipingDetector<P> {
    pool_info: P,
    window: Duration,
}

impl<P: PoolInfoSource> SnipingDetector<P> {
    pub fn new(pool_info: P, window: Duration) -> Self {
        Self { pool_info, window }
    }

    /// One-minute window
    pub fn with_default_window(pool_info: P) -> Self {
        Self::new(pool_info, Duration::minutes(1))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn pool_info(&self) -> &P {
        &self.pool_info
    }

    /// Checks every bought token; a failed lookup only skips that token
    pub async fn evaluate(&self, wallet: &str, trades: &[NormalizedTrade]) -> SnipingReport {
        let entries = earliest_buys(trades);
        let mut report = SnipingReport {
            wallet: wallet.to_string(),
            ..SnipingReport::default()
        };

        if entries.is_empty() {
            debug!("No buys for {}, not a sniper", wallet);
            return report;
        }

        for (token, first_buy) in entries {
            let pool = match self.pool_info.token_pool_info(token).await {
                Ok(pool) => pool,
                Err(e) => {
                    warn!(
                        "⚠️ Pool lookup failed for {} (wallet {}): {}, skipping token",
                        token, wallet, e
                    );
                    report.skipped_tokens.push(token.to_string());
                    continue;
                }
            };
            report.tokens_checked += 1;

            let distance = (first_buy - pool.earliest_pool_creation_time).num_seconds().abs();
            if is_snipe(first_buy, pool.earliest_pool_creation_time, self.window) {
                info!(
                    "🎯 {} bought {} {}s from pool creation",
                    wallet, token, distance
                );
                report.sniped_tokens.push(SnipedToken {
                    token_address: token.to_string(),
                    first_buy,
                    pool_created: pool.earliest_pool_creation_time,
                    seconds_from_pool_creation: distance,
                });
            } else {
                debug!("{} entered {} {}s from pool creation", wallet, token, distance);
            }
        }

        report.is_sniper = !report.sniped_tokens.is_empty();
        report
    }
}

/// Boolean form of [`SnipingDetector::evaluate`] with the one-minute window
pub async fn detect_sniping<P: PoolInfoSource>(trades: &[NormalizedTrade], pool_info: &P) -> bool {
    SnipingDetector::with_default_window(pool_info)
        .evaluate("", trades)
        .await
        .is_sniper
}

/// Earliest buy timestamp per acquired token. Buys whose output token has
/// no address cannot be checked and are left out.
fn earliest_buys(trades: &[NormalizedTrade]) -> BTreeMap<&str, DateTime<Utc>> {
    let mut entries: BTreeMap<&str, DateTime<Utc>> = BTreeMap::new();

    for trade in trades.iter().filter(|t| t.trade_type == TradeType::Buy) {
        let Some(token) = trade.token_out.address.as_deref() else {
            debug!("Buy {} has no output token address", trade.signature);
            continue;
        };
        entries
            .entry(token)
            .and_modify(|first| *first = (*first).min(trade.timestamp))
            .or_insert(trade.timestamp);
    }

    entries
}

fn is_snipe(first_buy: DateTime<Utc>, pool_created: DateTime<Utc>, window: Duration) -> bool {
    (first_buy - pool_created).num_milliseconds().abs() <= window.num_milliseconds()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SourceError, TokenLeg, TokenPoolInfo};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const T0: i64 = 1_700_000_000;

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(ts, 0).unwrap()
    }

    fn trade(signature: &str, trade_type: TradeType, token: Option<&str>, ts: i64) -> NormalizedTrade {
        NormalizedTrade {
            signature: signature.to_string(),
            trade_type,
            timestamp: at(ts),
            token_in: TokenLeg {
                symbol: Some("SOL".to_string()),
                address: Some("sol".to_string()),
                amount: None,
            },
            token_out: TokenLeg {
                symbol: token.map(|t| t.to_uppercase()),
                address: token.map(str::to_string),
                amount: None,
            },
        }
    }

    #[derive(Default)]
    struct FakePools {
        created: HashMap<String, i64>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakePools {
        fn with(pools: &[(&str, i64)]) -> Self {
            Self {
                created: pools.iter().map(|(t, ts)| (t.to_string(), *ts)).collect(),
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PoolInfoSource for FakePools {
        async fn token_pool_info(&self, token_address: &str) -> Result<TokenPoolInfo, SourceError> {
            self.lookups.lock().unwrap().push(token_address.to_string());
            self.created
                .get(token_address)
                .map(|ts| TokenPoolInfo {
                    token_address: token_address.to_string(),
                    earliest_pool_creation_time: at(*ts),
                })
                .ok_or_else(|| SourceError::Api {
                    provider: "fake",
                    message: format!("404 Not Found: {}", token_address),
                })
        }
    }

    #[tokio::test]
    async fn test_buy_59_seconds_after_pool_is_sniping() {
        let pools = FakePools::with(&[("meme", T0)]);
        let trades = vec![trade("s1", TradeType::Buy, Some("meme"), T0 + 59)];

        assert!(detect_sniping(&trades, &pools).await);
    }

    #[tokio::test]
    async fn test_buy_61_seconds_after_pool_is_not_sniping() {
        let pools = FakePools::with(&[("meme", T0)]);
        let trades = vec![trade("s1", TradeType::Buy, Some("meme"), T0 + 61)];

        assert!(!detect_sniping(&trades, &pools).await);
    }

    #[tokio::test]
    async fn test_exactly_one_minute_is_sniping() {
        let pools = FakePools::with(&[("meme", T0)]);
        let trades = vec![trade("s1", TradeType::Buy, Some("meme"), T0 + 60)];

        assert!(detect_sniping(&trades, &pools).await);
    }

    #[tokio::test]
    async fn test_earliest_buy_decides() {
        // Pool created 10s before the first of two buys 30 minutes apart
        let pools = FakePools::with(&[("meme", T0 - 10)]);
        let trades = vec![
            trade("s1", TradeType::Buy, Some("meme"), T0),
            trade("s2", TradeType::Buy, Some("meme"), T0 + 30 * 60),
        ];
        let detector = SnipingDetector::with_default_window(&pools);

        let report = detector.evaluate("wallet", &trades).await;

        assert!(report.is_sniper);
        assert_eq!(report.tokens_checked, 1);
        assert_eq!(report.sniped_tokens[0].first_buy, at(T0));
        assert_eq!(report.sniped_tokens[0].seconds_from_pool_creation, 10);
        assert_eq!(pools.lookups.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_buy_before_pool_creation_counts() {
        let pools = FakePools::with(&[("meme", T0)]);
        let trades = vec![trade("s1", TradeType::Buy, Some("meme"), T0 - 30)];

        assert!(detect_sniping(&trades, &pools).await);
    }

    #[tokio::test]
    async fn test_no_buys_is_never_sniping() {
        let pools = FakePools::with(&[("meme", T0)]);
        let trades = vec![
            trade("s1", TradeType::Sell, Some("meme"), T0 + 1),
            trade("s2", TradeType::Unknown, None, T0 + 2),
        ];

        assert!(!detect_sniping(&trades, &pools).await);
        assert!(!detect_sniping(&[], &pools).await);
        assert!(pools.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_lookup_skips_only_that_token() {
        let pools = FakePools::with(&[("late", T0), ("sniped", T0)]);
        let trades = vec![
            trade("s1", TradeType::Buy, Some("missing"), T0),
            trade("s2", TradeType::Buy, Some("late"), T0 + 3600),
            trade("s3", TradeType::Buy, Some("sniped"), T0 + 5),
        ];
        let detector = SnipingDetector::with_default_window(&pools);

        let report = detector.evaluate("wallet", &trades).await;

        assert!(report.is_sniper);
        assert_eq!(report.skipped_tokens, vec!["missing".to_string()]);
        assert_eq!(report.tokens_checked, 2);
        assert_eq!(report.sniped_tokens.len(), 1);
        assert_eq!(report.sniped_tokens[0].token_address, "sniped");
    }

    #[tokio::test]
    async fn test_every_token_is_checked() {
        let pools = FakePools::with(&[("a", T0), ("b", T0), ("c", T0)]);
        let trades = vec![
            trade("s1", TradeType::Buy, Some("a"), T0 + 1),
            trade("s2", TradeType::Buy, Some("b"), T0 + 2),
            trade("s3", TradeType::Buy, Some("c"), T0 + 9999),
        ];
        let detector = SnipingDetector::with_default_window(&pools);

        let report = detector.evaluate("wallet", &trades).await;

        assert_eq!(report.tokens_checked, 3);
        assert_eq!(report.sniped_tokens.len(), 2);
    }

    #[tokio::test]
    async fn test_custom_window() {
        let pools = FakePools::with(&[("meme", T0)]);
        let trades = vec![trade("s1", TradeType::Buy, Some("meme"), T0 + 200)];
        let detector = SnipingDetector::new(&pools, Duration::minutes(5));

        assert!(detector.evaluate("wallet", &trades).await.is_sniper);
    }

    #[test]
    fn test_buys_without_token_address_are_ignored() {
        let trades = vec![
            trade("s1", TradeType::Buy, None, T0),
            trade("s2", TradeType::Buy, Some("meme"), T0 + 5),
            trade("s3", TradeType::Buy, Some("meme"), T0 + 1),
        ];

        let entries = earliest_buys(&trades);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries["meme"], at(T0 + 1));
    }
}
