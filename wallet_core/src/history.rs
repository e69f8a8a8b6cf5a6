use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{NormalizedTrade, SourceError, TradeClassifier, TransactionHistorySource};

/// Records requested per history page
pub const DEFAULT_BATCH_SIZE: u32 = 100;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to fetch latest transaction of {account} from {provider}: {source}")]
    LatestTransaction {
        account: String,
        provider: &'static str,
        source: SourceError,
    },
    #[error("Failed to fetch page {page} of {account} from {provider} (before {cursor}): {source}")]
    Page {
        account: String,
        page: u32,
        cursor: String,
        provider: &'static str,
        source: SourceError,
    },
}

impl HistoryError {
    pub fn account(&self) -> &str {
        match self {
            HistoryError::LatestTransaction { account, .. } | HistoryError::Page { account, .. } => {
                account
            }
        }
    }
}

/// Inclusive time range a history fetch covers. `start` is `None` for an
/// unbounded lookback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

impl FetchWindow {
    pub fn ending_at(end: DateTime<Utc>, lookback: Option<Duration>) -> Self {
        Self {
            start: lookback.and_then(|d| end.checked_sub_signed(d)),
            end,
        }
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t <= self.end && !self.is_before_start(t)
    }

    pub fn is_before_start(&self, t: DateTime<Utc>) -> bool {
        self.start.map_or(false, |start| t < start)
    }
}

/// A wallet's trades inside one [`FetchWindow`], oldest first
#[derive(Debug, Clone, Default)]
pub struct TradeHistory {
    /// `None` when the account has no transactions at all
    pub window: Option<FetchWindow>,
    trades: Vec<NormalizedTrade>,
    pub pages_fetched: u32,
}

impl TradeHistory {
    fn empty() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[NormalizedTrade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedTrade> {
        self.trades.iter()
    }

    pub fn into_trades(self) -> Vec<NormalizedTrade> {
        self.trades
    }
}

impl IntoIterator for TradeHistory {
    type Item = NormalizedTrade;
    type IntoIter = std::vec::IntoIter<NormalizedTrade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.into_iter()
    }
}

impl<'a> IntoIterator for &'a TradeHistory {
    type Item = &'a NormalizedTrade;
    type IntoIter = std::slice::Iter<'a, NormalizedTrade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

/// Fetches a wallet's classified trades for a lookback window, walking the
/// provider's newest-first pages with a signature cursor.
pub struct HistoryPaginator<S> {
    source: S,
    classifier: TradeClassifier,
    batch_size: u32,
}

impl<S: TransactionHistorySource> HistoryPaginator<S> {
    pub fn new(source: S, classifier: TradeClassifier) -> Self {
        Self {
            source,
            classifier,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Trades of `account` within `lookback` of its newest transaction, in
    /// ascending time order without duplicate signatures.
    ///
    /// The newest transaction only anchors the window and the cursor; it is
    /// not part of the result. An account with no transactions gives an empty
    /// history. Any provider failure aborts the whole fetch so callers never
    /// judge a wallet on a partial history.
    pub async fn fetch_history(
        &self,
        account: &str,
        lookback: Option<Duration>,
    ) -> Result<TradeHistory, HistoryError> {
        let latest = match self.source.latest_transaction(account).await {
            Ok(Some(latest)) => latest,
            Ok(None) => {
                info!("📭 No transactions found for {}", account);
                return Ok(TradeHistory::empty());
            }
            Err(source) => {
                return Err(HistoryError::LatestTransaction {
                    account: account.to_string(),
                    provider: self.source.provider(),
                    source,
                })
            }
        };

        let window = FetchWindow::ending_at(latest.block_time, lookback);
        debug!(
            "Fetching history of {} from {} to {}",
            account,
            window
                .start
                .map(|s| s.to_rfc3339())
                .unwrap_or_else(|| "the beginning".to_string()),
            window.end.to_rfc3339()
        );

        let mut pager = WindowedPager {
            source: &self.source,
            classifier: &self.classifier,
            account,
            window,
            cursor: latest.signature.clone(),
            batch_size: self.batch_size,
            seen: HashSet::from([latest.signature]),
            pages_fetched: 0,
            finished: false,
        };

        let mut trades = Vec::new();
        while let Some(page) = pager.next_page().await? {
            trades.extend(page);
        }

        // Pages were consumed newest first
        trades.reverse();
        trades.sort_by_key(|t| t.timestamp);

        info!(
            "📄 {} trades in window for {} ({} pages)",
            trades.len(),
            account,
            pager.pages_fetched
        );

        Ok(TradeHistory {
            window: Some(window),
            trades,
            pages_fetched: pager.pages_fetched,
        })
    }
}

/// Cursor state for a single fetch. Not restartable: once `finished` is set
/// it only ever yields `None`.
struct WindowedPager<'a, S> {
    source: &'a S,
    classifier: &'a TradeClassifier,
    account: &'a str,
    window: FetchWindow,
    cursor: String,
    batch_size: u32,
    seen: HashSet<String>,
    pages_fetched: u32,
    finished: bool,
}

impl<'a, S: TransactionHistorySource> WindowedPager<'a, S> {
    /// Next page of in-window trades, newest first. `None` once history is
    /// exhausted or the window start has been crossed.
    async fn next_page(&mut self) -> Result<Option<Vec<NormalizedTrade>>, HistoryError> {
        if self.finished {
            return Ok(None);
        }

        let page = self.pages_fetched + 1;
        let batch = match self
            .source
            .transactions_before(self.account, &self.cursor, self.batch_size)
            .await
        {
            Ok(batch) => batch,
            Err(source) => {
                self.finished = true;
                return Err(HistoryError::Page {
                    account: self.account.to_string(),
                    page,
                    cursor: self.cursor.clone(),
                    provider: self.source.provider(),
                    source,
                });
            }
        };
        self.pages_fetched = page;

        let Some(oldest) = batch.next_cursor else {
            debug!("📄 Page {}: history exhausted for {}", page, self.account);
            self.finished = true;
            return Ok(None);
        };
        if batch.transactions.is_empty() {
            warn!(
                "📄 Page {}: no usable records for {}, continuing before {}",
                page, self.account, oldest
            );
        }

        let mut trades = Vec::with_capacity(batch.transactions.len());
        for tx in &batch.transactions {
            if self.window.is_before_start(tx.block_time) {
                debug!(
                    "📄 Page {}: {} is older than the window, stopping",
                    page, tx.signature
                );
                self.finished = true;
                break;
            }
            if !self.seen.insert(tx.signature.clone()) {
                debug!("Skipping duplicate {}", tx.signature);
                continue;
            }
            if tx.block_time > self.window.end {
                warn!(
                    "Skipping {} of {}: newer than the window end",
                    tx.signature, self.account
                );
                continue;
            }
            trades.push(self.classifier.classify(tx));
        }

        debug!(
            "📄 Page {}: {} records, {} kept for {}",
            page,
            batch.transactions.len(),
            trades.len(),
            self.account
        );

        if !self.finished {
            if oldest == self.cursor {
                warn!(
                    "Cursor did not advance past {} for {}, stopping",
                    self.cursor, self.account
                );
                self.finished = true;
            } else {
                self.cursor = oldest;
            }
        }

        Ok(Some(trades))
    }
}
