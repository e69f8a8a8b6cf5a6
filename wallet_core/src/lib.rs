pub mod classifier;
pub mod history;
pub mod pool_cache;
pub mod profitability;
pub mod sniping;
pub mod verdict;

pub use classifier::{parse_amount, TradeClassifier};
pub use history::{FetchWindow, HistoryError, HistoryPaginator, TradeHistory, DEFAULT_BATCH_SIZE};
pub use pool_cache::CachedPoolInfo;
pub use profitability::{roi_percentage, ProfitabilityAssessment, ProfitabilityFilter};
pub use sniping::{detect_sniping, SnipedToken, SnipingDetector, SnipingReport};
pub use verdict::WalletVerdict;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Failure reported by an external collaborator. Always scoped to a single
/// wallet, page or token; never fatal to a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("{provider} HTTP request error: {message}")]
    Http { provider: &'static str, message: String },
    #[error("{provider} rate limit exceeded")]
    RateLimit { provider: &'static str },
    #[error("{provider} API error: {message}")]
    Api { provider: &'static str, message: String },
    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse { provider: &'static str, message: String },
}

impl SourceError {
    pub fn provider(&self) -> &'static str {
        match self {
            SourceError::Http { provider, .. }
            | SourceError::RateLimit { provider }
            | SourceError::Api { provider, .. }
            | SourceError::InvalidResponse { provider, .. } => provider,
        }
    }
}

/// One on-chain transaction as reported by the history provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawTransaction {
    /// Transaction signature, unique across the chain
    pub signature: String,

    /// Block time of the slot the transaction landed in
    pub block_time: DateTime<Utc>,

    /// Provider status string ("Success", "Fail", ...)
    pub status: String,

    /// Parsed actions in instruction order
    pub actions: Vec<RawAction>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawAction {
    pub action_type: Option<String>,
    pub tokens_swapped: Option<RawSwap>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSwap {
    pub token_in: Option<RawSwapLeg>,
    pub token_out: Option<RawSwapLeg>,
}

/// Amount is kept as the provider's text so the classifier decides how to parse it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSwapLeg {
    pub symbol: Option<String>,
    pub token_address: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TradeType {
    /// Native asset paid in
    Buy,
    /// Some other known token paid in
    Sell,
    /// No swap data to decide from
    Unknown,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => write!(f, "buy"),
            TradeType::Sell => write!(f, "sell"),
            TradeType::Unknown => write!(f, "N/A"),
        }
    }
}

/// One side of a swap. `None` in any field is the explicit "unknown" marker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenLeg {
    pub symbol: Option<String>,
    pub address: Option<String>,
    pub amount: Option<Decimal>,
}

impl TokenLeg {
    pub fn is_unknown(&self) -> bool {
        self.symbol.is_none() && self.address.is_none() && self.amount.is_none()
    }
}

impl fmt::Display for TokenLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = self
            .amount
            .map(|a| a.normalize().to_string())
            .unwrap_or_else(|| "N/A".to_string());
        write!(
            f,
            "{} {} ({})",
            amount,
            self.symbol.as_deref().unwrap_or("N/A"),
            self.address.as_deref().unwrap_or("N/A")
        )
    }
}

/// A transaction reduced to what the screening needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedTrade {
    pub signature: String,
    pub trade_type: TradeType,
    pub timestamp: DateTime<Utc>,
    /// What the wallet paid with
    pub token_in: TokenLeg,
    /// What the wallet received
    pub token_out: TokenLeg,
}

/// Newest transaction of an account, used to anchor a fetch window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LatestTransaction {
    pub signature: String,
    pub block_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPoolInfo {
    pub token_address: String,
    /// Earliest creation time across every pool reported for the token
    pub earliest_pool_creation_time: DateTime<Utc>,
}

impl TokenPoolInfo {
    /// Build from pool creation times in Unix milliseconds. Missing or
    /// non-positive values are ignored; `None` when nothing usable remains.
    pub fn from_pool_timestamps(token_address: &str, created_at_ms: &[Option<i64>]) -> Option<Self> {
        created_at_ms
            .iter()
            .flatten()
            .filter(|ms| **ms > 0)
            .min()
            .and_then(|ms| DateTime::from_timestamp_millis(*ms))
            .map(|earliest| Self {
                token_address: token_address.to_string(),
                earliest_pool_creation_time: earliest,
            })
    }
}

/// Aggregate trading performance of a wallet as reported by the PnL provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletPnlSummary {
    /// Percentage 0-100; absent when the wallet has no closed trades
    pub win_percentage: Option<Decimal>,
    pub total_profit: Decimal,
    pub total_invested: Decimal,
}

/// Latest-transaction and paginated-history lookups
#[async_trait]
pub trait TransactionHistorySource: Send + Sync {
    fn provider(&self) -> &'static str;

    /// Newest transaction of `account`, `None` when it has none
    async fn latest_transaction(
        &self,
        account: &str,
    ) -> std::result::Result<Option<LatestTransaction>, SourceError>;

    /// Up to `batch_size` records strictly older than `before_signature`,
    /// newest first. A page without a cursor means history is exhausted.
    async fn transactions_before(
        &self,
        account: &str,
        before_signature: &str,
        batch_size: u32,
    ) -> std::result::Result<HistoryPage, SourceError>;
}

/// One page of history as the provider returned it.
///
/// `transactions` holds only the well-formed records, so it can be empty
/// while the page still had records. `next_cursor` is the signature of the
/// oldest record on the page, malformed or not, and is `None` only when the
/// provider returned nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPage {
    pub transactions: Vec<RawTransaction>,
    pub next_cursor: Option<String>,
}

impl HistoryPage {
    /// Page where every record was usable
    pub fn from_transactions(transactions: Vec<RawTransaction>) -> Self {
        let next_cursor = transactions.last().map(|tx| tx.signature.clone());
        Self {
            transactions,
            next_cursor,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Liquidity pool metadata lookup
#[async_trait]
pub trait PoolInfoSource: Send + Sync {
    async fn token_pool_info(
        &self,
        token_address: &str,
    ) -> std::result::Result<TokenPoolInfo, SourceError>;
}

#[async_trait]
impl<P: PoolInfoSource + ?Sized> PoolInfoSource for &P {
    async fn token_pool_info(
        &self,
        token_address: &str,
    ) -> std::result::Result<TokenPoolInfo, SourceError> {
        (**self).token_pool_info(token_address).await
    }
}

#[async_trait]
impl<P: PoolInfoSource + ?Sized> PoolInfoSource for Arc<P> {
    async fn token_pool_info(
        &self,
        token_address: &str,
    ) -> std::result::Result<TokenPoolInfo, SourceError> {
        (**self).token_pool_info(token_address).await
    }
}

/// Wallet profit and loss lookup
#[async_trait]
pub trait WalletPnlSource: Send + Sync {
    async fn wallet_pnl(&self, wallet: &str) -> std::result::Result<WalletPnlSummary, SourceError>;
}

#[async_trait]
impl<W: WalletPnlSource + ?Sized> WalletPnlSource for Arc<W> {
    async fn wallet_pnl(&self, wallet: &str) -> std::result::Result<WalletPnlSummary, SourceError> {
        (**self).wallet_pnl(wallet).await
    }
}

#[async_trait]
impl<S: TransactionHistorySource + ?Sized> TransactionHistorySource for Arc<S> {
    fn provider(&self) -> &'static str {
        (**self).provider()
    }

    async fn latest_transaction(
        &self,
        account: &str,
    ) -> std::result::Result<Option<LatestTransaction>, SourceError> {
        (**self).latest_transaction(account).await
    }

    async fn transactions_before(
        &self,
        account: &str,
        before_signature: &str,
        batch_size: u32,
    ) -> std::result::Result<HistoryPage, SourceError> {
        (**self)
            .transactions_before(account, before_signature, batch_size)
            .await
    }
}

static SOLANA_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").expect("static regex"));

/// Base58, 32 to 44 characters
pub fn is_valid_wallet_address(address: &str) -> bool {
    SOLANA_ADDRESS.is_match(address)
}
