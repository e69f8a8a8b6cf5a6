//! Wire types of the Shyft and Solana Tracker APIs. Everything the screener
//! does not strictly need is optional so a schema drift on an unrelated field
//! never fails a whole page.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use wallet_core::{RawAction, RawSwap, RawSwapLeg, RawTransaction, WalletPnlSummary};

/// `GET /transaction/history`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShyftHistoryResponse {
    pub success: Option<bool>,
    pub message: Option<String>,
    pub result: Option<Vec<ShyftTransaction>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShyftTransaction {
    #[serde(default)]
    pub signatures: Vec<String>,
    /// RFC 3339 block time
    pub timestamp: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    #[serde(default)]
    pub actions: Vec<ShyftAction>,
    pub raw: Option<ShyftRaw>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShyftRaw {
    #[serde(rename = "blockTime")]
    pub block_time: Option<i64>,
    pub slot: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShyftAction {
    #[serde(rename = "type")]
    pub action_type: Option<String>,
    pub info: Option<ShyftActionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShyftActionInfo {
    pub swapper: Option<String>,
    pub tokens_swapped: Option<ShyftTokenSwapped>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShyftTokenSwapped {
    #[serde(rename = "in")]
    pub token_in: Option<ShyftSwapLeg>,
    pub out: Option<ShyftSwapLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShyftSwapLeg {
    pub token_address: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    /// Number or string depending on the endpoint version
    pub amount: Option<serde_json::Value>,
}

impl ShyftTransaction {
    pub fn signature(&self) -> Option<&str> {
        self.signatures.first().map(String::as_str)
    }

    /// `raw.blockTime`, falling back to the RFC 3339 `timestamp`
    pub fn block_time(&self) -> Option<DateTime<Utc>> {
        self.raw
            .as_ref()
            .and_then(|raw| raw.block_time)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| {
                self.timestamp
                    .as_deref()
                    .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                    .map(|ts| ts.with_timezone(&Utc))
            })
    }

    /// Fails with a reason when the record has no signature or block time
    pub fn into_raw(self) -> Result<RawTransaction, String> {
        let block_time = self
            .block_time()
            .ok_or_else(|| "missing block time".to_string())?;
        let signature = self
            .signature()
            .map(str::to_string)
            .ok_or_else(|| "missing signature".to_string())?;

        Ok(RawTransaction {
            signature,
            block_time,
            status: self.status.unwrap_or_else(|| "Unknown".to_string()),
            actions: self.actions.into_iter().map(ShyftAction::into_raw).collect(),
        })
    }
}

impl ShyftAction {
    fn into_raw(self) -> RawAction {
        RawAction {
            action_type: self.action_type,
            tokens_swapped: self
                .info
                .and_then(|info| info.tokens_swapped)
                .map(|swap| RawSwap {
                    token_in: swap.token_in.map(ShyftSwapLeg::into_raw),
                    token_out: swap.out.map(ShyftSwapLeg::into_raw),
                }),
        }
    }
}

impl ShyftSwapLeg {
    fn into_raw(self) -> RawSwapLeg {
        RawSwapLeg {
            symbol: self.symbol,
            token_address: self.token_address,
            amount: self.amount.and_then(|amount| match amount {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
        }
    }
}

/// `GET /top-traders/all/{page}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopTradersPage {
    #[serde(default)]
    pub wallets: Vec<LeaderboardWallet>,
    #[serde(rename = "hasNext", default)]
    pub has_next: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardWallet {
    pub wallet: String,
    pub summary: Option<TraderSummary>,
}

/// Aggregate PnL block shared by the leaderboard and `/pnl/{wallet}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraderSummary {
    pub realized: Option<f64>,
    pub unrealized: Option<f64>,
    pub total: Option<f64>,
    pub total_invested: Option<f64>,
    pub total_wins: Option<u64>,
    pub total_losses: Option<u64>,
    /// 0-100
    pub win_percentage: Option<f64>,
}

impl TraderSummary {
    pub fn to_pnl_summary(&self) -> WalletPnlSummary {
        WalletPnlSummary {
            win_percentage: self.win_percentage.and_then(to_decimal),
            total_profit: self.total.and_then(to_decimal).unwrap_or(Decimal::ZERO),
            total_invested: self
                .total_invested
                .and_then(to_decimal)
                .unwrap_or(Decimal::ZERO),
        }
    }
}

/// One entry of `GET /tokens/trending/{timeframe}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingTokenEntry {
    pub token: TrendingToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingToken {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub mint: String,
}

/// One entry of `GET /top-traders/{token}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTopTrader {
    pub wallet: String,
    pub held: Option<f64>,
    pub sold: Option<f64>,
    pub realized: Option<f64>,
    pub unrealized: Option<f64>,
    pub total: Option<f64>,
    pub total_invested: Option<f64>,
}

impl TokenTopTrader {
    /// Token leaderboards report no win rate
    pub fn to_pnl_summary(&self) -> WalletPnlSummary {
        WalletPnlSummary {
            win_percentage: None,
            total_profit: self.total.and_then(to_decimal).unwrap_or(Decimal::ZERO),
            total_invested: self
                .total_invested
                .and_then(to_decimal)
                .unwrap_or(Decimal::ZERO),
        }
    }
}

/// `GET /trades/{token}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTradesPage {
    #[serde(default)]
    pub trades: Vec<TokenTrade>,
    /// Opaque; numeric on the current API
    pub next_cursor: Option<serde_json::Value>,
    #[serde(default)]
    pub has_next_page: bool,
}

impl TokenTradesPage {
    pub fn cursor(&self) -> Option<String> {
        match self.next_cursor.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenTrade {
    pub tx: Option<String>,
    pub wallet: String,
    #[serde(rename = "type")]
    pub trade_type: Option<String>,
    /// Unix milliseconds
    pub time: Option<i64>,
}

/// `GET /pnl/{wallet}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletPnlResponse {
    pub summary: Option<TraderSummary>,
}

/// `GET /tokens/{token}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfoResponse {
    #[serde(default)]
    pub pools: Vec<TokenPool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPool {
    pub pool_id: Option<String>,
    pub market: Option<String>,
    /// Unix milliseconds
    pub created_at: Option<f64>,
}

impl TokenInfoResponse {
    pub fn pool_timestamps_ms(&self) -> Vec<Option<i64>> {
        self.pools
            .iter()
            .map(|pool| pool.created_at.map(|ms| ms as i64))
            .collect()
    }
}

fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}
