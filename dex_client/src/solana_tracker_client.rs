use async_trait::async_trait;
use config_manager::SolanaTrackerConfig;
use rate_limiter::RateLimiter;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use wallet_core::{PoolInfoSource, SourceError, TokenPoolInfo, WalletPnlSource, WalletPnlSummary};

use crate::types::{
    TokenInfoResponse, TokenTopTrader, TokenTradesPage, TopTradersPage, TrendingTokenEntry,
    WalletPnlResponse,
};

pub const PROVIDER: &str = "solana_tracker";

#[derive(Error, Debug)]
pub enum SolanaTrackerError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<SolanaTrackerError> for SourceError {
    fn from(err: SolanaTrackerError) -> Self {
        match err {
            SolanaTrackerError::Http(e) => SourceError::Http {
                provider: PROVIDER,
                message: e.to_string(),
            },
            SolanaTrackerError::Api(message) => SourceError::Api {
                provider: PROVIDER,
                message,
            },
            SolanaTrackerError::RateLimit => SourceError::RateLimit { provider: PROVIDER },
            SolanaTrackerError::InvalidResponse(message) => SourceError::InvalidResponse {
                provider: PROVIDER,
                message,
            },
        }
    }
}

/// Analytics client: wallet PnL, token pools and the discovery leaderboards
pub struct SolanaTrackerClient {
    config: SolanaTrackerConfig,
    http_client: Client,
    limiter: Arc<dyn RateLimiter>,
}

impl SolanaTrackerClient {
    pub fn new(
        config: SolanaTrackerConfig,
        limiter: Arc<dyn RateLimiter>,
    ) -> Result<Self, SolanaTrackerError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
            limiter,
        })
    }

    pub fn config(&self) -> &SolanaTrackerConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SolanaTrackerError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        self.limiter.acquire().await;
        debug!("GET {} {:?}", path, query);

        let response = self
            .http_client
            .get(&url)
            .header("x-api-key", &self.config.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Solana Tracker rate limit hit on {}", path);
            return Err(SolanaTrackerError::RateLimit);
        }

        let body = response.text().await?;
        if !status.is_success() {
            error!(
                "Solana Tracker API error for {}: HTTP {} - Body: {}",
                path, status, body
            );
            return Err(SolanaTrackerError::Api(format!("HTTP {} - {}", status, body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| SolanaTrackerError::InvalidResponse(format!("{}: {}", path, e)))
    }

    /// One page (1-based) of the global top-traders leaderboard
    pub async fn get_top_traders_page(&self, page: u32) -> Result<TopTradersPage, SolanaTrackerError> {
        let page: TopTradersPage = self
            .get_json(&format!("/top-traders/all/{}", page), &[])
            .await?;
        debug!(
            "Retrieved {} leaderboard wallets (has next: {})",
            page.wallets.len(),
            page.has_next
        );
        Ok(page)
    }

    pub async fn get_trending_tokens(
        &self,
        timeframe: &str,
    ) -> Result<Vec<TrendingTokenEntry>, SolanaTrackerError> {
        let tokens: Vec<TrendingTokenEntry> = self
            .get_json(&format!("/tokens/trending/{}", timeframe), &[])
            .await?;
        info!("Retrieved {} trending tokens ({})", tokens.len(), timeframe);
        Ok(tokens)
    }

    pub async fn get_token_top_traders(
        &self,
        token_address: &str,
    ) -> Result<Vec<TokenTopTrader>, SolanaTrackerError> {
        let traders: Vec<TokenTopTrader> = self
            .get_json(&format!("/top-traders/{}", token_address), &[])
            .await?;
        debug!("Retrieved {} top traders for {}", traders.len(), token_address);
        Ok(traders)
    }

    /// Recent trades of a token, excluding arbitrage, with Jupiter routes merged
    pub async fn get_token_trades(
        &self,
        token_address: &str,
        cursor: Option<&str>,
    ) -> Result<TokenTradesPage, SolanaTrackerError> {
        let mut query = vec![("parseJupiter", "true"), ("hideArb", "true")];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }
        self.get_json(&format!("/trades/{}", token_address), &query)
            .await
    }

    pub async fn get_wallet_pnl(&self, wallet: &str) -> Result<WalletPnlResponse, SolanaTrackerError> {
        self.get_json(
            &format!("/pnl/{}", wallet),
            &[("showHistoricPnL", "true"), ("hideDetails", "true")],
        )
        .await
    }

    pub async fn get_token_info(
        &self,
        token_address: &str,
    ) -> Result<TokenInfoResponse, SolanaTrackerError> {
        self.get_json(&format!("/tokens/{}", token_address), &[])
            .await
    }
}

#[async_trait]
impl WalletPnlSource for SolanaTrackerClient {
    async fn wallet_pnl(&self, wallet: &str) -> Result<WalletPnlSummary, SourceError> {
        let response = self.get_wallet_pnl(wallet).await?;
        response
            .summary
            .map(|summary| summary.to_pnl_summary())
            .ok_or_else(|| SourceError::InvalidResponse {
                provider: PROVIDER,
                message: format!("no PnL summary for {}", wallet),
            })
    }
}

#[async_trait]
impl PoolInfoSource for SolanaTrackerClient {
    async fn token_pool_info(&self, token_address: &str) -> Result<TokenPoolInfo, SourceError> {
        let info = self.get_token_info(token_address).await?;
        TokenPoolInfo::from_pool_timestamps(token_address, &info.pool_timestamps_ms()).ok_or_else(
            || SourceError::InvalidResponse {
                provider: PROVIDER,
                message: format!(
                    "no pool creation time for {} ({} pools)",
                    token_address,
                    info.pools.len()
                ),
            },
        )
    }
}
