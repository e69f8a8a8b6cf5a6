use async_trait::async_trait;
use config_manager::ShyftConfig;
use rate_limiter::RateLimiter;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use wallet_core::{HistoryPage, LatestTransaction, SourceError, TransactionHistorySource};

use crate::types::{ShyftHistoryResponse, ShyftTransaction};

pub const PROVIDER: &str = "shyft";

#[derive(Error, Debug)]
pub enum ShyftError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<ShyftError> for SourceError {
    fn from(err: ShyftError) -> Self {
        match err {
            ShyftError::Http(e) => SourceError::Http {
                provider: PROVIDER,
                message: e.to_string(),
            },
            ShyftError::Api(message) => SourceError::Api {
                provider: PROVIDER,
                message,
            },
            ShyftError::RateLimit => SourceError::RateLimit { provider: PROVIDER },
            ShyftError::InvalidResponse(message) => SourceError::InvalidResponse {
                provider: PROVIDER,
                message,
            },
        }
    }
}

/// Transaction history client. Every request waits on the shared limiter.
pub struct ShyftClient {
    config: ShyftConfig,
    http_client: Client,
    limiter: Arc<dyn RateLimiter>,
}

impl ShyftClient {
    pub fn new(config: ShyftConfig, limiter: Arc<dyn RateLimiter>) -> Result<Self, ShyftError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            config,
            http_client,
            limiter,
        })
    }

    pub fn config(&self) -> &ShyftConfig {
        &self.config
    }

    /// Up to `tx_num` parsed transactions of `account`, newest first,
    /// optionally strictly before `before_tx_signature`.
    pub async fn get_transaction_history(
        &self,
        account: &str,
        tx_num: u32,
        before_tx_signature: Option<&str>,
    ) -> Result<Vec<ShyftTransaction>, ShyftError> {
        let url = format!("{}/transaction/history", self.config.api_base_url);
        let tx_num = tx_num.to_string();

        let mut query_params = vec![
            ("network", self.config.network.as_str()),
            ("account", account),
            ("tx_num", tx_num.as_str()),
            ("enable_raw", "true"),
            ("enable_events", "true"),
        ];
        if let Some(before) = before_tx_signature {
            query_params.push(("before_tx_signature", before));
        }

        self.limiter.acquire().await;
        debug!(
            "Fetching {} transactions of {} before {:?}",
            tx_num, account, before_tx_signature
        );

        let response = self
            .http_client
            .get(&url)
            .header("x-api-key", &self.config.api_key)
            .query(&query_params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Shyft rate limit hit for {}", account);
            return Err(ShyftError::RateLimit);
        }

        let body = response.text().await?;
        if !status.is_success() {
            error!(
                "Shyft API error for {}: HTTP {} - Body: {}",
                account, status, body
            );
            return Err(ShyftError::Api(format!("HTTP {} - {}", status, body)));
        }

        let history: ShyftHistoryResponse = serde_json::from_str(&body)
            .map_err(|e| ShyftError::InvalidResponse(format!("transaction history: {}", e)))?;

        if history.success == Some(false) {
            return Err(ShyftError::Api(format!(
                "API returned success=false: {}",
                history.message.unwrap_or_default()
            )));
        }

        Ok(history.result.unwrap_or_default())
    }
}

/// Keeps well-formed records; malformed ones are logged and dropped. The
/// cursor still moves past them so older records stay reachable.
fn into_raw_batch(account: &str, batch: Vec<ShyftTransaction>) -> Result<HistoryPage, SourceError> {
    if batch.is_empty() {
        return Ok(HistoryPage::default());
    }

    let next_cursor = batch
        .iter()
        .rev()
        .find_map(|tx| tx.signature().map(str::to_string));
    if next_cursor.is_none() {
        return Err(SourceError::InvalidResponse {
            provider: PROVIDER,
            message: format!(
                "history page of {} has {} records and no signatures",
                account,
                batch.len()
            ),
        });
    }

    let transactions = batch
        .into_iter()
        .filter_map(|tx| {
            let signature = tx.signature().unwrap_or("N/A").to_string();
            match tx.into_raw() {
                Ok(raw) => Some(raw),
                Err(reason) => {
                    warn!(
                        "Skipping malformed transaction {} of {}: {}",
                        signature, account, reason
                    );
                    None
                }
            }
        })
        .collect();

    Ok(HistoryPage {
        transactions,
        next_cursor,
    })
}

#[async_trait]
impl TransactionHistorySource for ShyftClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn latest_transaction(
        &self,
        account: &str,
    ) -> Result<Option<LatestTransaction>, SourceError> {
        let batch = self.get_transaction_history(account, 1, None).await?;

        let Some(latest) = batch.into_iter().next() else {
            return Ok(None);
        };
        let raw = latest.into_raw().map_err(|reason| SourceError::InvalidResponse {
            provider: PROVIDER,
            message: format!("latest transaction of {}: {}", account, reason),
        })?;

        debug!(
            "Latest transaction of {}: {} at {}",
            account, raw.signature, raw.block_time
        );
        Ok(Some(LatestTransaction {
            signature: raw.signature,
            block_time: raw.block_time,
        }))
    }

    async fn transactions_before(
        &self,
        account: &str,
        before_signature: &str,
        batch_size: u32,
    ) -> Result<HistoryPage, SourceError> {
        let batch = self
            .get_transaction_history(account, batch_size, Some(before_signature))
            .await?;
        into_raw_batch(account, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> ShyftTransaction {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_malformed_records_are_dropped() {
        let batch = vec![
            record(r#"{"signatures":["a"],"raw":{"blockTime":1700000000},"actions":[]}"#),
            record(r#"{"signatures":[],"raw":{"blockTime":1700000000}}"#),
            record(r#"{"signatures":["c"]}"#),
            record(r#"{"signatures":["d"],"timestamp":"2023-11-14T22:13:20.000Z"}"#),
        ];

        let page = into_raw_batch("wallet", batch).unwrap();

        let signatures: Vec<_> = page.transactions.iter().map(|t| t.signature.as_str()).collect();
        assert_eq!(signatures, vec!["a", "d"]);
        assert_eq!(page.transactions[1].block_time.timestamp(), 1_700_000_000);
        assert_eq!(page.next_cursor.as_deref(), Some("d"));
    }

    #[test]
    fn test_cursor_moves_past_malformed_records() {
        let batch = vec![
            record(r#"{"signatures":["m1"]}"#),
            record(r#"{"signatures":["m2"],"raw":{}}"#),
        ];

        let page = into_raw_batch("wallet", batch).unwrap();

        assert!(page.transactions.is_empty());
        assert!(!page.is_exhausted());
        assert_eq!(page.next_cursor.as_deref(), Some("m2"));
    }

    #[test]
    fn test_page_without_any_signature_is_invalid() {
        let batch = vec![record(r#"{"signatures":[],"raw":{"blockTime":1700000000}}"#)];

        let err = into_raw_batch("wallet", batch).unwrap_err();
        assert!(matches!(err, SourceError::InvalidResponse { provider: "shyft", .. }));
    }

    #[test]
    fn test_empty_page_is_exhausted() {
        assert!(into_raw_batch("wallet", Vec::new()).unwrap().is_exhausted());
    }

    #[test]
    fn test_error_conversion_keeps_provider() {
        let err: SourceError = ShyftError::RateLimit.into();
        assert_eq!(err, SourceError::RateLimit { provider: "shyft" });

        let err: SourceError = ShyftError::Api("HTTP 500".to_string()).into();
        assert_eq!(err.provider(), "shyft");
    }
}
