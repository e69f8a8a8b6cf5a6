use chrono::{DateTime, Duration, Utc};
use config_manager::SystemConfig;
use futures::stream::{self, StreamExt};
use persistence_layer::{VerdictReport, WalletList, WalletStore};
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;
use wallet_core::{
    CachedPoolInfo, HistoryPaginator, PoolInfoSource, ProfitabilityFilter, SnipingDetector,
    TradeClassifier, TransactionHistorySource, WalletPnlSource, WalletVerdict,
};

use crate::{OrchestratorError, Result};

/// Counters of one screening run
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub candidates: usize,
    pub profitable: usize,
    pub qualified: usize,
    pub snipers: usize,
    pub no_recent_activity: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn new(candidates: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            candidates,
            profitable: 0,
            qualified: 0,
            snipers: 0,
            no_recent_activity: 0,
            failed: 0,
        }
    }

    pub fn log_summary(&self) {
        let elapsed = self
            .finished_at
            .map(|end| (end - self.started_at).num_seconds())
            .unwrap_or_default();
        info!("📊 Run {} finished in {}s", self.run_id, elapsed);
        info!("   • Candidates: {}", self.candidates);
        info!("   • Profitable: {}", self.profitable);
        info!("   • Snipers: {}", self.snipers);
        info!("   • No recent activity: {}", self.no_recent_activity);
        info!("   • Failed: {}", self.failed);
        info!("   • Qualified: {}", self.qualified);
    }
}

/// Profitability, then recent history, then sniping, per wallet.
///
/// Wallets may be evaluated concurrently up to `max_concurrent_wallets`;
/// a single wallet's history is always paged sequentially. Pool lookups
/// are cached for the lifetime of the pipeline.
pub struct WalletQualificationPipeline<H, P, W> {
    paginator: HistoryPaginator<H>,
    sniping: SnipingDetector<CachedPoolInfo<P>>,
    pnl: W,
    filter: ProfitabilityFilter,
    lookback: Duration,
    max_concurrent_wallets: usize,
}

impl<H, P, W> WalletQualificationPipeline<H, P, W>
where
    H: TransactionHistorySource,
    P: PoolInfoSource,
    W: WalletPnlSource,
{
    pub fn new(config: &SystemConfig, history: H, pools: P, pnl: W) -> Result<Self> {
        config
            .screening
            .validate()
            .map_err(|e| OrchestratorError::Config(e.to_string()))?;
        let filter = ProfitabilityFilter::from_config(&config.thresholds)?;
        let classifier = TradeClassifier::new(config.screening.native_symbol.clone());

        Ok(Self {
            paginator: HistoryPaginator::new(history, classifier)
                .with_batch_size(config.shyft.page_size),
            sniping: SnipingDetector::new(
                CachedPoolInfo::new(pools),
                Duration::seconds(config.screening.sniping_window_seconds),
            ),
            pnl,
            filter,
            lookback: Duration::days(config.screening.lookback_days),
            max_concurrent_wallets: config.system.max_concurrent_wallets.max(1),
        })
    }

    pub fn filter(&self) -> &ProfitabilityFilter {
        &self.filter
    }

    pub fn paginator(&self) -> &HistoryPaginator<H> {
        &self.paginator
    }

    pub fn sniping_detector(&self) -> &SnipingDetector<CachedPoolInfo<P>> {
        &self.sniping
    }

    /// Verdict for one wallet. Errors mean the wallet could not be judged;
    /// a history error only happens after the wallet passed profitability.
    pub async fn qualify_wallet(&self, wallet: &str) -> Result<WalletVerdict> {
        let summary = self
            .pnl
            .wallet_pnl(wallet)
            .await
            .map_err(|source| OrchestratorError::Pnl {
                wallet: wallet.to_string(),
                source,
            })?;

        let profitability = self.filter.evaluate(wallet, &summary);
        if !profitability.passes {
            debug!("{} is not profitable enough", wallet);
            return Ok(WalletVerdict::unprofitable(profitability));
        }
        info!("💰 {} is profitable and winning, checking recent trades", wallet);

        let history = self
            .paginator
            .fetch_history(wallet, Some(self.lookback))
            .await?;

        if history.is_empty() {
            info!("📭 {} has no transactions in the last {} days", wallet, self.lookback.num_days());
            return Ok(WalletVerdict::no_recent_activity(profitability));
        }

        let sniping = self.sniping.evaluate(wallet, history.as_slice()).await;
        Ok(WalletVerdict::screened(profitability, history.len(), sniping))
    }

    /// Screens every candidate, appending profitable and qualified wallets
    /// to their files as verdicts arrive. Only output I/O errors abort.
    pub async fn run(
        &self,
        candidates: &[String],
        store: &WalletStore,
    ) -> Result<(RunStats, VerdictReport)> {
        let mut stats = RunStats::new(candidates.len());
        let mut report = VerdictReport::new();
        info!(
            "🚀 Run {}: screening {} wallets ({} at a time)",
            stats.run_id,
            candidates.len(),
            self.max_concurrent_wallets
        );

        let mut verdicts = stream::iter(candidates.iter().cloned())
            .map(|wallet| async move {
                let result = self.qualify_wallet(&wallet).await;
                (wallet, result)
            })
            .buffer_unordered(self.max_concurrent_wallets);

        while let Some((wallet, result)) = verdicts.next().await {
            match result {
                Ok(verdict) => {
                    if verdict.is_profitable() {
                        stats.profitable += 1;
                        store.append_wallet(WalletList::Profitable, &wallet).await?;
                        if verdict.trades_in_window == 0 {
                            stats.no_recent_activity += 1;
                        }
                    }
                    if verdict.is_sniper {
                        stats.snipers += 1;
                        info!("🎯 {} is sniping: {}", wallet, verdict.note);
                    }
                    if verdict.is_qualified {
                        stats.qualified += 1;
                        store.append_wallet(WalletList::Qualified, &wallet).await?;
                        info!("✅ {} is profitable, winning and not sniping", wallet);
                    }
                    report.push(&verdict);
                }
                Err(OrchestratorError::History(e)) => {
                    error!("❌ {}", e);
                    stats.profitable += 1;
                    stats.failed += 1;
                    store.append_wallet(WalletList::Profitable, &wallet).await?;
                    report.push_failure(&wallet, true, &e.to_string());
                }
                Err(e) => {
                    error!("❌ {}", e);
                    stats.failed += 1;
                    report.push_failure(&wallet, false, &e.to_string());
                }
            }
        }

        stats.finished_at = Some(Utc::now());
        Ok((stats, report))
    }
}
