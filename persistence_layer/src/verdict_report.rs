use csv::Writer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use wallet_core::WalletVerdict;

use crate::{PersistenceError, Result};

pub const VERDICT_REPORT_FILE: &str = "wallet_verdicts.csv";

/// One CSV line per screened wallet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerdictRow {
    pub wallet: String,
    pub profitable: bool,
    pub win_rate: String,
    pub roi_percentage: String,
    pub trades_in_window: usize,
    pub sniper: bool,
    pub qualified: bool,
    pub sniped_tokens: String,
    pub note: String,
}

impl From<&WalletVerdict> for VerdictRow {
    fn from(verdict: &WalletVerdict) -> Self {
        let sniped_tokens = verdict
            .sniping
            .as_ref()
            .map(|report| {
                report
                    .sniped_tokens
                    .iter()
                    .map(|t| t.token_address.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        Self {
            wallet: verdict.wallet.clone(),
            profitable: verdict.is_profitable(),
            win_rate: verdict
                .profitability
                .win_rate
                .map(|w| format!("{:.2}", w))
                .unwrap_or_default(),
            roi_percentage: verdict
                .profitability
                .roi_percentage
                .map(|r| format!("{:.2}", r))
                .unwrap_or_default(),
            trades_in_window: verdict.trades_in_window,
            sniper: verdict.is_sniper,
            qualified: verdict.is_qualified,
            sniped_tokens,
            note: verdict.note.clone(),
        }
    }
}

/// Verdicts collected over a run, written once at the end
#[derive(Debug, Clone, Default)]
pub struct VerdictReport {
    rows: Vec<VerdictRow>,
}

impl VerdictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, verdict: &WalletVerdict) {
        self.rows.push(VerdictRow::from(verdict));
    }

    /// A wallet that could not be screened to the end
    pub fn push_failure(&mut self, wallet: &str, profitable: bool, reason: &str) {
        self.rows.push(VerdictRow {
            wallet: wallet.to_string(),
            profitable,
            win_rate: String::new(),
            roi_percentage: String::new(),
            trades_in_window: 0,
            sniper: false,
            qualified: false,
            sniped_tokens: String::new(),
            note: format!("error: {}", reason),
        });
    }

    pub fn rows(&self) -> &[VerdictRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut wtr = Writer::from_writer(Vec::new());
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        // The header is only emitted with the first row
        if self.rows.is_empty() {
            wtr.write_record([
                "wallet",
                "profitable",
                "win_rate",
                "roi_percentage",
                "trades_in_window",
                "sniper",
                "qualified",
                "sniped_tokens",
                "note",
            ])?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| PersistenceError::io(Path::new(VERDICT_REPORT_FILE), e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Overwrites `wallet_verdicts.csv` in `outputs_dir`
    pub async fn write_to(&self, outputs_dir: &Path) -> Result<PathBuf> {
        let path = outputs_dir.join(VERDICT_REPORT_FILE);
        let csv = self.to_csv()?;
        tokio::fs::write(&path, csv)
            .await
            .map_err(|e| PersistenceError::io(&path, e))?;
        info!("📊 Wrote {} verdicts to {}", self.rows.len(), path.display());
        Ok(path)
    }
}
