use config_manager::ThresholdsConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::{CoreError, Result, WalletPnlSummary};

/// Threshold check of a wallet's aggregate PnL. Win rate and ROI are
/// percentages (0-100).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitabilityFilter {
    pub winrate_min: Decimal,
    pub winrate_max: Decimal,
    pub roi_min: Decimal,
    pub invested_min: Decimal,
}

/// Outcome of one wallet against the thresholds, rule by rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfitabilityAssessment {
    pub wallet_address: String,
    pub passes: bool,
    pub win_rate: Option<Decimal>,
    /// `None` when nothing was invested
    pub roi_percentage: Option<Decimal>,
    pub win_rate_in_range: bool,
    pub profitable: bool,
    pub invested_enough: bool,
    pub roi_ok: bool,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
}

impl ProfitabilityAssessment {
    /// Rules used on the global leaderboard, which carries no reliable invested figure
    pub fn passes_leaderboard(&self) -> bool {
        self.win_rate_in_range && self.profitable && self.roi_ok
    }

    /// Rules used on a single token's leaderboard, which carries no win rate
    pub fn passes_token_leaderboard(&self) -> bool {
        self.profitable && self.invested_enough && self.roi_ok
    }
}

impl ProfitabilityFilter {
    pub fn from_config(config: &ThresholdsConfig) -> Result<Self> {
        Ok(Self {
            winrate_min: threshold("WINRATE_MIN", config.winrate_min)?,
            winrate_max: threshold("WINRATE_MAX", config.winrate_max)?,
            roi_min: threshold("ROI_MIN", config.roi_min)?,
            invested_min: threshold("INVESTED_MIN", config.invested_min)?,
        })
    }

    pub fn evaluate(&self, wallet: &str, summary: &WalletPnlSummary) -> ProfitabilityAssessment {
        debug!("🔍 Evaluating profitability of {}", wallet);

        let mut assessment = ProfitabilityAssessment {
            wallet_address: wallet.to_string(),
            passes: false,
            win_rate: summary.win_percentage,
            roi_percentage: roi_percentage(summary.total_profit, summary.total_invested),
            win_rate_in_range: false,
            profitable: false,
            invested_enough: false,
            roi_ok: false,
            strengths: Vec::new(),
            concerns: Vec::new(),
        };

        match summary.win_percentage {
            Some(w) if w >= self.winrate_min && w <= self.winrate_max => {
                assessment.win_rate_in_range = true;
                assessment.strengths.push(format!("Win rate in range: {:.1}%", w));
            }
            Some(w) => assessment.concerns.push(format!(
                "Win rate {:.1}% outside {:.1}%..{:.1}%",
                w, self.winrate_min, self.winrate_max
            )),
            None => assessment.concerns.push("No win rate reported".to_string()),
        }

        if summary.total_profit > Decimal::ZERO {
            assessment.profitable = true;
            assessment
                .strengths
                .push(format!("Profitable: ${:.2}", summary.total_profit));
        } else {
            assessment
                .concerns
                .push(format!("Not profitable: ${:.2}", summary.total_profit));
        }

        if summary.total_invested > self.invested_min {
            assessment.invested_enough = true;
            assessment
                .strengths
                .push(format!("Invested ${:.2}", summary.total_invested));
        } else {
            assessment.concerns.push(format!(
                "Low investment: ${:.2} <= ${:.2}",
                summary.total_invested, self.invested_min
            ));
        }

        match assessment.roi_percentage {
            Some(roi) if roi >= self.roi_min => {
                assessment.roi_ok = true;
                assessment.strengths.push(format!("Strong ROI: {:.1}%", roi));
            }
            Some(roi) => assessment
                .concerns
                .push(format!("Low ROI: {:.1}% < {:.1}%", roi, self.roi_min)),
            None => assessment
                .concerns
                .push("ROI undefined: nothing invested".to_string()),
        }

        assessment.passes = assessment.win_rate_in_range
            && assessment.profitable
            && assessment.invested_enough
            && assessment.roi_ok;

        debug!(
            "{} {} profitability: {}",
            if assessment.passes { "✅" } else { "❌" },
            wallet,
            if assessment.passes {
                assessment.strengths.join(", ")
            } else {
                assessment.concerns.join(", ")
            }
        );

        assessment
    }
}

/// `(profit / invested) * 100`, `None` when nothing was invested
pub fn roi_percentage(total_profit: Decimal, total_invested: Decimal) -> Option<Decimal> {
    if total_invested <= Decimal::ZERO {
        return None;
    }
    total_profit
        .checked_div(total_invested)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
}

fn threshold(name: &str, value: Option<f64>) -> Result<Decimal> {
    let value = value.ok_or_else(|| CoreError::Configuration(format!("{} is required", name)))?;
    Decimal::from_str(&value.to_string())
        .map_err(|e| CoreError::Configuration(format!("{} = {} is not a decimal: {}", name, value, e)))
}
