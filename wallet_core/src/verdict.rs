use serde::{Deserialize, Serialize};

use crate::{ProfitabilityAssessment, SnipingReport};

/// Final classification of one wallet.
///
/// A wallet is qualified only when it is profitable, traded at least once in
/// the lookback window and sniped nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WalletVerdict {
    pub wallet: String,
    pub profitability: ProfitabilityAssessment,
    pub trades_in_window: usize,
    pub sniping: Option<SnipingReport>,
    pub is_sniper: bool,
    pub is_qualified: bool,
    /// Why the wallet stopped where it did, for the report
    pub note: String,
}

impl WalletVerdict {
    /// Stopped at the profitability stage
    pub fn unprofitable(profitability: ProfitabilityAssessment) -> Self {
        let note = profitability.concerns.join("; ");
        Self {
            wallet: profitability.wallet_address.clone(),
            profitability,
            trades_in_window: 0,
            sniping: None,
            is_sniper: false,
            is_qualified: false,
            note,
        }
    }

    /// Profitable, but nothing traded in the window to judge
    pub fn no_recent_activity(profitability: ProfitabilityAssessment) -> Self {
        Self {
            wallet: profitability.wallet_address.clone(),
            profitability,
            trades_in_window: 0,
            sniping: None,
            is_sniper: false,
            is_qualified: false,
            note: "no transactions in window".to_string(),
        }
    }

    /// Went through every stage
    pub fn screened(
        profitability: ProfitabilityAssessment,
        trades_in_window: usize,
        sniping: SnipingReport,
    ) -> Self {
        let is_sniper = sniping.is_sniper;
        let is_qualified = profitability.passes && trades_in_window > 0 && !is_sniper;
        let note = if is_sniper {
            let tokens: Vec<_> = sniping
                .sniped_tokens
                .iter()
                .map(|t| t.token_address.as_str())
                .collect();
            format!("sniped {}", tokens.join(", "))
        } else if is_qualified {
            "qualified".to_string()
        } else {
            "not qualified".to_string()
        };

        Self {
            wallet: profitability.wallet_address.clone(),
            profitability,
            trades_in_window,
            sniping: Some(sniping),
            is_sniper,
            is_qualified,
            note,
        }
    }

    pub fn is_profitable(&self) -> bool {
        self.profitability.passes
    }
}
