use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

use crate::{NormalizedTrade, RawSwapLeg, RawTransaction, TokenLeg, TradeType};

/// Turns provider records into [`NormalizedTrade`]s.
///
/// Only the first action's swap is looked at. The direction is decided by
/// the symbol of the token the wallet paid with: the native asset means the
/// wallet bought something, any other known token means it sold.
#[derive(Debug, Clone)]
pub struct TradeClassifier {
    native_symbol: String,
}

impl TradeClassifier {
    pub fn new(native_symbol: impl Into<String>) -> Self {
        Self {
            native_symbol: native_symbol.into(),
        }
    }

    pub fn native_symbol(&self) -> &str {
        &self.native_symbol
    }

    /// Pure; classifying the same record twice gives equal results
    pub fn classify(&self, tx: &RawTransaction) -> NormalizedTrade {
        let swap = tx
            .actions
            .first()
            .and_then(|action| action.tokens_swapped.as_ref());

        let token_in = swap
            .and_then(|s| s.token_in.as_ref())
            .map(normalize_leg)
            .unwrap_or_default();
        let token_out = swap
            .and_then(|s| s.token_out.as_ref())
            .map(normalize_leg)
            .unwrap_or_default();

        if swap.is_none() {
            debug!("No swap data in {}, classifying as unknown", tx.signature);
        }

        NormalizedTrade {
            signature: tx.signature.clone(),
            trade_type: self.trade_type(&token_in),
            timestamp: tx.block_time,
            token_in,
            token_out,
        }
    }

    pub fn trade_type(&self, token_in: &TokenLeg) -> TradeType {
        match token_in.symbol.as_deref() {
            Some(symbol) if symbol == self.native_symbol => TradeType::Buy,
            Some(_) => TradeType::Sell,
            None => TradeType::Unknown,
        }
    }
}

fn normalize_leg(leg: &RawSwapLeg) -> TokenLeg {
    TokenLeg {
        symbol: non_blank(leg.symbol.as_deref()),
        address: non_blank(leg.token_address.as_deref()),
        amount: leg.amount.as_deref().and_then(parse_amount),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != "N/A")
        .map(str::to_string)
}

/// Plain or scientific decimal text; anything else is unknown
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}
