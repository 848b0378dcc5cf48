//! Order intent model built from parsed alert text

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::signal::Directives;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse the alert's `Azione:` value, case-insensitively.
    pub fn from_action(action: &str) -> Option<Self> {
        match action.trim().to_lowercase().as_str() {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }

    /// Wire value for order placement
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Holding direction the exchange associates with this side
    pub fn hold_side(&self) -> &'static str {
        match self {
            Self::Buy => "long",
            Self::Sell => "short",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Terminal classification of an inbound signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
    Open,
    Close,
    Unrecognized,
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Close => write!(f, "CLOSE"),
            Self::Unrecognized => write!(f, "UNRECOGNIZED"),
        }
    }
}

/// The structured, validated result of parsing one alert.
///
/// Immutable once constructed; classification is derived once and never
/// re-evaluated. Fields the alert did not carry stay `None` - execution,
/// not parsing, decides whether that is fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderIntent {
    pub ticker: Option<String>,
    pub side: Option<Side>,
    pub kind: OrderKind,
    pub close_price: Option<Decimal>,
    /// Signed position size; execution always uses the absolute value
    pub size: Option<Decimal>,
    pub message: Option<String>,
    pub directives: Option<Directives>,
    /// Every field extracted from the text, kept for the audit echo
    pub raw_fields: BTreeMap<String, String>,
}

impl OrderIntent {
    /// Ticker with the perpetual-contract suffix stripped, as the exchange
    /// expects it (`BTCUSDT.P` -> `BTCUSDT`).
    pub fn normalized_ticker(&self) -> Option<String> {
        self.ticker
            .as_ref()
            .map(|t| t.strip_suffix(".P").unwrap_or(t).to_string())
    }
}
