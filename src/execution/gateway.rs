//! Exchange gateway capability contract
//!
//! The orchestrator depends on the exchange only through this trait. Calls
//! never return a transport `Result`: a failure is data, recorded in the
//! execution report so the remaining legs can still be placed.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intent::Side;

/// Trigger-order plan kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Profit,
    Loss,
}

impl PlanKind {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Profit => "profit_plan",
            Self::Loss => "loss_plan",
        }
    }
}

/// Whether a market order opens or closes the position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Open,
    Close,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
        }
    }
}

/// Why a gateway call is considered failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transport error, timeout, or exchange-reported non-success code
    Gateway,
    /// The exchange accepted the call shape but returned no data
    EmptyPayload,
}

/// Outcome of one gateway call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Ok { data: serde_json::Value },
    Failed { kind: FailureKind, message: String },
}

impl CallOutcome {
    pub fn success(data: serde_json::Value) -> Self {
        Self::Ok { data }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Failure message, if any
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Ok { .. } => None,
            Self::Failed { message, .. } => Some(message),
        }
    }
}

/// Stateless per-call transport to the derivatives exchange.
///
/// Implementations own request signing, transport timeouts and their own
/// retry policy; the orchestrator never retries. Every call is tagged with
/// the originating signal's correlation id for the audit trail.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    async fn set_leverage(
        &self,
        symbol: &str,
        margin_coin: &str,
        leverage: u32,
        side: Side,
        signal_id: Uuid,
    ) -> CallOutcome;

    async fn place_market_order(
        &self,
        symbol: &str,
        margin_coin: &str,
        quantity: u64,
        side: Side,
        trade_side: TradeSide,
        signal_id: Uuid,
    ) -> CallOutcome;

    #[allow(clippy::too_many_arguments)]
    async fn place_trigger_order(
        &self,
        symbol: &str,
        margin_coin: &str,
        quantity: u64,
        side: Side,
        trigger_price: Decimal,
        plan: PlanKind,
        signal_id: Uuid,
    ) -> CallOutcome;

    async fn close_all_positions(&self, symbol: &str) -> CallOutcome;
}
