//! Execution plan construction and quantity allocation
//!
//! An OPEN intent is expanded exactly once into an ordered list of legs:
//! entry first, then the take-profit legs, then the stop loss. The plan is
//! consumed sequentially by the orchestrator and never mutated.
//!
//! Rounding policy: entry and take-profit quantities round half-up, the
//! stop-loss quantity is floored, and every leg has a floor of 1 unit
//! (the exchange rejects zero-quantity orders).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::config::ExecutionConfig;
use super::intent::{OrderIntent, OrderKind, Side};
use crate::signal::{SignalError, TpDistribution, TpPlan};

/// Role of one leg within an execution plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegRole {
    Entry,
    Tp1,
    Tp2,
    Tp3,
    /// Single take-profit covering the whole position
    Tp,
    StopLoss,
}

impl std::fmt::Display for LegRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::Tp1 => write!(f, "tp1"),
            Self::Tp2 => write!(f, "tp2"),
            Self::Tp3 => write!(f, "tp3"),
            Self::Tp => write!(f, "tp"),
            Self::StopLoss => write!(f, "stop_loss"),
        }
    }
}

/// One order to be placed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub role: LegRole,
    pub quantity: u64,
    /// Trigger price for TP/SL legs; the entry is a market order
    pub trigger_price: Option<Decimal>,
}

/// The ordered set of orders derived from one OPEN intent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub symbol: String,
    pub side: Side,
    pub leverage: u32,
    pub margin_coin: String,
    pub legs: Vec<Leg>,
}

impl ExecutionPlan {
    /// Build the plan for an OPEN intent.
    ///
    /// Fails before any exchange call when the intent lacks a field
    /// execution needs, or when it carries no directives.
    pub fn build(intent: &OrderIntent, config: &ExecutionConfig) -> Result<Self, SignalError> {
        if intent.kind != OrderKind::Open {
            return Err(SignalError::UnrecognizedOrderType);
        }

        let symbol = intent
            .normalized_ticker()
            .ok_or(SignalError::MissingField("ticker"))?;
        let side = intent.side.ok_or(SignalError::MissingField("action"))?;
        let size = intent.size.ok_or(SignalError::MissingField("size"))?;
        if size.is_zero() {
            return Err(SignalError::MalformedField {
                field: "size",
                value: size.to_string(),
            });
        }
        let directives = intent
            .directives
            .as_ref()
            .ok_or(SignalError::MissingField("message"))?;

        let total = size.abs();
        let mut legs = vec![Leg {
            role: LegRole::Entry,
            quantity: round_half_up(total),
            trigger_price: None,
        }];

        match &directives.plan {
            TpPlan::Multi {
                tp1,
                tp2,
                tp3,
                distribution,
            } => {
                let distribution = distribution
                    .as_ref()
                    .unwrap_or(&config.default_distribution);
                let [q1, q2, q3] = allocate(total, distribution);
                legs.push(Leg {
                    role: LegRole::Tp1,
                    quantity: q1,
                    trigger_price: Some(*tp1),
                });
                legs.push(Leg {
                    role: LegRole::Tp2,
                    quantity: q2,
                    trigger_price: Some(*tp2),
                });
                legs.push(Leg {
                    role: LegRole::Tp3,
                    quantity: q3,
                    trigger_price: Some(*tp3),
                });
            }
            TpPlan::Single { tp } => {
                legs.push(Leg {
                    role: LegRole::Tp,
                    quantity: round_half_up(total),
                    trigger_price: Some(*tp),
                });
            }
        }

        // The stop loss always covers the whole position
        legs.push(Leg {
            role: LegRole::StopLoss,
            quantity: floor_quantity(total),
            trigger_price: Some(directives.stop_loss),
        });

        Ok(Self {
            symbol,
            side,
            leverage: config.leverage,
            margin_coin: config.margin_coin.clone(),
            legs,
        })
    }
}

/// Split the absolute position size across the three take-profit legs.
///
/// Percentages are taken at face value - they are not required to sum
/// to 100. Each leg rounds half-up and is floored at 1 unit.
pub fn allocate(total: Decimal, distribution: &TpDistribution) -> [u64; 3] {
    [
        distribution.tp1,
        distribution.tp2,
        distribution.tp3,
    ]
    .map(|pct| round_half_up(pct / Decimal::from(100) * total))
}

fn round_half_up(value: Decimal) -> u64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .unwrap_or(0)
        .max(1)
}

fn floor_quantity(value: Decimal) -> u64 {
    value.floor().to_u64().unwrap_or(0).max(1)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::signal::Directives;

    fn open_intent(size: Decimal, plan: TpPlan) -> OrderIntent {
        OrderIntent {
            ticker: Some("BTCUSDT.P".to_string()),
            side: Some(Side::Buy),
            kind: OrderKind::Open,
            close_price: None,
            size: Some(size),
            message: Some("test".to_string()),
            directives: Some(Directives {
                entry: None,
                stop_loss: dec!(61000),
                plan,
            }),
            raw_fields: BTreeMap::new(),
        }
    }

    fn multi_plan(distribution: Option<TpDistribution>) -> TpPlan {
        TpPlan::Multi {
            tp1: dec!(63000),
            tp2: dec!(63500),
            tp3: dec!(64000),
            distribution,
        }
    }

    #[test]
    fn test_allocate_example_distribution() {
        let distribution = TpDistribution {
            tp1: dec!(50),
            tp2: dec!(30),
            tp3: dec!(20),
        };
        assert_eq!(allocate(dec!(10), &distribution), [5, 3, 2]);
    }

    #[test]
    fn test_allocate_floors_at_one_unit() {
        let distribution = TpDistribution {
            tp1: dec!(90),
            tp2: dec!(5),
            tp3: dec!(5),
        };
        // 5% of 2 rounds to 0, but zero-quantity legs are rejected upstream
        assert_eq!(allocate(dec!(2), &distribution), [2, 1, 1]);
    }

    #[test]
    fn test_allocate_sum_stays_near_total() {
        let distribution = TpDistribution::equal_thirds();
        for size in [3u64, 10, 33, 100, 999] {
            let total: u64 = allocate(Decimal::from(size), &distribution).iter().sum();
            assert!(
                total.abs_diff(size) <= 1,
                "size {} allocated to {}",
                size,
                total
            );
        }
    }

    #[test]
    fn test_build_multi_tp_plan() {
        let intent = open_intent(
            dec!(10),
            multi_plan(Some(TpDistribution {
                tp1: dec!(50),
                tp2: dec!(30),
                tp3: dec!(20),
            })),
        );
        let plan = ExecutionPlan::build(&intent, &ExecutionConfig::default()).unwrap();

        assert_eq!(plan.symbol, "BTCUSDT");
        assert_eq!(plan.leverage, 20);
        let roles: Vec<LegRole> = plan.legs.iter().map(|l| l.role).collect();
        assert_eq!(
            roles,
            vec![
                LegRole::Entry,
                LegRole::Tp1,
                LegRole::Tp2,
                LegRole::Tp3,
                LegRole::StopLoss
            ]
        );
        let quantities: Vec<u64> = plan.legs.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![10, 5, 3, 2, 10]);
    }

    #[test]
    fn test_build_single_tp_plan_uses_full_size() {
        let intent = open_intent(dec!(7), TpPlan::Single { tp: dec!(100) });
        let plan = ExecutionPlan::build(&intent, &ExecutionConfig::default()).unwrap();

        assert_eq!(plan.legs.len(), 3);
        assert!(plan.legs.iter().all(|l| l.quantity == 7));
        assert_eq!(plan.legs[1].role, LegRole::Tp);
    }

    #[test]
    fn test_build_uses_absolute_size() {
        let intent = open_intent(dec!(-7), TpPlan::Single { tp: dec!(100) });
        let plan = ExecutionPlan::build(&intent, &ExecutionConfig::default()).unwrap();
        assert!(plan.legs.iter().all(|l| l.quantity == 7));
    }

    #[test]
    fn test_build_defaults_to_equal_thirds() {
        let intent = open_intent(dec!(9), multi_plan(None));
        let plan = ExecutionPlan::build(&intent, &ExecutionConfig::default()).unwrap();
        let quantities: Vec<u64> = plan.legs.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![9, 3, 3, 3, 9]);
    }

    #[test]
    fn test_build_rejects_zero_size() {
        let intent = open_intent(dec!(0), TpPlan::Single { tp: dec!(1) });
        assert!(matches!(
            ExecutionPlan::build(&intent, &ExecutionConfig::default()),
            Err(SignalError::MalformedField { field: "size", .. })
        ));
    }

    #[test]
    fn test_build_rejects_missing_ticker() {
        let mut intent = open_intent(dec!(5), TpPlan::Single { tp: dec!(1) });
        intent.ticker = None;
        assert_eq!(
            ExecutionPlan::build(&intent, &ExecutionConfig::default()).unwrap_err(),
            SignalError::MissingField("ticker")
        );
    }

    #[test]
    fn test_build_rejects_missing_directives() {
        let mut intent = open_intent(dec!(5), TpPlan::Single { tp: dec!(1) });
        intent.directives = None;
        assert_eq!(
            ExecutionPlan::build(&intent, &ExecutionConfig::default()).unwrap_err(),
            SignalError::MissingField("message")
        );
    }

    #[test]
    fn test_build_rejects_non_open_kind() {
        let mut intent = open_intent(dec!(5), TpPlan::Single { tp: dec!(1) });
        intent.kind = OrderKind::Close;
        assert_eq!(
            ExecutionPlan::build(&intent, &ExecutionConfig::default()).unwrap_err(),
            SignalError::UnrecognizedOrderType
        );
    }

    #[test]
    fn test_fractional_size_rounding() {
        let intent = open_intent(dec!(7.5), TpPlan::Single { tp: dec!(1) });
        let plan = ExecutionPlan::build(&intent, &ExecutionConfig::default()).unwrap();

        // Entry and TP round half-up, the stop loss floors
        assert_eq!(plan.legs[0].quantity, 8);
        assert_eq!(plan.legs[1].quantity, 8);
        assert_eq!(plan.legs[2].quantity, 7);
    }
}
