//! Directive parsing for the embedded alert message
//!
//! The `Message:` field carries the actual trade plan as free text, e.g.
//!
//! `OPEN LONG | Entry: 62500 | Stop Loss: 61000 | TP1: 63000 | TP2: 63500 |
//! TP3: 64000 | Size: 10 | Qty % -> TP1: 50% | TP2: 30% | TP3: 20%`
//!
//! Three mutually exclusive shapes are recognized, in priority order:
//! multi-TP with a quantity distribution, multi-TP without one, and a single
//! bare `TP:`. Percentage tags and price tags share the `TPn:` label and are
//! told apart by the trailing `%`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SignalError;

/// Per-index take-profit quantity percentages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpDistribution {
    pub tp1: Decimal,
    pub tp2: Decimal,
    pub tp3: Decimal,
}

impl TpDistribution {
    /// Equal split across the three legs. The percentages are not required
    /// to sum to exactly 100; the allocator rounds per leg.
    pub fn equal_thirds() -> Self {
        let third = Decimal::from(100) / Decimal::from(3);
        Self {
            tp1: third,
            tp2: third,
            tp3: third,
        }
    }
}

/// Take-profit plan extracted from the message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TpPlan {
    /// Three indexed take-profit levels, optionally with a quantity
    /// distribution. `None` means the caller's default split applies.
    Multi {
        tp1: Decimal,
        tp2: Decimal,
        tp3: Decimal,
        distribution: Option<TpDistribution>,
    },
    /// A single take-profit level for the whole position
    Single { tp: Decimal },
}

/// The parsed price/quantity plan of one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directives {
    /// Entry level as stated in the message. Execution enters at market;
    /// this is kept for the audit echo.
    pub entry: Option<Decimal>,
    pub stop_loss: Decimal,
    pub plan: TpPlan,
}

fn entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)Entry:\s*([0-9.]+)").expect("entry pattern is valid"))
}

fn stop_loss_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)(?:Stop Loss|SL):\s*([0-9.]+)").expect("stop-loss pattern is valid")
    })
}

fn tp_indexed_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)TP([123]):\s*([0-9.]+)(%)?").expect("indexed TP pattern is valid")
    })
}

fn tp_single_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)TP:\s*([0-9.]+)").expect("single TP pattern is valid"))
}

/// Parse the message sub-string into [`Directives`].
///
/// A message matching none of the three shapes is
/// [`SignalError::InvalidDirectives`]; the caller must not attempt partial
/// execution on that error.
pub fn parse(message: &str) -> Result<Directives, SignalError> {
    let entry = entry_pattern()
        .captures(message)
        .and_then(|caps| caps[1].parse::<Decimal>().ok());

    let stop_loss = stop_loss_pattern()
        .captures(message)
        .and_then(|caps| caps[1].parse::<Decimal>().ok())
        .ok_or(SignalError::InvalidDirectives)?;

    let mut prices: BTreeMap<u8, Decimal> = BTreeMap::new();
    let mut percentages: BTreeMap<u8, Decimal> = BTreeMap::new();
    for caps in tp_indexed_pattern().captures_iter(message) {
        let Ok(index) = caps[1].parse::<u8>() else { continue };
        let Ok(value) = caps[2].parse::<Decimal>() else { continue };
        if caps.get(3).is_some() {
            percentages.entry(index).or_insert(value);
        } else {
            prices.entry(index).or_insert(value);
        }
    }

    let plan = if !prices.is_empty() {
        // Multi-TP: all three indexed levels are required
        let (Some(tp1), Some(tp2), Some(tp3)) =
            (prices.get(&1), prices.get(&2), prices.get(&3))
        else {
            return Err(SignalError::InvalidDirectives);
        };
        let distribution = match (percentages.get(&1), percentages.get(&2), percentages.get(&3)) {
            (Some(tp1), Some(tp2), Some(tp3)) => Some(TpDistribution {
                tp1: *tp1,
                tp2: *tp2,
                tp3: *tp3,
            }),
            // Partial percentage tags fall back to the default split
            _ => None,
        };
        TpPlan::Multi {
            tp1: *tp1,
            tp2: *tp2,
            tp3: *tp3,
            distribution,
        }
    } else if let Some(caps) = tp_single_pattern().captures(message) {
        let tp = caps[1]
            .parse::<Decimal>()
            .map_err(|_| SignalError::InvalidDirectives)?;
        TpPlan::Single { tp }
    } else {
        return Err(SignalError::InvalidDirectives);
    };

    Ok(Directives {
        entry,
        stop_loss,
        plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_multi_tp_with_distribution() {
        let message = "OPEN LONG | Entry: 62500 | Stop Loss: 61000 | TP1: 63000 | TP2: 63500 | TP3: 64000 | Size: 10 | Qty % -> TP1: 50% | TP2: 30% | TP3: 20%";
        let directives = parse(message).unwrap();

        assert_eq!(directives.entry, Some(dec!(62500)));
        assert_eq!(directives.stop_loss, dec!(61000));
        assert_eq!(
            directives.plan,
            TpPlan::Multi {
                tp1: dec!(63000),
                tp2: dec!(63500),
                tp3: dec!(64000),
                distribution: Some(TpDistribution {
                    tp1: dec!(50),
                    tp2: dec!(30),
                    tp3: dec!(20),
                }),
            }
        );
    }

    #[test]
    fn test_multi_tp_without_distribution() {
        let message = "OPEN SHORT | Entry: 100 | SL: 110 | TP1: 95 | TP2: 90 | TP3: 85";
        let directives = parse(message).unwrap();

        match directives.plan {
            TpPlan::Multi { distribution, .. } => assert!(distribution.is_none()),
            other => panic!("expected multi plan, got {:?}", other),
        }
    }

    #[test]
    fn test_single_tp() {
        let message = "OPEN LONG | TP: 100 | SL: 90";
        let directives = parse(message).unwrap();

        assert_eq!(directives.stop_loss, dec!(90));
        assert_eq!(directives.plan, TpPlan::Single { tp: dec!(100) });
        assert_eq!(directives.entry, None);
    }

    #[test]
    fn test_stop_loss_label_variants() {
        let long_label = parse("TP: 10 | Stop Loss: 9").unwrap();
        let short_label = parse("TP: 10 | sl: 9").unwrap();
        assert_eq!(long_label.stop_loss, short_label.stop_loss);
    }

    #[test]
    fn test_missing_stop_loss_is_invalid() {
        assert_eq!(
            parse("OPEN LONG | TP: 100").unwrap_err(),
            SignalError::InvalidDirectives
        );
    }

    #[test]
    fn test_no_tp_is_invalid() {
        assert_eq!(
            parse("OPEN LONG | SL: 90").unwrap_err(),
            SignalError::InvalidDirectives
        );
    }

    #[test]
    fn test_two_tp_levels_is_invalid() {
        assert_eq!(
            parse("SL: 90 | TP1: 95 | TP2: 100").unwrap_err(),
            SignalError::InvalidDirectives
        );
    }

    #[test]
    fn test_partial_percentages_fall_back_to_default() {
        let message = "SL: 90 | TP1: 95 | TP2: 100 | TP3: 105 | TP1: 60%";
        let directives = parse(message).unwrap();

        match directives.plan {
            TpPlan::Multi { tp1, distribution, .. } => {
                assert_eq!(tp1, dec!(95));
                assert!(distribution.is_none());
            }
            other => panic!("expected multi plan, got {:?}", other),
        }
    }

    #[test]
    fn test_percentage_tags_do_not_clobber_prices() {
        // Distribution tags reuse the TPn: label; the price must survive
        let message = "SL: 1 | TP1: 2.5 | TP2: 3 | TP3: 4 | TP1: 50% | TP2: 25% | TP3: 25%";
        let directives = parse(message).unwrap();

        match directives.plan {
            TpPlan::Multi { tp1, .. } => assert_eq!(tp1, dec!(2.5)),
            other => panic!("expected multi plan, got {:?}", other),
        }
    }

    #[test]
    fn test_equal_thirds_sums_close_to_hundred() {
        let split = TpDistribution::equal_thirds();
        let sum = split.tp1 + split.tp2 + split.tp3;
        assert!((sum - dec!(100)).abs() < dec!(0.001));
    }
}
