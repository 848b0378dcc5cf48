//! Alert text parsing
//!
//! Turns raw TradingView alert text into a validated [`OrderIntent`]:
//! field extraction and OPEN/CLOSE classification in [`fields`], the
//! embedded price/quantity directives in [`directives`].

pub mod directives;
pub mod fields;

pub use directives::{Directives, TpDistribution, TpPlan};

use thiserror::Error;

use crate::execution::intent::{OrderIntent, OrderKind, Side};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Errors that stop a signal before any exchange call is made
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// A tagged field was present but could not be parsed
    #[error("field `{field}` could not be parsed: `{value}`")]
    MalformedField { field: &'static str, value: String },

    /// The message matched none of the known TP/SL shapes
    #[error("message matches no known take-profit/stop-loss shape")]
    InvalidDirectives,

    /// A field required for execution was absent from the alert
    #[error("field `{0}` is required for execution but missing from the alert")]
    MissingField(&'static str),

    /// Classification yielded neither OPEN nor CLOSE
    #[error("order type is neither OPEN nor CLOSE")]
    UnrecognizedOrderType,
}

/// Parse a raw alert into an [`OrderIntent`].
///
/// Absent fields are never an error; they are simply omitted from
/// `raw_fields`. A present-but-unparsable numeric field is
/// [`SignalError::MalformedField`]. OPEN signals also get their message
/// directives parsed here so the intent is complete once constructed.
pub fn parse(text: &str) -> Result<OrderIntent, SignalError> {
    let raw_fields = fields::extract(text);
    let kind = fields::classify(&raw_fields);

    let close_price = decimal_field(&raw_fields, "close_price")?;
    let size = decimal_field(&raw_fields, "size")?;

    let side = match raw_fields.get("action") {
        Some(action) => Some(Side::from_action(action).ok_or_else(|| {
            SignalError::MalformedField {
                field: "action",
                value: action.clone(),
            }
        })?),
        None => None,
    };

    let message = raw_fields.get("message").cloned();
    let directives = match (&kind, &message) {
        (OrderKind::Open, Some(message)) => Some(directives::parse(message)?),
        _ => None,
    };

    Ok(OrderIntent {
        ticker: raw_fields.get("ticker").cloned(),
        side,
        kind,
        close_price,
        size,
        message,
        directives,
        raw_fields,
    })
}

fn decimal_field(
    raw_fields: &BTreeMap<String, String>,
    field: &'static str,
) -> Result<Option<Decimal>, SignalError> {
    match raw_fields.get(field) {
        Some(value) => value
            .parse::<Decimal>()
            .map(Some)
            .map_err(|_| SignalError::MalformedField {
                field,
                value: value.clone(),
            }),
        None => Ok(None),
    }
}
