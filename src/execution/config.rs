//! Configuration for order execution

use serde::{Deserialize, Serialize};

use crate::signal::TpDistribution;

/// Configuration applied to every OPEN execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Leverage set before the entry order
    pub leverage: u32,

    /// Margin asset for all orders
    pub margin_coin: String,

    /// Take-profit split applied when the message carries no percentage tags
    pub default_distribution: TpDistribution,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            leverage: 20,
            margin_coin: "USDT".to_string(),
            default_distribution: TpDistribution::equal_thirds(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutionConfig::default();
        assert_eq!(config.leverage, 20);
        assert_eq!(config.margin_coin, "USDT");
    }
}
