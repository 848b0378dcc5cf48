//! Bitget v2 mix API data models
//!
//! Request payloads and the response envelope. Quantities and prices travel
//! as strings on the wire, per the exchange API.

use serde::{Deserialize, Serialize};

// ============================================================================
// Account
// ============================================================================

/// Request body for POST /api/v2/mix/account/set-leverage
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLeverageRequest {
    pub symbol: String,
    pub margin_coin: String,
    pub leverage: String,
    pub hold_side: String,
    pub product_type: String,
}

// ============================================================================
// Orders
// ============================================================================

/// Request body for POST /api/v2/mix/order/place-order
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub symbol: String,
    pub product_type: String,
    pub margin_mode: String,
    pub margin_coin: String,
    pub size: String,
    pub side: String,
    pub trade_side: String,
    pub order_type: String,
    pub force: String,
}

/// Request body for POST /api/v2/mix/order/place-tpsl-order
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceTpslRequest {
    pub symbol: String,
    pub product_type: String,
    pub margin_coin: String,
    pub plan_type: String,
    pub trigger_price: String,
    pub hold_side: String,
    pub size: String,
}

// ============================================================================
// Positions
// ============================================================================

/// Request body for POST /api/v2/mix/order/close-positions
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosePositionsRequest {
    pub symbol: String,
    pub product_type: String,
}

// ============================================================================
// Response envelope
// ============================================================================

/// Every Bitget endpoint answers with this envelope
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub code: String,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    /// Bitget reports success as the literal code `00000`
    pub fn is_success(&self) -> bool {
        self.code == "00000"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_is_camel_case() {
        let request = SetLeverageRequest {
            symbol: "BTCUSDT".to_string(),
            margin_coin: "USDT".to_string(),
            leverage: "20".to_string(),
            hold_side: "long".to_string(),
            product_type: "USDT-FUTURES".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();

        assert!(json.contains(r#""marginCoin":"USDT""#));
        assert!(json.contains(r#""holdSide":"long""#));
        assert!(json.contains(r#""productType":"USDT-FUTURES""#));
    }

    #[test]
    fn test_trade_side_key() {
        let request = PlaceOrderRequest {
            symbol: "BTCUSDT".to_string(),
            product_type: "USDT-FUTURES".to_string(),
            margin_mode: "isolated".to_string(),
            margin_coin: "USDT".to_string(),
            size: "10".to_string(),
            side: "buy".to_string(),
            trade_side: "open".to_string(),
            order_type: "market".to_string(),
            force: "gtc".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""tradeSide":"open""#));
    }

    #[test]
    fn test_response_envelope() {
        let ok: ApiResponse =
            serde_json::from_str(r#"{"code":"00000","msg":"success","data":{"orderId":"1"}}"#)
                .unwrap();
        assert!(ok.is_success());
        assert!(ok.data.is_some());

        let err: ApiResponse =
            serde_json::from_str(r#"{"code":"40034","msg":"Parameter does not exist"}"#).unwrap();
        assert!(!err.is_success());
        assert!(err.data.is_none());
    }
}
