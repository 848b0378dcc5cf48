//! Bitget API client
//!
//! Signed HTTP transport for the v2 mix API. Each request carries an
//! HMAC-SHA256 signature over `timestamp + method + path + body`, base64
//! encoded, plus the demo-trading headers when configured. Every call is
//! mirrored to the audit log, success or not.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use super::models::*;
use crate::audit::{AuditLog, OutboundCallRecord};
use crate::execution::gateway::{CallOutcome, ExchangeGateway, FailureKind, PlanKind, TradeSide};
use crate::execution::intent::Side;

type HmacSha256 = Hmac<Sha256>;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.bitget.com";

/// Product type for all USDT-margined futures calls
pub const PRODUCT_TYPE: &str = "USDT-FUTURES";

const MARGIN_MODE: &str = "isolated";
const ORDER_TYPE_MARKET: &str = "market";
const FORCE_GTC: &str = "gtc";

const PATH_SET_LEVERAGE: &str = "/api/v2/mix/account/set-leverage";
const PATH_PLACE_ORDER: &str = "/api/v2/mix/order/place-order";
const PATH_PLACE_TPSL: &str = "/api/v2/mix/order/place-tpsl-order";
const PATH_CLOSE_POSITIONS: &str = "/api/v2/mix/order/close-positions";

/// Bitget API credentials and environment
#[derive(Debug, Clone)]
pub struct BitgetConfig {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
    pub base_url: String,
    /// Demo (paper) trading environment
    pub demo: bool,
}

impl BitgetConfig {
    /// Build the config from environment variables
    ///
    /// Expects:
    /// - `BITGET_API_KEY`
    /// - `BITGET_API_SECRET`
    /// - `BITGET_PASSPHRASE`
    /// - `BITGET_BASE_URL` (optional)
    /// - `BITGET_DEMO` (optional, defaults to demo trading)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("BITGET_API_KEY")
            .context("BITGET_API_KEY environment variable not set")?;
        let api_secret = std::env::var("BITGET_API_SECRET")
            .context("BITGET_API_SECRET environment variable not set")?;
        let passphrase = std::env::var("BITGET_PASSPHRASE")
            .context("BITGET_PASSPHRASE environment variable not set")?;
        let base_url =
            std::env::var("BITGET_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let demo = std::env::var("BITGET_DEMO")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        Ok(Self {
            api_key,
            api_secret,
            passphrase,
            base_url,
            demo,
        })
    }
}

/// Bitget API client implementing the gateway contract
pub struct BitgetClient {
    client: Client,
    config: BitgetConfig,
    audit: Arc<dyn AuditLog>,
}

impl BitgetClient {
    pub fn new(config: BitgetConfig, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            config,
            audit,
        }
    }

    /// Sign `timestamp + method + path + body` with the API secret
    fn sign(&self, timestamp: &str, method: &str, path: &str, body: &str) -> String {
        let message = format!("{}{}{}{}", timestamp, method, path, body);
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(message.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }

    /// Make a signed POST request, mirroring request and response to the
    /// audit log. Transport and exchange failures become `CallOutcome`
    /// data; this method never escalates.
    async fn post_signed<T: Serialize>(
        &self,
        path: &str,
        body: &T,
        signal_id: Option<Uuid>,
    ) -> CallOutcome {
        let payload = match serde_json::to_string(body) {
            Ok(payload) => payload,
            Err(e) => {
                return CallOutcome::failure(
                    FailureKind::Gateway,
                    format!("failed to encode request: {}", e),
                )
            }
        };

        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&timestamp, "POST", path, &payload);

        debug!("POST {} body {}", path, payload);

        let mut request = self
            .client
            .post(format!("{}{}", self.config.base_url, path))
            .header("ACCESS-KEY", &self.config.api_key)
            .header("ACCESS-SIGN", signature)
            .header("ACCESS-TIMESTAMP", &timestamp)
            .header("ACCESS-PASSPHRASE", &self.config.passphrase)
            .header("Content-Type", "application/json")
            .header("locale", "en-US");
        if self.config.demo {
            request = request
                .header("paptrading", "1")
                .header("X-CHANNEL-API-CODE", "default");
        }

        let (status, text) = match request.body(payload.clone()).send().await {
            Ok(response) => {
                let status = response.status().to_string();
                match response.text().await {
                    Ok(text) => (status, text),
                    Err(e) => {
                        let outcome = CallOutcome::failure(
                            FailureKind::Gateway,
                            format!("failed to read response body: {}", e),
                        );
                        self.record_call(signal_id, path, &payload, &status, "").await;
                        return outcome;
                    }
                }
            }
            Err(e) => {
                let outcome =
                    CallOutcome::failure(FailureKind::Gateway, format!("transport error: {}", e));
                self.record_call(signal_id, path, &payload, "transport_error", &e.to_string())
                    .await;
                return outcome;
            }
        };

        self.record_call(signal_id, path, &payload, &status, &text).await;

        match serde_json::from_str::<ApiResponse>(&text) {
            Ok(response) => evaluate_response(response),
            Err(e) => CallOutcome::failure(
                FailureKind::Gateway,
                format!("unparseable response ({}): {}", status, e),
            ),
        }
    }

    async fn record_call(
        &self,
        signal_id: Option<Uuid>,
        path: &str,
        request_body: &str,
        response_status: &str,
        response_body: &str,
    ) {
        let record = OutboundCallRecord {
            signal_id,
            endpoint: path.to_string(),
            request_body: request_body.to_string(),
            response_status: response_status.to_string(),
            response_body: response_body.to_string(),
            recorded_at: Utc::now(),
        };
        self.audit.record_outbound_call(&record).await;
    }
}

/// Map the exchange envelope to a call outcome.
///
/// A non-success code is a gateway failure; a success code with no data is
/// an empty-payload failure (the order was probably not accepted).
fn evaluate_response(response: ApiResponse) -> CallOutcome {
    if !response.is_success() {
        return CallOutcome::failure(
            FailureKind::Gateway,
            format!(
                "exchange error: code={}, msg={}",
                response.code,
                response.msg.unwrap_or_default()
            ),
        );
    }
    match response.data {
        Some(data) if !is_empty_payload(&data) => CallOutcome::success(data),
        _ => CallOutcome::failure(
            FailureKind::EmptyPayload,
            "exchange accepted the call but returned no data",
        ),
    }
}

fn is_empty_payload(data: &serde_json::Value) -> bool {
    match data {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[async_trait]
impl ExchangeGateway for BitgetClient {
    async fn set_leverage(
        &self,
        symbol: &str,
        margin_coin: &str,
        leverage: u32,
        side: Side,
        signal_id: Uuid,
    ) -> CallOutcome {
        let request = SetLeverageRequest {
            symbol: symbol.to_string(),
            margin_coin: margin_coin.to_string(),
            leverage: leverage.to_string(),
            hold_side: side.hold_side().to_string(),
            product_type: PRODUCT_TYPE.to_string(),
        };
        self.post_signed(PATH_SET_LEVERAGE, &request, Some(signal_id))
            .await
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        margin_coin: &str,
        quantity: u64,
        side: Side,
        trade_side: TradeSide,
        signal_id: Uuid,
    ) -> CallOutcome {
        let request = PlaceOrderRequest {
            symbol: symbol.to_string(),
            product_type: PRODUCT_TYPE.to_string(),
            margin_mode: MARGIN_MODE.to_string(),
            margin_coin: margin_coin.to_string(),
            size: quantity.to_string(),
            side: side.as_str().to_string(),
            trade_side: trade_side.as_str().to_string(),
            order_type: ORDER_TYPE_MARKET.to_string(),
            force: FORCE_GTC.to_string(),
        };
        self.post_signed(PATH_PLACE_ORDER, &request, Some(signal_id))
            .await
    }

    async fn place_trigger_order(
        &self,
        symbol: &str,
        margin_coin: &str,
        quantity: u64,
        side: Side,
        trigger_price: Decimal,
        plan: PlanKind,
        signal_id: Uuid,
    ) -> CallOutcome {
        let request = PlaceTpslRequest {
            symbol: symbol.to_string(),
            product_type: PRODUCT_TYPE.to_string(),
            margin_coin: margin_coin.to_string(),
            plan_type: plan.wire_name().to_string(),
            trigger_price: trigger_price.to_string(),
            hold_side: side.hold_side().to_string(),
            size: quantity.to_string(),
        };
        self.post_signed(PATH_PLACE_TPSL, &request, Some(signal_id))
            .await
    }

    async fn close_all_positions(&self, symbol: &str) -> CallOutcome {
        let request = ClosePositionsRequest {
            symbol: symbol.to_string(),
            product_type: PRODUCT_TYPE.to_string(),
        };
        self.post_signed(PATH_CLOSE_POSITIONS, &request, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullAuditLog;

    fn client() -> BitgetClient {
        BitgetClient::new(
            BitgetConfig {
                api_key: "key".to_string(),
                api_secret: "secret".to_string(),
                passphrase: "phrase".to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
                demo: true,
            },
            Arc::new(NullAuditLog),
        )
    }

    #[test]
    fn test_signature_is_base64_of_sha256_digest() {
        let client = client();
        let signature = client.sign("1714550400000", "POST", PATH_PLACE_ORDER, "{}");

        let raw = BASE64.decode(&signature).unwrap();
        assert_eq!(raw.len(), 32);
    }

    #[test]
    fn test_signature_is_deterministic_and_input_sensitive() {
        let client = client();
        let a = client.sign("1", "POST", "/p", "body");
        let b = client.sign("1", "POST", "/p", "body");
        let c = client.sign("1", "POST", "/p", "other");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_evaluate_error_code() {
        let response = ApiResponse {
            code: "40034".to_string(),
            msg: Some("Parameter does not exist".to_string()),
            data: None,
        };
        let outcome = evaluate_response(response);
        assert_eq!(
            outcome,
            CallOutcome::failure(
                FailureKind::Gateway,
                "exchange error: code=40034, msg=Parameter does not exist"
            )
        );
    }

    #[test]
    fn test_evaluate_empty_payload() {
        let response = ApiResponse {
            code: "00000".to_string(),
            msg: Some("success".to_string()),
            data: Some(serde_json::json!({})),
        };
        assert!(matches!(
            evaluate_response(response),
            CallOutcome::Failed {
                kind: FailureKind::EmptyPayload,
                ..
            }
        ));
    }

    #[test]
    fn test_evaluate_success() {
        let response = ApiResponse {
            code: "00000".to_string(),
            msg: Some("success".to_string()),
            data: Some(serde_json::json!({"orderId": "123"})),
        };
        assert!(evaluate_response(response).is_ok());
    }
}
