//! HTTP boundary: webhook intake and health reporting

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::execution::OrderKind;
use crate::signal;
use crate::types::{AppState, OrderWebhook, SignalReceipt};

/// POST /order - parse one alert and execute it
///
/// Parse failures never reach the exchange; a partially failed execution
/// still answers 200 with the mixed-outcome report.
pub async fn post_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OrderWebhook>,
) -> impl IntoResponse {
    let signal_id = Uuid::new_v4();
    let received_at = Utc::now();
    *state.last_signal.write().await = Some(SignalReceipt {
        signal_id,
        received_at,
    });

    let body = serde_json::json!({ "text": payload.text });
    let log_id = state.audit.record_inbound(signal_id, &body).await;

    let intent = match signal::parse(&payload.text) {
        Ok(intent) => intent,
        Err(e) => {
            warn!("Rejecting signal {}: {}", signal_id, e);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": e.to_string(), "signalId": signal_id})),
            );
        }
    };

    match intent.kind {
        OrderKind::Open => match state.orchestrator.execute(&intent, signal_id).await {
            Ok(report) => {
                let result = serde_json::to_value(&report).unwrap_or_default();
                if let Some(log_id) = log_id {
                    state.audit.record_outcome(log_id, &result).await;
                }
                (StatusCode::OK, Json(result))
            }
            Err(e) => {
                warn!("Rejecting open signal {}: {}", signal_id, e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(serde_json::json!({"error": e.to_string(), "signalId": signal_id})),
                )
            }
        },
        OrderKind::Close => match state.orchestrator.close(&intent, signal_id).await {
            Ok(report) => {
                let result = serde_json::to_value(&report).unwrap_or_default();
                if let Some(log_id) = log_id {
                    state.audit.record_outcome(log_id, &result).await;
                }
                (StatusCode::OK, Json(result))
            }
            Err(e) => {
                warn!("Rejecting close signal {}: {}", signal_id, e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(serde_json::json!({"error": e.to_string(), "signalId": signal_id})),
                )
            }
        },
        OrderKind::Unrecognized => {
            warn!("Unrecognized order type for signal {}", signal_id);
            (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "unrecognized order type",
                    "signalId": signal_id,
                })),
            )
        }
    }
}

/// GET /health - liveness plus the most recent signal receipt
pub async fn get_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let last = *state.last_signal.read().await;
    Json(serde_json::json!({
        "status": "ok",
        "lastSignal": last,
    }))
}
