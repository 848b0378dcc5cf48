//! Correlation log for inbound signals and outbound exchange calls
//!
//! Write-only from the core's perspective: the boundary records each inbound
//! request and its final outcome, the exchange client records every outbound
//! call. Storage failures are logged at `warn` and swallowed so bookkeeping
//! can never abort order execution.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

/// One outbound exchange call, request and response together
#[derive(Debug, Clone, Serialize)]
pub struct OutboundCallRecord {
    /// Correlation id of the originating signal, when the call has one
    pub signal_id: Option<Uuid>,
    pub endpoint: String,
    pub request_body: String,
    pub response_status: String,
    pub response_body: String,
    pub recorded_at: DateTime<Utc>,
}

/// Persists request/response pairs keyed by a signal correlation id
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record an inbound webhook body; returns the stored row id when the
    /// store provides one, so the outcome can be attached later.
    async fn record_inbound(&self, signal_id: Uuid, body: &serde_json::Value) -> Option<i64>;

    /// Attach the final execution result to a previously stored request
    async fn record_outcome(&self, log_id: i64, result: &serde_json::Value);

    /// Record one outbound exchange call
    async fn record_outbound_call(&self, record: &OutboundCallRecord);
}

/// Audit log that discards everything (store not configured)
pub struct NullAuditLog;

#[async_trait]
impl AuditLog for NullAuditLog {
    async fn record_inbound(&self, _signal_id: Uuid, _body: &serde_json::Value) -> Option<i64> {
        None
    }

    async fn record_outcome(&self, _log_id: i64, _result: &serde_json::Value) {}

    async fn record_outbound_call(&self, _record: &OutboundCallRecord) {}
}

/// PostgREST-style audit store over HTTP.
///
/// Inbound requests land in `signal_requests`, exchange calls in
/// `exchange_calls`.
pub struct RestAuditLog {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct InboundRow<'a> {
    signal_id: Uuid,
    received_at: DateTime<Utc>,
    body: &'a serde_json::Value,
}

impl RestAuditLog {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build from `SUPABASE_URL` / `SUPABASE_KEY`, if both are set
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("SUPABASE_URL").ok()?;
        let api_key = std::env::var("SUPABASE_KEY").ok()?;
        Some(Self::new(base_url, api_key))
    }

    async fn insert<T: Serialize>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<serde_json::Value, reqwest::Error> {
        self.client
            .post(format!("{}/rest/v1/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

#[async_trait]
impl AuditLog for RestAuditLog {
    async fn record_inbound(&self, signal_id: Uuid, body: &serde_json::Value) -> Option<i64> {
        let row = InboundRow {
            signal_id,
            received_at: Utc::now(),
            body,
        };
        match self.insert("signal_requests", &row).await {
            Ok(returned) => returned
                .as_array()
                .and_then(|rows| rows.first())
                .and_then(|row| row.get("id"))
                .and_then(|id| id.as_i64()),
            Err(e) => {
                warn!("Failed to record inbound signal {}: {}", signal_id, e);
                None
            }
        }
    }

    async fn record_outcome(&self, log_id: i64, result: &serde_json::Value) {
        let patch = self
            .client
            .patch(format!(
                "{}/rest/v1/signal_requests?id=eq.{}",
                self.base_url, log_id
            ))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({ "response": result }))
            .send()
            .await
            .and_then(|r| r.error_for_status());
        if let Err(e) = patch {
            warn!("Failed to record outcome for log {}: {}", log_id, e);
        }
    }

    async fn record_outbound_call(&self, record: &OutboundCallRecord) {
        if let Err(e) = self.insert("exchange_calls", record).await {
            warn!(
                "Failed to record outbound call to {}: {}",
                record.endpoint, e
            );
        }
    }
}
