use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::execution::Orchestrator;

/// Inbound webhook body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWebhook {
    /// Raw alert text as sent by the charting tool
    pub text: String,
}

/// Receipt of the most recent inbound signal
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalReceipt {
    pub signal_id: Uuid,
    pub received_at: DateTime<Utc>,
}

/// Shared application state
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub audit: Arc<dyn AuditLog>,
    pub last_signal: RwLock<Option<SignalReceipt>>,
}
