//! Orchestrator - drives the ordered sequence of exchange calls for one signal
//!
//! OPEN signals walk a linear path with no backtracking:
//! set leverage, place the entry order, place each take-profit leg, place the
//! stop loss. A failed call is recorded under its role and the sequence
//! continues - partial fills must still surface the successful legs rather
//! than lose the whole order. CLOSE signals take a separate single-step path.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::config::ExecutionConfig;
use super::gateway::{CallOutcome, ExchangeGateway, PlanKind, TradeSide};
use super::intent::OrderIntent;
use super::plan::{ExecutionPlan, LegRole};
use crate::signal::SignalError;

/// Events emitted while an execution is in flight.
///
/// The orchestrator only reports; subscribers decide how to surface them.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// Leverage call completed (successfully or not)
    LeverageSet { signal_id: Uuid, ok: bool },
    /// One leg of the plan was accepted by the exchange
    LegPlaced { signal_id: Uuid, role: LegRole },
    /// One leg of the plan failed; the sequence continues
    LegRejected {
        signal_id: Uuid,
        role: LegRole,
        message: String,
    },
    /// A CLOSE signal issued its close-all call
    PositionsClosed { signal_id: Uuid, symbol: String },
    /// The whole sequence finished
    ExecutionFinished { signal_id: Uuid, failed_calls: usize },
}

/// Aggregate result of one OPEN execution.
///
/// Created empty, filled incrementally as each call completes, returned
/// whole - a mix of successes and failures is a valid final state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub signal_id: Uuid,
    pub leverage: Option<CallOutcome>,
    pub order: Option<CallOutcome>,
    pub take_profit: BTreeMap<String, CallOutcome>,
    pub stop_loss: Option<CallOutcome>,
}

impl ExecutionReport {
    fn new(signal_id: Uuid) -> Self {
        Self {
            signal_id,
            leverage: None,
            order: None,
            take_profit: BTreeMap::new(),
            stop_loss: None,
        }
    }

    fn record(&mut self, role: LegRole, outcome: CallOutcome) {
        match role {
            LegRole::Entry => self.order = Some(outcome),
            LegRole::StopLoss => self.stop_loss = Some(outcome),
            tp => {
                self.take_profit.insert(tp.to_string(), outcome);
            }
        }
    }

    /// Number of calls that did not succeed
    pub fn failed_calls(&self) -> usize {
        self.outcomes().filter(|o| !o.is_ok()).count()
    }

    fn outcomes(&self) -> impl Iterator<Item = &CallOutcome> {
        self.leverage
            .iter()
            .chain(self.order.iter())
            .chain(self.take_profit.values())
            .chain(self.stop_loss.iter())
    }
}

/// Result of the single-step CLOSE path
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseReport {
    pub signal_id: Uuid,
    pub status: &'static str,
    pub result: CallOutcome,
}

/// Sequences dependent exchange calls for one signal at a time.
///
/// Holds no mutable state of its own: concurrent executions for distinct
/// signals are fully independent.
pub struct Orchestrator {
    gateway: Arc<dyn ExchangeGateway>,
    config: ExecutionConfig,
    event_tx: broadcast::Sender<ExecutionEvent>,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn ExchangeGateway>, config: ExecutionConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            gateway,
            config,
            event_tx,
        }
    }

    /// Subscribe to execution events
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.event_tx.subscribe()
    }

    /// Execute an OPEN intent.
    ///
    /// Every gateway call is tagged with `signal_id` for correlation only;
    /// re-invoking with the same id places fresh orders.
    pub async fn execute(
        &self,
        intent: &OrderIntent,
        signal_id: Uuid,
    ) -> Result<ExecutionReport, SignalError> {
        let plan = ExecutionPlan::build(intent, &self.config)?;
        let mut report = ExecutionReport::new(signal_id);

        info!(
            "Executing {} {} x{} legs (signal {})",
            plan.side,
            plan.symbol,
            plan.legs.len(),
            signal_id
        );

        let outcome = self
            .gateway
            .set_leverage(
                &plan.symbol,
                &plan.margin_coin,
                plan.leverage,
                plan.side,
                signal_id,
            )
            .await;
        let _ = self.event_tx.send(ExecutionEvent::LeverageSet {
            signal_id,
            ok: outcome.is_ok(),
        });
        report.leverage = Some(outcome);

        for leg in &plan.legs {
            debug!(
                "Placing {} leg: qty {} trigger {:?}",
                leg.role, leg.quantity, leg.trigger_price
            );

            let outcome = match (leg.role, leg.trigger_price) {
                (LegRole::Entry, _) => {
                    self.gateway
                        .place_market_order(
                            &plan.symbol,
                            &plan.margin_coin,
                            leg.quantity,
                            plan.side,
                            TradeSide::Open,
                            signal_id,
                        )
                        .await
                }
                (LegRole::StopLoss, Some(price)) => {
                    self.gateway
                        .place_trigger_order(
                            &plan.symbol,
                            &plan.margin_coin,
                            leg.quantity,
                            plan.side,
                            price,
                            PlanKind::Loss,
                            signal_id,
                        )
                        .await
                }
                (_, Some(price)) => {
                    self.gateway
                        .place_trigger_order(
                            &plan.symbol,
                            &plan.margin_coin,
                            leg.quantity,
                            plan.side,
                            price,
                            PlanKind::Profit,
                            signal_id,
                        )
                        .await
                }
                (role, None) => CallOutcome::failure(
                    super::gateway::FailureKind::Gateway,
                    format!("{} leg has no trigger price", role),
                ),
            };

            let event = match outcome.error_message() {
                None => ExecutionEvent::LegPlaced {
                    signal_id,
                    role: leg.role,
                },
                Some(message) => ExecutionEvent::LegRejected {
                    signal_id,
                    role: leg.role,
                    message: message.to_string(),
                },
            };
            let _ = self.event_tx.send(event);

            report.record(leg.role, outcome);
        }

        let failed_calls = report.failed_calls();
        let _ = self.event_tx.send(ExecutionEvent::ExecutionFinished {
            signal_id,
            failed_calls,
        });
        info!(
            "Execution finished for signal {}: {} failed call(s)",
            signal_id, failed_calls
        );

        Ok(report)
    }

    /// Execute a CLOSE intent: one call closing every open position for the
    /// ticker. No leverage, TP or SL steps.
    pub async fn close(
        &self,
        intent: &OrderIntent,
        signal_id: Uuid,
    ) -> Result<CloseReport, SignalError> {
        let symbol = intent
            .normalized_ticker()
            .ok_or(SignalError::MissingField("ticker"))?;

        info!("Closing all positions on {} (signal {})", symbol, signal_id);
        let result = self.gateway.close_all_positions(&symbol).await;

        let _ = self.event_tx.send(ExecutionEvent::PositionsClosed {
            signal_id,
            symbol,
        });

        Ok(CloseReport {
            signal_id,
            status: "closed",
            result,
        })
    }
}
