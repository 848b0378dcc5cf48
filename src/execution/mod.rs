//! Execution module for turning parsed signals into exchange orders
//!
//! This module owns the order intent model, the quantity allocation policy,
//! and the orchestrator that drives the ordered sequence of gateway calls.

mod config;
pub mod gateway;
pub mod intent;
mod orchestrator;
mod plan;

pub use config::ExecutionConfig;
pub use gateway::{CallOutcome, ExchangeGateway, FailureKind, PlanKind, TradeSide};
pub use intent::{OrderIntent, OrderKind, Side};
pub use orchestrator::{CloseReport, ExecutionEvent, ExecutionReport, Orchestrator};
pub use plan::{allocate, ExecutionPlan, Leg, LegRole};
