//! Bitget exchange integration
//!
//! Signed REST client for the v2 mix (USDT futures) API, implementing the
//! [`ExchangeGateway`](crate::execution::ExchangeGateway) contract.

mod client;
pub mod models;

pub use client::{BitgetClient, BitgetConfig, DEFAULT_BASE_URL};
