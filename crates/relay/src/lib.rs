//! # sr-relay
//!
//! Receives trade-signal webhooks and forwards accepted ones to the exchange
//! through an [`sr_execution::OrderPipeline`].

pub mod server;
pub mod signal;

pub use server::{router, run_server, RelayState};
pub use signal::{AcceptedSignal, IgnoreReason, TradingRules, WebhookPayload};
