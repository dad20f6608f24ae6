//! Core types shared by the market-data, execution, and relay crates.

pub mod credentials;
pub mod market;
pub mod order;
pub mod request;
pub mod timestamp;

// Re-export primary types for convenient access via `sr_core::types::*`.
pub use credentials::{ApiSecret, Credentials};
pub use market::MarketConstraints;
pub use order::{Exchange, KeyOrder, OrderType, ParseSideError, Side};
pub use request::{OrderRequest, OrderRequestError, OrderSize};
pub use timestamp::{Clock, FixedClock, SystemClock, Timestamp};
