//! # sr-execution
//!
//! Turns a `(symbol, side, fiat amount)` trade intent into a signed order on
//! the exchange's REST API: quantity/price normalization, canonical payload
//! rendering, HMAC-SHA256 signing, and submission with a normalized result.

pub mod client;
pub mod exchange;
pub mod normalize;
pub mod payload;
pub mod pipeline;
pub mod request;
pub mod signing;

pub use client::{ExchangeClient, ExchangeResult, Outcome, ResultBody};
pub use exchange::{ExchangeProfile, SizingMode};
pub use normalize::PrecisionError;
pub use payload::{CanonicalPayload, PayloadBuilder, PayloadError};
pub use pipeline::{OrderPipeline, PipelineError};
pub use request::SignedRequest;
