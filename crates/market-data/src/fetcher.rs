//! The market-data contract used by the order pipeline.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sr_core::types::MarketConstraints;

/// Failures while retrieving prices or market rules.
///
/// Every variant aborts the order pipeline before any authenticated call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketDataError {
    /// The request exceeded its timeout.
    #[error("market data request timed out: {url}")]
    Timeout { url: String },
    /// Connection or protocol failure.
    #[error("market data transport error: {0}")]
    Transport(String),
    /// Non-success HTTP status from the public endpoint.
    #[error("market data endpoint returned HTTP {status}")]
    Http { status: u16 },
    /// Body was not the expected JSON shape.
    #[error("failed to parse market data: {0}")]
    Parse(String),
    /// No ticker entry (or no last price) for the symbol.
    #[error("price not found for {0}")]
    PriceNotFound(String),
    /// The ticker reported a zero or negative price.
    #[error("invalid price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: Decimal },
    /// No market-details entry for the symbol.
    #[error("market constraints not found for {0}")]
    ConstraintsNotFound(String),
    /// The market is listed but not open for trading.
    #[error("market {symbol} is not active (status {status:?})")]
    MarketInactive { symbol: String, status: String },
    /// No listing endpoints are configured for this exchange.
    #[error("market data is not configured")]
    NotConfigured,
}

impl MarketDataError {
    /// Whether the failure was a timeout rather than a definite answer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, MarketDataError::Timeout { .. })
    }
}

/// Source of last-trade prices and market constraints.
///
/// Implementations must never substitute a default: a missing or zero price
/// is an error, so it cannot flow into a division.
#[async_trait]
pub trait MarketDataFetcher: Send + Sync {
    /// Last traded price of `symbol` in quote currency. Always positive.
    async fn fetch_last_price(&self, symbol: &str) -> Result<Decimal, MarketDataError>;

    /// Precision and minimum-size rules for `symbol`.
    async fn fetch_constraints(&self, symbol: &str) -> Result<MarketConstraints, MarketDataError>;
}

/// Fetcher for exchanges with no configured listing endpoints.
///
/// Notional-sized market orders never consult market data, so an exchange can
/// run without listings; any lookup fails instead of guessing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredMarketData;

#[async_trait]
impl MarketDataFetcher for UnconfiguredMarketData {
    async fn fetch_last_price(&self, _symbol: &str) -> Result<Decimal, MarketDataError> {
        Err(MarketDataError::NotConfigured)
    }

    async fn fetch_constraints(&self, _symbol: &str) -> Result<MarketConstraints, MarketDataError> {
        Err(MarketDataError::NotConfigured)
    }
}
