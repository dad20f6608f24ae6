//! Public REST implementation of [`MarketDataFetcher`].
//!
//! Issues unauthenticated GETs against the ticker and market-details listings
//! and scans for the requested symbol. Nothing is cached: every order sees the
//! listing as it is at that moment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sr_core::types::MarketConstraints;
use tracing::debug;

use crate::fetcher::{MarketDataError, MarketDataFetcher};
use crate::types::{MarketDetails, TickerEntry};

/// Default timeout for public market-data requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches prices and constraints from public listing endpoints.
///
/// Reuses a single `reqwest::Client` for connection pooling; the timeout is
/// applied to every request.
pub struct RestMarketData {
    ticker_url: String,
    markets_url: String,
    client: Client,
}

impl RestMarketData {
    /// Create a fetcher for the given listing URLs.
    pub fn new(
        ticker_url: impl Into<String>,
        markets_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            ticker_url: ticker_url.into(),
            markets_url: markets_url.into(),
            client,
        })
    }

    /// GET `url` and decode the body as JSON.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, MarketDataError> {
        debug!(url, "market data GET request");

        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    url: url.to_string(),
                }
            } else {
                MarketDataError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(MarketDataError::Http {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout {
                    url: url.to_string(),
                }
            } else {
                MarketDataError::Transport(e.to_string())
            }
        })?;

        serde_json::from_str(&body).map_err(|e| MarketDataError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MarketDataFetcher for RestMarketData {
    async fn fetch_last_price(&self, symbol: &str) -> Result<Decimal, MarketDataError> {
        let entries: Vec<TickerEntry> = self.get_json(&self.ticker_url).await?;
        let price = find_last_price(entries, symbol)?;
        debug!(symbol, %price, "last price fetched");
        Ok(price)
    }

    async fn fetch_constraints(&self, symbol: &str) -> Result<MarketConstraints, MarketDataError> {
        let listing: Vec<MarketDetails> = self.get_json(&self.markets_url).await?;
        let constraints = find_constraints(listing, symbol)?;
        debug!(
            symbol,
            min_quantity = %constraints.min_quantity,
            quantity_precision = constraints.quantity_precision,
            price_precision = constraints.price_precision,
            "market constraints fetched"
        );
        Ok(constraints)
    }
}

/// Pick the last price for `symbol` out of a ticker listing.
fn find_last_price(entries: Vec<TickerEntry>, symbol: &str) -> Result<Decimal, MarketDataError> {
    let price = entries
        .into_iter()
        .find(|e| e.market == symbol)
        .and_then(|e| e.last_price)
        .ok_or_else(|| MarketDataError::PriceNotFound(symbol.to_string()))?;

    if price <= Decimal::ZERO {
        return Err(MarketDataError::InvalidPrice {
            symbol: symbol.to_string(),
            price,
        });
    }
    Ok(price)
}

/// Pick the constraints for `symbol` out of a market-details listing.
///
/// A listed but inactive market is an error, never a tradable match.
fn find_constraints(
    listing: Vec<MarketDetails>,
    symbol: &str,
) -> Result<MarketConstraints, MarketDataError> {
    let details = listing
        .into_iter()
        .find(|m| m.matches(symbol))
        .ok_or_else(|| MarketDataError::ConstraintsNotFound(symbol.to_string()))?;

    if !details.is_active() {
        return Err(MarketDataError::MarketInactive {
            symbol: symbol.to_string(),
            status: details.status.unwrap_or_default(),
        });
    }
    details.into_constraints(symbol)
}
