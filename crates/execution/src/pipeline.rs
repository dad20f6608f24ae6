//! The order-placement pipeline.
//!
//! One call runs one order through
//! `Idle → PriceFetched → Normalized → PayloadBuilt → Signed → Submitted`
//! and ends in an [`Outcome`]. Stages run sequentially. Every failure before
//! `Submitted` stops the pipeline without touching the order endpoint.
//!
//! Pipelines hold only read-only state (profile, credentials, clients), so a
//! single instance behind an `Arc` serves any number of concurrent orders.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use sr_core::types::{
    Clock, Credentials, MarketConstraints, OrderRequest, OrderRequestError, OrderSize, Side,
    SystemClock,
};
use sr_market_data::{MarketDataError, MarketDataFetcher};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::client::{ExchangeClient, ExchangeResult, Outcome};
use crate::exchange::{ExchangeProfile, SizingMode};
use crate::normalize::{
    compute_limit_price, compute_quantity, fit_integer_notional, PrecisionError,
};
use crate::payload::PayloadError;
use crate::request::SignedRequest;

/// Reasons an order was abandoned before submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("market data unavailable: {0}")]
    MarketData(#[from] MarketDataError),
    #[error("precision constraint violated: {0}")]
    Precision(#[from] PrecisionError),
    #[error("invalid order: {0}")]
    InvalidOrder(#[from] OrderRequestError),
    #[error("payload construction failed: {0}")]
    Payload(#[from] PayloadError),
}

impl PipelineError {
    /// Status reported to the caller in place of an exchange response.
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::MarketData(e) if e.is_timeout() => 504,
            PipelineError::MarketData(_) => 502,
            PipelineError::Precision(_) | PipelineError::InvalidOrder(_) => 422,
            PipelineError::Payload(_) => 500,
        }
    }

    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MarketData(_) => "market_data",
            PipelineError::Precision(_) => "precision",
            PipelineError::InvalidOrder(_) => "invalid_order",
            PipelineError::Payload(_) => "payload",
        }
    }

    pub fn into_result(self) -> ExchangeResult {
        ExchangeResult::pre_submit_failure(self.status_code(), self.kind(), self.to_string())
    }
}

/// Pipeline stages, recorded as the `stage` field of progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PriceFetched,
    Normalized,
    PayloadBuilt,
    Signed,
    Submitted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::PriceFetched => "price_fetched",
            Stage::Normalized => "normalized",
            Stage::PayloadBuilt => "payload_built",
            Stage::Signed => "signed",
            Stage::Submitted => "submitted",
        };
        f.write_str(s)
    }
}

/// Places orders on one exchange.
pub struct OrderPipeline {
    profile: ExchangeProfile,
    credentials: Credentials,
    fetcher: Arc<dyn MarketDataFetcher>,
    client: ExchangeClient,
    clock: Arc<dyn Clock>,
}

impl OrderPipeline {
    pub fn new(
        profile: ExchangeProfile,
        credentials: Credentials,
        fetcher: Arc<dyn MarketDataFetcher>,
        client: ExchangeClient,
    ) -> Self {
        Self {
            profile,
            credentials,
            fetcher,
            client,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock used for order timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn profile(&self) -> &ExchangeProfile {
        &self.profile
    }

    /// Market order worth `fiat_amount` of quote currency.
    ///
    /// Pre-submission failures are folded into the returned result; see
    /// [`try_place_order`](Self::try_place_order) to get them as errors.
    pub async fn place_order(&self, symbol: &str, side: Side, fiat_amount: Decimal) -> ExchangeResult {
        self.try_place_order(symbol, side, fiat_amount)
            .await
            .unwrap_or_else(PipelineError::into_result)
    }

    /// Market order worth `fiat_amount`, failing early on pre-submission errors.
    pub async fn try_place_order(
        &self,
        symbol: &str,
        side: Side,
        fiat_amount: Decimal,
    ) -> Result<ExchangeResult, PipelineError> {
        let span = self.span(symbol, side, "market");
        async {
            self.market_order(symbol, side, fiat_amount)
                .await
                .inspect_err(log_abort)
        }
        .instrument(span)
        .await
    }

    /// Marketable limit order worth at most `fiat_amount`.
    ///
    /// The limit price is the last price moved `slippage_bps` against the
    /// taker, so the order fills like a market order with a bounded price.
    pub async fn place_limit_like_order(
        &self,
        symbol: &str,
        side: Side,
        fiat_amount: Decimal,
        slippage_bps: u32,
    ) -> ExchangeResult {
        self.try_place_limit_like_order(symbol, side, fiat_amount, slippage_bps)
            .await
            .unwrap_or_else(PipelineError::into_result)
    }

    /// Marketable limit order, failing early on pre-submission errors.
    pub async fn try_place_limit_like_order(
        &self,
        symbol: &str,
        side: Side,
        fiat_amount: Decimal,
        slippage_bps: u32,
    ) -> Result<ExchangeResult, PipelineError> {
        let span = self.span(symbol, side, "limit");
        async {
            self.limit_order(symbol, side, fiat_amount, slippage_bps)
                .await
                .inspect_err(log_abort)
        }
        .instrument(span)
        .await
    }

    async fn market_order(
        &self,
        symbol: &str,
        side: Side,
        fiat_amount: Decimal,
    ) -> Result<ExchangeResult, PipelineError> {
        let request = match self.profile.sizing {
            SizingMode::Notional => OrderRequest::market(
                symbol,
                side,
                OrderSize::Notional(fiat_amount),
                self.clock.now(),
            )?,
            SizingMode::Quantity => {
                let (price, constraints) = self.market_snapshot(symbol).await?;
                let quantity = compute_quantity(fiat_amount, price, &constraints)?;
                debug!(stage = %Stage::Normalized, %quantity, "quantity computed");
                OrderRequest::market(symbol, side, OrderSize::Quantity(quantity), self.clock.now())?
            }
        };
        self.sign_and_submit(&request).await
    }

    async fn limit_order(
        &self,
        symbol: &str,
        side: Side,
        fiat_amount: Decimal,
        slippage_bps: u32,
    ) -> Result<ExchangeResult, PipelineError> {
        let (price, constraints) = self.market_snapshot(symbol).await?;
        let limit_price = compute_limit_price(price, slippage_bps, side, constraints.price_precision)?;
        let mut quantity = compute_quantity(fiat_amount, limit_price, &constraints)?;
        if self.profile.integer_notional {
            quantity = fit_integer_notional(quantity, limit_price, &constraints)?;
        }
        debug!(stage = %Stage::Normalized, %quantity, %limit_price, "limit order sized");

        let request = OrderRequest::limit(symbol, side, quantity, limit_price, self.clock.now())?;
        self.sign_and_submit(&request).await
    }

    fn span(&self, symbol: &str, side: Side, style: &'static str) -> tracing::Span {
        info_span!(
            "place_order",
            exchange = %self.profile.exchange,
            market = symbol,
            side = %side,
            style,
        )
    }

    async fn market_snapshot(
        &self,
        symbol: &str,
    ) -> Result<(Decimal, MarketConstraints), PipelineError> {
        let price = self.fetcher.fetch_last_price(symbol).await?;
        let constraints = self.fetcher.fetch_constraints(symbol).await?;
        debug!(stage = %Stage::PriceFetched, %price, "market data fetched");
        Ok((price, constraints))
    }

    async fn sign_and_submit(&self, request: &OrderRequest) -> Result<ExchangeResult, PipelineError> {
        let signed = SignedRequest::build(
            &self.profile,
            &self.credentials,
            self.client.base_url(),
            request,
        )?;
        debug!(stage = %Stage::PayloadBuilt, payload_len = signed.payload.len(), "payload built");
        debug!(stage = %Stage::Signed, timestamp = %signed.timestamp, "payload signed");

        let result = self.client.submit(&signed).await;
        let outcome = result.outcome();
        match outcome {
            Outcome::Succeeded => info!(
                stage = %Stage::Submitted,
                http_status = result.http_status,
                ?outcome,
                "order accepted"
            ),
            _ => warn!(
                stage = %Stage::Submitted,
                http_status = result.http_status,
                ?outcome,
                "order not accepted"
            ),
        }
        Ok(result)
    }
}

fn log_abort(e: &PipelineError) {
    warn!(kind = e.kind(), status = e.status_code(), error = %e, "order abandoned before submission");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use sr_core::types::{Exchange, FixedClock, Timestamp};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct StaticMarket {
        price: Result<Decimal, MarketDataError>,
        constraints: MarketConstraints,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataFetcher for StaticMarket {
        async fn fetch_last_price(&self, _symbol: &str) -> Result<Decimal, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.price.clone()
        }

        async fn fetch_constraints(&self, _symbol: &str) -> Result<MarketConstraints, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.constraints.clone())
        }
    }

    fn constraints() -> MarketConstraints {
        MarketConstraints {
            symbol: "BTCINR".into(),
            min_quantity: dec!(0.00001),
            max_quantity: None,
            quantity_precision: 5,
            price_precision: 0,
            min_notional: None,
        }
    }

    fn pipeline(exchange: Exchange, market: Arc<StaticMarket>) -> OrderPipeline {
        // Nothing listens on port 9; any submission fails with a transport error.
        let client = ExchangeClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        OrderPipeline::new(
            ExchangeProfile::for_exchange(exchange),
            Credentials::new("k", "s"),
            market,
            client,
        )
        .with_clock(Arc::new(FixedClock(Timestamp(1_700_000_000_000))))
    }

    fn market(price: Result<Decimal, MarketDataError>) -> Arc<StaticMarket> {
        Arc::new(StaticMarket {
            price,
            constraints: constraints(),
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_quantity_too_small_aborts() {
        let p = pipeline(Exchange::CoinDcx, market(Ok(dec!(25000000))));
        let err = p.try_place_order("BTCINR", Side::Buy, dec!(200)).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Precision(PrecisionError::QuantityTooSmall { .. })
        ));
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_market_data_timeout_is_504() {
        let m = market(Err(MarketDataError::Timeout { url: "t".into() }));
        let p = pipeline(Exchange::CoinDcx, m.clone());
        let result = p.place_order("BTCINR", Side::Buy, dec!(200)).await;
        assert_eq!(result.http_status, 504);
        assert_eq!(result.outcome(), Outcome::PreSubmitFailed);
        assert_eq!(result.to_json()["error"], "market_data");
        assert_eq!(m.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_price_not_found_is_502() {
        let p = pipeline(
            Exchange::CoinDcx,
            market(Err(MarketDataError::PriceNotFound("BTCINR".into()))),
        );
        let result = p.place_order("BTCINR", Side::Buy, dec!(200)).await;
        assert_eq!(result.http_status, 502);
    }

    #[tokio::test]
    async fn test_notional_exchange_skips_market_data() {
        let m = market(Ok(dec!(5000000)));
        let p = pipeline(Exchange::ZebPay, m.clone());
        let result = p.place_order("BTCINR", Side::Buy, dec!(200)).await;
        assert_eq!(m.calls.load(Ordering::SeqCst), 0);
        assert_eq!(result.outcome(), Outcome::TransportFailed);
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected() {
        let p = pipeline(Exchange::ZebPay, market(Ok(dec!(5000000))));
        let err = p.try_place_order("BTCINR", Side::Buy, dec!(0)).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidOrder(_)));
        assert_eq!(err.status_code(), 422);
    }

    #[tokio::test]
    async fn test_integer_notional_unsatisfiable() {
        let m = Arc::new(StaticMarket {
            price: Ok(dec!(150.3)),
            constraints: MarketConstraints {
                price_precision: 1,
                quantity_precision: 2,
                min_quantity: dec!(0.01),
                ..constraints()
            },
            calls: AtomicUsize::new(0),
        });
        let client = ExchangeClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let p = OrderPipeline::new(
            ExchangeProfile::for_exchange(Exchange::CoinDcx).with_integer_notional(true),
            Credentials::new("k", "s"),
            m,
            client,
        );
        // Limit price 150.3 (0 bps); 161 / 150.3 = 1.07, and no quantity from
        // 1.07 down to 0.97 yields a whole-number notional at 150.3.
        let err = p
            .try_place_limit_like_order("BTCINR", Side::Buy, dec!(161), 0)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            PipelineError::Precision(PrecisionError::IntegerNotionalUnsatisfiable { attempts: 10 })
        );
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::PriceFetched.to_string(), "price_fetched");
        assert_eq!(Stage::Submitted.to_string(), "submitted");
    }
}
