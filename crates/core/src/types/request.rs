//! The exchange-agnostic order request.
//!
//! An [`OrderRequest`] is built once per trade signal and never mutated. The
//! invariants are enforced at construction: a market order carries exactly one
//! size (base quantity or fiat notional, made exclusive by [`OrderSize`]), and
//! a limit price is present if and only if the order type is `Limit`.

use rust_decimal::Decimal;
use serde::Serialize;

use super::{OrderType, Side, Timestamp};

/// How an order is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSize {
    /// Base-asset quantity (e.g., 0.00004 BTC).
    Quantity(Decimal),
    /// Quote-currency notional (e.g., 200 INR).
    Notional(Decimal),
}

impl OrderSize {
    fn value(&self) -> Decimal {
        match self {
            OrderSize::Quantity(v) | OrderSize::Notional(v) => *v,
        }
    }
}

/// Violations of the [`OrderRequest`] invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderRequestError {
    /// Market symbol is empty.
    #[error("market symbol must not be empty")]
    EmptyMarket,
    /// Quantity or notional is zero or negative.
    #[error("order size must be positive, got {0}")]
    NonPositiveSize(Decimal),
    /// Limit order without a price, or market order with one.
    #[error("limit price must be set for limit orders and only for limit orders")]
    LimitPriceMismatch,
    /// Limit price is zero or negative.
    #[error("limit price must be positive, got {0}")]
    NonPositivePrice(Decimal),
    /// Limit orders are always sized in base quantity.
    #[error("limit orders must be sized by quantity")]
    NotionalLimitOrder,
}

/// A fully specified order, ready for the payload builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    market: String,
    side: Side,
    order_type: OrderType,
    size: OrderSize,
    limit_price: Option<Decimal>,
    timestamp: Timestamp,
}

impl OrderRequest {
    /// Build a market order.
    pub fn market(
        market: impl Into<String>,
        side: Side,
        size: OrderSize,
        timestamp: Timestamp,
    ) -> Result<Self, OrderRequestError> {
        Self::new(market.into(), side, OrderType::Market, size, None, timestamp)
    }

    /// Build a limit order sized in base quantity.
    pub fn limit(
        market: impl Into<String>,
        side: Side,
        quantity: Decimal,
        limit_price: Decimal,
        timestamp: Timestamp,
    ) -> Result<Self, OrderRequestError> {
        Self::new(
            market.into(),
            side,
            OrderType::Limit,
            OrderSize::Quantity(quantity),
            Some(limit_price),
            timestamp,
        )
    }

    /// Build an order from its parts, checking every invariant.
    pub fn new(
        market: String,
        side: Side,
        order_type: OrderType,
        size: OrderSize,
        limit_price: Option<Decimal>,
        timestamp: Timestamp,
    ) -> Result<Self, OrderRequestError> {
        if market.trim().is_empty() {
            return Err(OrderRequestError::EmptyMarket);
        }
        if size.value() <= Decimal::ZERO {
            return Err(OrderRequestError::NonPositiveSize(size.value()));
        }
        match (order_type, limit_price) {
            (OrderType::Limit, Some(price)) => {
                if price <= Decimal::ZERO {
                    return Err(OrderRequestError::NonPositivePrice(price));
                }
                if matches!(size, OrderSize::Notional(_)) {
                    return Err(OrderRequestError::NotionalLimitOrder);
                }
            }
            (OrderType::Market, None) => {}
            _ => return Err(OrderRequestError::LimitPriceMismatch),
        }
        Ok(Self {
            market,
            side,
            order_type,
            size,
            limit_price,
            timestamp,
        })
    }

    /// Exchange-native market symbol.
    pub fn market_symbol(&self) -> &str {
        &self.market
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn size(&self) -> OrderSize {
        self.size
    }

    /// Base quantity, if the order is sized by quantity.
    pub fn quantity(&self) -> Option<Decimal> {
        match self.size {
            OrderSize::Quantity(q) => Some(q),
            OrderSize::Notional(_) => None,
        }
    }

    /// Fiat notional, if the order is sized by notional.
    pub fn notional_amount(&self) -> Option<Decimal> {
        match self.size {
            OrderSize::Notional(n) => Some(n),
            OrderSize::Quantity(_) => None,
        }
    }

    pub fn limit_price(&self) -> Option<Decimal> {
        self.limit_price
    }

    /// The single timestamp embedded in the payload and signing string.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
