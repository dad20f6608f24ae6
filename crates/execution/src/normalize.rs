//! Quantity and price normalization.
//!
//! Converts a fiat budget and a market price into an exchange-legal quantity
//! (or a limit price) under the market's precision rules. Every reduction in
//! precision truncates toward zero so the resulting notional never exceeds the
//! budget, and a result below the exchange minimum is an error rather than
//! being clamped upward.

use rust_decimal::{Decimal, RoundingStrategy};
use sr_core::types::{MarketConstraints, Side};

/// Maximum single-step quantity reductions tried by [`fit_integer_notional`].
pub const MAX_NOTIONAL_ADJUSTMENTS: u32 = 10;

/// Reasons an order cannot be expressed within the exchange's rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrecisionError {
    /// Fiat amount is zero or negative.
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Decimal),
    /// Price is zero or negative (possibly after integer truncation).
    #[error("price must be positive, got {0}")]
    InvalidPrice(Decimal),
    /// Truncated quantity is below the exchange minimum.
    #[error("quantity {computed} is below the minimum {minimum}")]
    QuantityTooSmall { computed: Decimal, minimum: Decimal },
    /// Truncated quantity is above the exchange maximum.
    #[error("quantity {computed} is above the maximum {maximum}")]
    QuantityTooLarge { computed: Decimal, maximum: Decimal },
    /// `quantity × price` is below the exchange's minimum notional.
    #[error("order notional {notional} is below the minimum {minimum}")]
    NotionalTooSmall { notional: Decimal, minimum: Decimal },
    /// No quantity within the adjustment budget gives a whole-number notional.
    #[error("no integer notional found after {attempts} quantity adjustments")]
    IntegerNotionalUnsatisfiable { attempts: u32 },
    /// Quantity precision beyond what a decimal can represent.
    #[error("unsupported quantity precision {0}")]
    UnsupportedPrecision(u32),
}

/// Truncate `value` to `precision` decimal places, toward zero.
#[inline]
pub fn truncate(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::ToZero)
}

/// Render `value` in fixed notation with at most `precision` decimals.
///
/// Digits beyond `precision` are truncated and trailing zeros are stripped.
/// The output never uses exponent notation: `0.00002` renders as `"0.00002"`.
pub fn format_decimal(value: Decimal, precision: u32) -> String {
    truncate(value, precision).normalize().to_string()
}

/// Base quantity purchasable with `notional` at `price`.
///
/// When the market only accepts integer prices, `price` is truncated to an
/// integer first, matching the price that would be sent on the wire.
pub fn compute_quantity(
    notional: Decimal,
    price: Decimal,
    constraints: &MarketConstraints,
) -> Result<Decimal, PrecisionError> {
    if notional <= Decimal::ZERO {
        return Err(PrecisionError::InvalidAmount(notional));
    }
    let effective_price = effective_price(price, constraints)?;

    let raw = notional
        .checked_div(effective_price)
        .ok_or(PrecisionError::InvalidPrice(effective_price))?;
    let quantity = truncate(raw, constraints.quantity_precision);

    if quantity < constraints.min_quantity {
        return Err(PrecisionError::QuantityTooSmall {
            computed: quantity,
            minimum: constraints.min_quantity,
        });
    }
    if let Some(maximum) = constraints.max_quantity {
        if quantity > maximum {
            return Err(PrecisionError::QuantityTooLarge {
                computed: quantity,
                maximum,
            });
        }
    }
    check_min_notional(quantity, effective_price, constraints)?;

    Ok(quantity)
}

/// Marketable limit price: last price moved by `slippage_bps` against the taker.
///
/// Buys pay up to `price × (1 + bps/10 000)`, sells accept down to
/// `price × (1 − bps/10 000)`. The result is truncated to `price_precision`
/// decimals; `0` yields an integer price.
pub fn compute_limit_price(
    market_price: Decimal,
    slippage_bps: u32,
    side: Side,
    price_precision: u32,
) -> Result<Decimal, PrecisionError> {
    if market_price <= Decimal::ZERO {
        return Err(PrecisionError::InvalidPrice(market_price));
    }
    let buffer = Decimal::from(slippage_bps) / Decimal::from(10_000u32);
    let factor = match side {
        Side::Buy => Decimal::ONE + buffer,
        Side::Sell => Decimal::ONE - buffer,
    };
    let price = truncate(market_price * factor, price_precision);
    if price <= Decimal::ZERO {
        return Err(PrecisionError::InvalidPrice(price));
    }
    Ok(price)
}

/// Step `quantity` down until `quantity × price` is a whole number.
///
/// Each step removes one unit of the last quantity decimal. Gives up after
/// [`MAX_NOTIONAL_ADJUSTMENTS`] steps, or earlier if the quantity would drop
/// below the exchange minimum.
pub fn fit_integer_notional(
    quantity: Decimal,
    price: Decimal,
    constraints: &MarketConstraints,
) -> Result<Decimal, PrecisionError> {
    let step = Decimal::try_new(1, constraints.quantity_precision)
        .map_err(|_| PrecisionError::UnsupportedPrecision(constraints.quantity_precision))?;
    let mut candidate = quantity;

    for _ in 0..=MAX_NOTIONAL_ADJUSTMENTS {
        if candidate < constraints.min_quantity {
            return Err(PrecisionError::QuantityTooSmall {
                computed: candidate,
                minimum: constraints.min_quantity,
            });
        }
        if (candidate * price).fract().is_zero() {
            check_min_notional(candidate, price, constraints)?;
            return Ok(candidate);
        }
        candidate -= step;
    }

    Err(PrecisionError::IntegerNotionalUnsatisfiable {
        attempts: MAX_NOTIONAL_ADJUSTMENTS,
    })
}

fn effective_price(price: Decimal, constraints: &MarketConstraints) -> Result<Decimal, PrecisionError> {
    if price <= Decimal::ZERO {
        return Err(PrecisionError::InvalidPrice(price));
    }
    let price = if constraints.price_is_integer() {
        price.trunc()
    } else {
        price
    };
    if price <= Decimal::ZERO {
        return Err(PrecisionError::InvalidPrice(price));
    }
    Ok(price)
}

fn check_min_notional(
    quantity: Decimal,
    price: Decimal,
    constraints: &MarketConstraints,
) -> Result<(), PrecisionError> {
    if let Some(minimum) = constraints.min_notional {
        let notional = quantity * price;
        if notional < minimum {
            return Err(PrecisionError::NotionalTooSmall { notional, minimum });
        }
    }
    Ok(())
}
