//! Exchange-published trading rules for a market.

use rust_decimal::Decimal;
use serde::Serialize;

/// Precision and minimum-size rules for one market.
///
/// Fetched fresh for every order and treated as read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketConstraints {
    /// Exchange-native symbol.
    pub symbol: String,
    /// Smallest accepted base quantity.
    pub min_quantity: Decimal,
    /// Largest accepted base quantity, if published.
    pub max_quantity: Option<Decimal>,
    /// Decimal places allowed in the base quantity.
    pub quantity_precision: u32,
    /// Decimal places allowed in the quote price. `0` means integer prices.
    pub price_precision: u32,
    /// Smallest accepted quote notional, if published.
    pub min_notional: Option<Decimal>,
}

impl MarketConstraints {
    /// Whether the exchange only accepts whole-number quote prices.
    pub fn price_is_integer(&self) -> bool {
        self.price_precision == 0
    }
}
