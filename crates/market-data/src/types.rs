//! Wire types for the public ticker and market-details listings.
//!
//! Both listings are JSON arrays. Numeric fields arrive as JSON numbers on
//! some exchanges and as strings on others, and small values may use
//! exponent notation (`1e-5`), so every decimal goes through
//! [`deserialize_decimal`] instead of `f64`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use sr_core::types::MarketConstraints;

use crate::fetcher::MarketDataError;

/// Largest scale a `Decimal` can carry.
pub const MAX_DECIMAL_SCALE: u32 = 28;

/// One entry of the public ticker listing.
#[derive(Debug, Deserialize)]
pub struct TickerEntry {
    /// Exchange-native market identifier (e.g., `"BTCINR"`).
    pub market: String,
    /// Last traded price in quote currency.
    #[serde(default, deserialize_with = "deserialize_opt_decimal")]
    pub last_price: Option<Decimal>,
}

/// One entry of the public market-details listing.
#[derive(Debug, Deserialize)]
pub struct MarketDetails {
    /// Exchange display name (e.g., `"BTCINR"`).
    #[serde(default)]
    pub coindcx_name: Option<String>,
    /// Symbol identifier.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Pair identifier (e.g., `"I-BTC_INR"`).
    #[serde(default)]
    pub pair: Option<String>,
    /// Minimum base quantity.
    #[serde(deserialize_with = "deserialize_decimal")]
    pub min_quantity: Decimal,
    /// Maximum base quantity.
    #[serde(default, deserialize_with = "deserialize_opt_decimal")]
    pub max_quantity: Option<Decimal>,
    /// Decimal places of the base (traded) asset quantity.
    pub target_currency_precision: u32,
    /// Decimal places of the quote currency price.
    pub base_currency_precision: u32,
    /// Minimum order notional in quote currency.
    #[serde(default, deserialize_with = "deserialize_opt_decimal")]
    pub min_notional: Option<Decimal>,
    /// Listing status (e.g., `"active"`).
    #[serde(default)]
    pub status: Option<String>,
}

impl MarketDetails {
    /// Whether this listing entry describes `symbol` under any of its identifiers.
    pub fn matches(&self, symbol: &str) -> bool {
        [&self.coindcx_name, &self.symbol, &self.pair]
            .into_iter()
            .flatten()
            .any(|id| id == symbol)
    }

    /// Whether the market is open for trading. A missing status counts as active.
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .map_or(true, |s| s.eq_ignore_ascii_case("active"))
    }

    /// Convert into normalized constraints for `symbol`.
    ///
    /// Precisions beyond what a `Decimal` can represent are rejected.
    pub fn into_constraints(self, symbol: &str) -> Result<MarketConstraints, MarketDataError> {
        for (field, precision) in [
            ("target_currency_precision", self.target_currency_precision),
            ("base_currency_precision", self.base_currency_precision),
        ] {
            if precision > MAX_DECIMAL_SCALE {
                return Err(MarketDataError::Parse(format!(
                    "{} {} for {} exceeds {}",
                    field, precision, symbol, MAX_DECIMAL_SCALE
                )));
            }
        }
        Ok(MarketConstraints {
            symbol: symbol.to_string(),
            min_quantity: self.min_quantity,
            max_quantity: self.max_quantity,
            quantity_precision: self.target_currency_precision,
            price_precision: self.base_currency_precision,
            min_notional: self.min_notional,
        })
    }
}

/// Parse a decimal from its textual form, accepting exponent notation.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Deserialize a decimal from a JSON number or numeric string.
pub fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_opt_decimal(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("expected a decimal, found null"))
}

/// Like [`deserialize_decimal`] but maps `null` and `""` to `None`.
pub fn deserialize_opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let text = match &value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) if s.trim().is_empty() => return Ok(None),
        serde_json::Value::String(s) => s.clone(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected a decimal, found {}",
                other
            )))
        }
    };
    parse_decimal(&text)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid decimal: {}", text)))
}
