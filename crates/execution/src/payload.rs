//! Canonical order payloads.
//!
//! The builder renders an [`OrderRequest`] into the exact byte string that is
//! both signed and transmitted. Once built, the payload is held as an opaque
//! string; nothing downstream can re-serialize it, so the signed bytes and the
//! sent bytes cannot diverge.

use rust_decimal::Decimal;
use sr_core::types::{KeyOrder, OrderRequest};

use crate::exchange::{ExchangeProfile, Field, NumberStyle};

/// Failures while rendering a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    /// The order is sized in a way this exchange has no wire field for.
    #[error("{exchange} has no wire field for {field:?} sizing")]
    UnsupportedSize { exchange: String, field: Field },
    /// A string value could not be JSON-encoded.
    #[error("failed to encode field {field}: {reason}")]
    Serialization { field: &'static str, reason: String },
}

/// The exact request body, signed and sent unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPayload(String);

impl CanonicalPayload {
    /// Wrap an already canonical string. Only the builder produces these.
    pub(crate) fn from_canonical(body: String) -> Self {
        Self(body)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rendered JSON value of one field.
enum Value<'a> {
    Str(&'a str),
    Number(String),
}

/// Renders orders according to one exchange's wire conventions.
pub struct PayloadBuilder<'p> {
    profile: &'p ExchangeProfile,
}

impl<'p> PayloadBuilder<'p> {
    pub fn new(profile: &'p ExchangeProfile) -> Self {
        Self { profile }
    }

    /// Serialize `request` as compact JSON.
    ///
    /// Fields absent from the request (no limit price on a market order, no
    /// notional on a quantity-sized order) are omitted. Keys follow the
    /// profile's key order.
    pub fn build(&self, request: &OrderRequest) -> Result<CanonicalPayload, PayloadError> {
        self.check_size_supported(request)?;

        let mut entries: Vec<(&'static str, Value<'_>)> = Vec::with_capacity(self.profile.fields.len());
        for entry in self.profile.fields {
            let value = match entry.field {
                Field::Side => Some(Value::Str(request.side().as_wire())),
                Field::OrderType => Some(Value::Str(
                    self.profile.order_type_name(request.order_type()),
                )),
                Field::Market => Some(Value::Str(request.market_symbol())),
                Field::LimitPrice => request.limit_price().map(|p| self.number(p)),
                Field::Quantity => request.quantity().map(|q| self.number(q)),
                Field::Notional => request.notional_amount().map(|n| self.number(n)),
                Field::Timestamp => Some(Value::Number(request.timestamp().to_string())),
            };
            if let Some(value) = value {
                entries.push((entry.name, value));
            }
        }

        if self.profile.key_order == KeyOrder::Alphabetical {
            entries.sort_by(|a, b| a.0.cmp(b.0));
        }

        let mut body = String::with_capacity(128);
        body.push('{');
        for (i, &(name, ref value)) in entries.iter().enumerate() {
            if i > 0 {
                body.push(',');
            }
            body.push_str(&encode_str(name, name)?);
            body.push(':');
            match value {
                Value::Str(s) => body.push_str(&encode_str(name, s)?),
                Value::Number(n) => body.push_str(n),
            }
        }
        body.push('}');

        Ok(CanonicalPayload::from_canonical(body))
    }

    fn check_size_supported(&self, request: &OrderRequest) -> Result<(), PayloadError> {
        let field = if request.quantity().is_some() {
            Field::Quantity
        } else {
            Field::Notional
        };
        if self.profile.field_name(field).is_none() {
            return Err(PayloadError::UnsupportedSize {
                exchange: self.profile.exchange.to_string(),
                field,
            });
        }
        Ok(())
    }

    /// Fixed-notation decimal, bare or quoted per the profile.
    fn number(&self, value: Decimal) -> Value<'static> {
        let digits = value.normalize().to_string();
        match self.profile.number_style {
            NumberStyle::Bare => Value::Number(digits),
            NumberStyle::Quoted => Value::Number(format!("\"{}\"", digits)),
        }
    }
}

fn encode_str(field: &'static str, value: &str) -> Result<String, PayloadError> {
    serde_json::to_string(value).map_err(|e| PayloadError::Serialization {
        field,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sr_core::types::{Exchange, OrderSize, Side, Timestamp};

    const TS: Timestamp = Timestamp(1_700_000_000_000);

    fn coindcx() -> ExchangeProfile {
        ExchangeProfile::for_exchange(Exchange::CoinDcx)
    }

    fn zebpay() -> ExchangeProfile {
        ExchangeProfile::for_exchange(Exchange::ZebPay)
    }

    #[test]
    fn test_coindcx_market_order() {
        let req = OrderRequest::market("BTCINR", Side::Buy, OrderSize::Quantity(dec!(0.00004)), TS)
            .unwrap();
        let profile = coindcx();
        let payload = PayloadBuilder::new(&profile).build(&req).unwrap();
        assert_eq!(
            payload.as_str(),
            r#"{"side":"buy","order_type":"market_order","market":"BTCINR","total_quantity":0.00004,"timestamp":1700000000000}"#
        );
    }

    #[test]
    fn test_coindcx_limit_order() {
        let req = OrderRequest::limit("BTCINR", Side::Sell, dec!(0.0004), dec!(5025000), TS).unwrap();
        let profile = coindcx();
        let payload = PayloadBuilder::new(&profile).build(&req).unwrap();
        assert_eq!(
            payload.as_str(),
            r#"{"side":"sell","order_type":"limit_order","market":"BTCINR","price_per_unit":5025000,"total_quantity":0.0004,"timestamp":1700000000000}"#
        );
    }

    #[test]
    fn test_zebpay_market_order_by_notional() {
        let req = OrderRequest::market("BTCINR", Side::Buy, OrderSize::Notional(dec!(200)), TS)
            .unwrap();
        let profile = zebpay();
        let payload = PayloadBuilder::new(&profile).build(&req).unwrap();
        assert_eq!(
            payload.as_str(),
            r#"{"market":"BTCINR","side":"buy","order_type":"market","amount":"200"}"#
        );
    }

    #[test]
    fn test_zebpay_limit_order_quotes_numbers() {
        let req = OrderRequest::limit("BTC-INR", Side::Buy, dec!(0.00002), dec!(5000000.50), TS)
            .unwrap();
        let profile = zebpay();
        let payload = PayloadBuilder::new(&profile).build(&req).unwrap();
        assert_eq!(
            payload.as_str(),
            r#"{"market":"BTC-INR","side":"buy","order_type":"limit","price":"5000000.5","quantity":"0.00002"}"#
        );
    }

    #[test]
    fn test_alphabetical_key_order() {
        let req = OrderRequest::market("BTCINR", Side::Buy, OrderSize::Quantity(dec!(0.00004)), TS)
            .unwrap();
        let profile = coindcx().with_key_order(KeyOrder::Alphabetical);
        let payload = PayloadBuilder::new(&profile).build(&req).unwrap();
        assert_eq!(
            payload.as_str(),
            r#"{"market":"BTCINR","order_type":"market_order","side":"buy","timestamp":1700000000000,"total_quantity":0.00004}"#
        );
    }

    #[test]
    fn test_notional_unsupported_on_quantity_exchange() {
        let req = OrderRequest::market("BTCINR", Side::Buy, OrderSize::Notional(dec!(200)), TS)
            .unwrap();
        let profile = coindcx();
        let err = PayloadBuilder::new(&profile).build(&req).unwrap_err();
        assert!(matches!(
            err,
            PayloadError::UnsupportedSize { field: Field::Notional, .. }
        ));
    }

    #[test]
    fn test_market_symbol_is_escaped() {
        let req = OrderRequest::market("BTC\"INR", Side::Buy, OrderSize::Quantity(dec!(1)), TS)
            .unwrap();
        let profile = coindcx();
        let payload = PayloadBuilder::new(&profile).build(&req).unwrap();
        assert!(payload.as_str().contains(r#""market":"BTC\"INR""#));
        let parsed: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
        assert_eq!(parsed["market"], "BTC\"INR");
    }

    #[test]
    fn test_small_quantities_never_use_exponent() {
        let profile = coindcx();
        let cases = [
            (dec!(0.00002), "0.00002"),
            (dec!(0.00000001), "0.00000001"),
            (dec!(0.000100), "0.0001"),
        ];
        for (q, expected) in cases {
            let req = OrderRequest::market("BTCINR", Side::Buy, OrderSize::Quantity(q), TS).unwrap();
            let payload = PayloadBuilder::new(&profile).build(&req).unwrap();
            let field = format!("\"total_quantity\":{},", expected);
            assert!(payload.as_str().contains(&field), "{}", payload.as_str());
        }
    }

    #[test]
    fn test_build_is_reproducible() {
        let req = OrderRequest::market("BTCINR", Side::Buy, OrderSize::Quantity(dec!(0.5)), TS)
            .unwrap();
        let profile = coindcx();
        let builder = PayloadBuilder::new(&profile);
        assert_eq!(builder.build(&req).unwrap(), builder.build(&req).unwrap());
    }
}
