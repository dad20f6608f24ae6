//! Per-exchange wire conventions.
//!
//! An [`ExchangeProfile`] bundles everything that differs between the
//! supported exchanges: the order endpoint, authentication header names, the
//! signing-string convention, the canonical key order, and how logical order
//! fields map onto wire field names. Call sites select a profile once by
//! [`Exchange`] and never branch on the exchange themselves.

use sr_core::types::{Exchange, KeyOrder, OrderType};

use crate::signing::SigningScheme;

/// Logical order fields the payload builder knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Side,
    OrderType,
    Market,
    LimitPrice,
    Quantity,
    Notional,
    Timestamp,
}

/// A logical field and the name it carries on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub field: Field,
    pub name: &'static str,
}

const fn wire(field: Field, name: &'static str) -> FieldSpec {
    FieldSpec { field, name }
}

/// How decimal amounts are encoded in the JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberStyle {
    /// Bare JSON numbers in fixed notation: `"total_quantity":0.00004`.
    Bare,
    /// JSON strings: `"amount":"200"`.
    Quoted,
}

/// How market orders are sized for this exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizingMode {
    /// The exchange wants a base quantity; the pipeline derives it from the
    /// fiat amount and the last price.
    Quantity,
    /// The exchange accepts the fiat amount directly.
    Notional,
}

/// Names of the authentication headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthHeaders {
    pub api_key: &'static str,
    pub signature: &'static str,
    /// Header echoing the signing timestamp, if the exchange uses one.
    pub timestamp: Option<&'static str>,
}

/// Wire conventions for one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeProfile {
    pub exchange: Exchange,
    /// Path of the order-creation endpoint, relative to the REST base URL.
    pub order_path: &'static str,
    pub signing: SigningScheme,
    pub key_order: KeyOrder,
    pub sizing: SizingMode,
    pub number_style: NumberStyle,
    pub headers: AuthHeaders,
    /// Body fields in declaration order.
    pub fields: &'static [FieldSpec],
    pub market_order_type: &'static str,
    pub limit_order_type: &'static str,
    /// Limit orders must have a whole-number quote notional.
    pub integer_notional: bool,
}

const COINDCX_FIELDS: &[FieldSpec] = &[
    wire(Field::Side, "side"),
    wire(Field::OrderType, "order_type"),
    wire(Field::Market, "market"),
    wire(Field::LimitPrice, "price_per_unit"),
    wire(Field::Quantity, "total_quantity"),
    wire(Field::Timestamp, "timestamp"),
];

const ZEBPAY_FIELDS: &[FieldSpec] = &[
    wire(Field::Market, "market"),
    wire(Field::Side, "side"),
    wire(Field::OrderType, "order_type"),
    wire(Field::LimitPrice, "price"),
    wire(Field::Quantity, "quantity"),
    wire(Field::Notional, "amount"),
];

impl ExchangeProfile {
    /// The documented conventions of `exchange`.
    pub fn for_exchange(exchange: Exchange) -> Self {
        match exchange {
            Exchange::CoinDcx => Self {
                exchange,
                order_path: "/exchange/v1/orders/create",
                signing: SigningScheme::Payload,
                key_order: KeyOrder::Declaration,
                sizing: SizingMode::Quantity,
                number_style: NumberStyle::Bare,
                headers: AuthHeaders {
                    api_key: "X-AUTH-APIKEY",
                    signature: "X-AUTH-SIGNATURE",
                    timestamp: None,
                },
                fields: COINDCX_FIELDS,
                market_order_type: "market_order",
                limit_order_type: "limit_order",
                integer_notional: false,
            },
            Exchange::ZebPay => Self {
                exchange,
                order_path: "/trade/order",
                signing: SigningScheme::TimestampMethodPathBody,
                key_order: KeyOrder::Declaration,
                sizing: SizingMode::Notional,
                number_style: NumberStyle::Quoted,
                headers: AuthHeaders {
                    api_key: "X-Zebpay-ApiKey",
                    signature: "X-Zebpay-Signature",
                    timestamp: Some("X-Zebpay-Timestamp"),
                },
                fields: ZEBPAY_FIELDS,
                market_order_type: "market",
                limit_order_type: "limit",
                integer_notional: false,
            },
        }
    }

    /// Override the canonical key order.
    pub fn with_key_order(mut self, key_order: KeyOrder) -> Self {
        self.key_order = key_order;
        self
    }

    /// Require whole-number notionals on limit orders.
    pub fn with_integer_notional(mut self, integer_notional: bool) -> Self {
        self.integer_notional = integer_notional;
        self
    }

    /// Wire name of `order_type`.
    pub fn order_type_name(&self, order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market => self.market_order_type,
            OrderType::Limit => self.limit_order_type,
        }
    }

    /// Wire name of a logical field, if this exchange has one.
    pub fn field_name(&self, field: Field) -> Option<&'static str> {
        self.fields.iter().find(|f| f.field == field).map(|f| f.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coindcx_profile() {
        let p = ExchangeProfile::for_exchange(Exchange::CoinDcx);
        assert_eq!(p.order_path, "/exchange/v1/orders/create");
        assert_eq!(p.signing, SigningScheme::Payload);
        assert_eq!(p.sizing, SizingMode::Quantity);
        assert_eq!(p.field_name(Field::Quantity), Some("total_quantity"));
        assert_eq!(p.field_name(Field::Notional), None);
        assert_eq!(p.order_type_name(OrderType::Market), "market_order");
        assert!(p.headers.timestamp.is_none());
    }

    #[test]
    fn test_zebpay_profile() {
        let p = ExchangeProfile::for_exchange(Exchange::ZebPay);
        assert_eq!(p.order_path, "/trade/order");
        assert_eq!(p.signing, SigningScheme::TimestampMethodPathBody);
        assert_eq!(p.sizing, SizingMode::Notional);
        assert_eq!(p.field_name(Field::Notional), Some("amount"));
        assert_eq!(p.field_name(Field::Timestamp), None);
        assert_eq!(p.headers.timestamp, Some("X-Zebpay-Timestamp"));
        assert_eq!(p.order_type_name(OrderType::Limit), "limit");
    }

    #[test]
    fn test_overrides() {
        let p = ExchangeProfile::for_exchange(Exchange::CoinDcx)
            .with_key_order(KeyOrder::Alphabetical)
            .with_integer_notional(true);
        assert_eq!(p.key_order, KeyOrder::Alphabetical);
        assert!(p.integer_notional);
    }

    #[test]
    fn test_field_names_unique_per_profile() {
        for ex in [Exchange::CoinDcx, Exchange::ZebPay] {
            let p = ExchangeProfile::for_exchange(ex);
            let mut names: Vec<_> = p.fields.iter().map(|f| f.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), p.fields.len(), "{}", ex);
        }
    }
}
