//! Webhook signal validation.
//!
//! Decides whether an incoming alert should become an order. Everything here
//! is pure: the same payload and rules always produce the same decision.

use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::Deserialize;
use sr_core::config::{AppConfig, OrderStyle};
use sr_core::types::Side;

/// Alert body posted by the charting platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub signal: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    /// Per-alert fiat amount. May lower the configured amount, never raise it.
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// An alert that passed every check and should be traded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedSignal {
    pub side: Side,
    pub alert_symbol: String,
    pub exchange_symbol: String,
    pub amount: Decimal,
}

/// Why an alert was acknowledged without trading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    TradingDisabled,
    MissingSignal,
    UnknownSignal(String),
    SignalNotAllowed(Side),
    MissingSymbol,
    SymbolNotAllowed(String),
    InvalidAmount(Decimal),
    AmountAboveLimit { requested: Decimal, limit: Decimal },
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::TradingDisabled => write!(f, "trading disabled"),
            IgnoreReason::MissingSignal => write!(f, "missing signal"),
            IgnoreReason::UnknownSignal(s) => write!(f, "unrecognized signal {:?}", s),
            IgnoreReason::SignalNotAllowed(side) => write!(f, "{} signals not enabled", side),
            IgnoreReason::MissingSymbol => write!(f, "missing symbol"),
            IgnoreReason::SymbolNotAllowed(s) => write!(f, "symbol {} not allowed", s),
            IgnoreReason::InvalidAmount(a) => write!(f, "amount must be positive, got {}", a),
            IgnoreReason::AmountAboveLimit { requested, limit } => {
                write!(f, "amount {} exceeds configured limit {}", requested, limit)
            }
        }
    }
}

/// Read-only trading settings consulted for every alert.
#[derive(Debug, Clone)]
pub struct TradingRules {
    pub enabled: bool,
    /// Fiat amount per alert, and the ceiling for per-alert overrides.
    pub amount: Decimal,
    pub order_style: OrderStyle,
    pub limit_slippage_bps: u32,
    pub allowed_sides: Vec<Side>,
    pub allowed_symbols: Vec<String>,
    /// Upper-cased alert ticker to exchange market.
    pub symbols: HashMap<String, String>,
}

impl TradingRules {
    /// Extract the trading rules from the loaded configuration.
    ///
    /// Allow-list entries that are not `BUY`/`SELL` are dropped.
    pub fn from_config(config: &AppConfig) -> Self {
        let allowed_sides = config
            .trading
            .allowed_signals
            .iter()
            .filter_map(|s| s.parse::<Side>().ok())
            .collect();
        Self {
            enabled: config.trading.enabled,
            amount: config.trading.amount,
            order_style: config.trading.order_style,
            limit_slippage_bps: config.trading.limit_slippage_bps,
            allowed_sides,
            allowed_symbols: config
                .trading
                .allowed_symbols
                .iter()
                .map(|s| s.to_ascii_uppercase())
                .collect(),
            symbols: config
                .symbols
                .iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v.clone()))
                .collect(),
        }
    }

    /// Accept or ignore `payload`.
    ///
    /// An alert without a symbol trades the first allowed symbol.
    pub fn evaluate(&self, payload: &WebhookPayload) -> Result<AcceptedSignal, IgnoreReason> {
        if !self.enabled {
            return Err(IgnoreReason::TradingDisabled);
        }

        let raw_signal = payload.signal.as_deref().ok_or(IgnoreReason::MissingSignal)?;
        let side: Side = raw_signal
            .parse()
            .map_err(|_| IgnoreReason::UnknownSignal(raw_signal.to_string()))?;
        if !self.allowed_sides.contains(&side) {
            return Err(IgnoreReason::SignalNotAllowed(side));
        }

        let alert_symbol = match payload.symbol.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_ascii_uppercase(),
            _ => self
                .allowed_symbols
                .first()
                .cloned()
                .ok_or(IgnoreReason::MissingSymbol)?,
        };
        if !self.allowed_symbols.contains(&alert_symbol) {
            return Err(IgnoreReason::SymbolNotAllowed(alert_symbol));
        }

        let amount = payload.amount.unwrap_or(self.amount);
        if amount <= Decimal::ZERO {
            return Err(IgnoreReason::InvalidAmount(amount));
        }
        if amount > self.amount {
            return Err(IgnoreReason::AmountAboveLimit {
                requested: amount,
                limit: self.amount,
            });
        }

        let exchange_symbol = self
            .symbols
            .get(&alert_symbol)
            .cloned()
            .unwrap_or_else(|| alert_symbol.clone());

        Ok(AcceptedSignal {
            side,
            alert_symbol,
            exchange_symbol,
            amount,
        })
    }
}
