//! Layered configuration for the signal relay.
//!
//! Configuration is loaded in layers with increasing priority:
//! 1. Compiled-in defaults (CoinDCX endpoints, 200 INR per signal, BUY only)
//! 2. TOML configuration file (if provided)
//! 3. Environment variable overrides (prefix `SIGNAL_RELAY_`, nested with `__`)
//! 4. Dedicated env vars for API credentials (`COINDCX_API_KEY`, etc.)
//!
//! API keys and secrets **must** come from environment variables, never from
//! configuration files, to prevent accidental check-in of credentials. Missing
//! credentials fail [`AppConfig::load`]; the process must not serve requests
//! without them.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{Credentials, Exchange, KeyOrder};

// ── Default value functions ────────────────────────────────────────────

/// Default market-data request timeout: 10 000 ms.
fn default_timeout_ms() -> u64 {
    10_000
}

/// Default order-submission timeout: 15 000 ms.
fn default_order_timeout_ms() -> u64 {
    15_000
}

/// Default limit-order slippage buffer: 50 basis points.
fn default_limit_slippage_bps() -> u32 {
    50
}

/// Default HTTP listen port.
fn default_port() -> u16 {
    8000
}

fn default_true() -> bool {
    true
}

// ── Configuration structs ──────────────────────────────────────────────

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Target exchange connection settings.
    pub exchange: ExchangeConfig,
    /// What to trade, how much, and which signals to act on.
    pub trading: TradingConfig,
    /// Alert ticker → exchange-native market. Unmapped tickers pass through.
    #[serde(default)]
    pub symbols: HashMap<String, String>,
    /// Webhook listener settings.
    pub server: ServerConfig,
}

/// Exchange connection configuration.
///
/// API key and secret **must** come from environment variables, never config
/// files. The `#[serde(default)]` annotation ensures deserialization does not
/// require them in the TOML source.
#[derive(Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Which exchange to trade on.
    pub kind: Exchange,
    /// API key, normally from an env var (e.g., `COINDCX_API_KEY`).
    #[serde(default)]
    pub api_key: String,
    /// API secret, normally from an env var (e.g., `COINDCX_API_SECRET`).
    #[serde(default)]
    pub api_secret: String,
    /// Authenticated REST base URL. Defaults per exchange.
    #[serde(default)]
    pub rest_url: Option<String>,
    /// Public ticker listing URL.
    ///
    /// Only CoinDCX has a built-in default; other exchanges must configure
    /// one before anything that needs a price can run.
    pub fn ticker_url(&self) -> Option<&str> {
        match (&self.ticker_url, self.kind) {
            (Some(url), _) => Some(url.as_str()),
            (None, Exchange::CoinDcx) => Some("https://api.coindcx.com/exchange/ticker"),
            (None, Exchange::ZebPay) => None,
        }
    }

    /// Public market-details listing URL. Defaults like [`Self::ticker_url`].
    pub fn markets_url(&self) -> Option<&str> {
        match (&self.markets_url, self.kind) {
            (Some(url), _) => Some(url.as_str()),
            (None, Exchange::CoinDcx) => Some("https://api.coindcx.com/exchange/v1/markets_details"),
            (None, Exchange::ZebPay) => None,
        }
    }

    /// Whether both market-data listings are available.
    pub fn has_market_data(&self) -> bool {
        self.ticker_url().is_some() && self.markets_url().is_some()
    }

    /// Credentials for the signer, built once at startup.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.api_key.clone(), self.api_secret.clone().into_bytes())
    }

    /// Names of the env vars carrying this exchange's key and secret.
    pub fn credential_env_vars(&self) -> (&'static str, &'static str) {
        match self.kind {
            Exchange::CoinDcx => ("COINDCX_API_KEY", "COINDCX_API_SECRET"),
            Exchange::ZebPay => ("ZEBPAY_API_KEY", "ZEBPAY_API_SECRET"),
        }
    }
}

impl std::fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("kind", &self.kind)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .field("rest_url", &self.rest_url())
            .field("ticker_url", &self.ticker_url())
            .field("markets_url", &self.markets_url())
            .field("timeout_ms", &self.timeout_ms)
            .field("order_timeout_ms", &self.order_timeout_ms)
            .field("key_order", &self.key_order)
            .field("integer_notional", &self.integer_notional)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration using layered sources.
    ///
    /// 1. Compiled-in defaults.
    /// 2. TOML file at `config_path` (if `Some`).
    /// 3. Environment variable overrides with prefix `SIGNAL_RELAY_` and `__`
    ///    as the nesting separator (e.g., `SIGNAL_RELAY_TRADING__AMOUNT=500`).
    /// 4. API credentials from the exchange's dedicated env vars.
    ///
    /// After loading, validates that credentials are present and the trading
    /// parameters are usable.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder()
            // ── Layer 1: compiled-in defaults ───────────────────────
            .set_default("exchange.kind", "coindcx")?
            .set_default("exchange.timeout_ms", 10_000i64)?
            .set_default("exchange.order_timeout_ms", 15_000i64)?
            .set_default("exchange.integer_notional", false)?
            .set_default("exchange.api_key", "")?
            .set_default("exchange.api_secret", "")?
            .set_default("trading.enabled", true)?
            .set_default("trading.amount", "200")?
            .set_default("trading.order_style", "market")?
            .set_default("trading.limit_slippage_bps", 50i64)?
            .set_default("trading.allowed_signals", vec!["BUY"])?
            .set_default("trading.allowed_symbols", vec!["BTCINR"])?
            .set_default("server.port", 8000i64)?;

        // ── Layer 2: TOML file ─────────────────────────────────────
        if let Some(path) = config_path {
            let path_str = path
                .to_str()
                .context("config path is not valid UTF-8")?;
            builder = builder.add_source(File::with_name(path_str).required(true));
        }

        // ── Layer 3: env var overrides (SIGNAL_RELAY_ prefix) ─────
        // The prefix separator must be set explicitly to `_`; the `config`
        // crate otherwise reuses the `__` nesting separator after the prefix.
        builder = builder.add_source(
            Environment::with_prefix("SIGNAL_RELAY")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("trading.allowed_signals")
                .with_list_parse_key("trading.allowed_symbols")
                .try_parsing(true),
        );

        let mut cfg: AppConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        // ── Layer 4: dedicated credential env vars ─────────────────
        let (key_var, secret_var) = cfg.exchange.credential_env_vars();
        if let Ok(v) = std::env::var(key_var) {
            cfg.exchange.api_key = v;
        }
        if let Ok(v) = std::env::var(secret_var) {
            cfg.exchange.api_secret = v;
        }

        // ── Validation ─────────────────────────────────────────────
        cfg.validate()?;

        Ok(cfg)
    }

    /// Validate configuration invariants.
    fn validate(&self) -> Result<()> {
        if self.exchange.api_key.is_empty() || self.exchange.api_secret.is_empty() {
            let (key_var, secret_var) = self.exchange.credential_env_vars();
            bail!(
                "{} API key and secret are required (set {} and {})",
                self.exchange.kind,
                key_var,
                secret_var
            );
        }
        if self.trading.amount <= Decimal::ZERO {
            bail!("trading.amount must be positive, got {}", self.trading.amount);
        }
        if self.trading.order_style == OrderStyle::Limit && !self.exchange.has_market_data() {
            bail!(
                "limit orders on {} need exchange.ticker_url and exchange.markets_url",
                self.exchange.kind
            );
        }
        if self.trading.limit_slippage_bps >= 10_000 {
            bail!(
                "trading.limit_slippage_bps must be below 10000, got {}",
                self.trading.limit_slippage_bps
            );
        }
        Ok(())
    }

    /// Translate an alert ticker into the exchange-native market symbol.
    ///
    /// Lookup is case-insensitive because the `config` crate lowercases keys.
    pub fn exchange_symbol(&self, alert_symbol: &str) -> String {
        self.symbols
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(alert_symbol))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| alert_symbol.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use std::sync::Mutex;

    /// Global mutex to serialize tests that manipulate environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Clear all env vars that could interfere with config loading.
    fn clear_env() {
        std::env::remove_var("SIGNAL_RELAY_TRADING__AMOUNT");
        std::env::remove_var("SIGNAL_RELAY_TRADING__ENABLED");
        std::env::remove_var("SIGNAL_RELAY_EXCHANGE__KIND");
        std::env::remove_var("COINDCX_API_KEY");
        std::env::remove_var("COINDCX_API_SECRET");
        std::env::remove_var("ZEBPAY_API_KEY");
        std::env::remove_var("ZEBPAY_API_SECRET");
    }

    fn set_coindcx_keys() {
        std::env::set_var("COINDCX_API_KEY", "dcx_key");
        std::env::set_var("COINDCX_API_SECRET", "dcx_secret");
    }

    /// Helper: create a temporary TOML config file and return its path.
    fn write_temp_toml(content: &str) -> (tempfile::NamedTempFile, PathBuf) {
        let mut f = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("create temp file");
        write!(f, "{}", content).expect("write temp file");
        let path = f.path().to_path_buf();
        (f, path)
    }

    #[test]
    fn test_load_defaults_with_credentials() {
        let _lock = lock_env();
        clear_env();
        set_coindcx_keys();

        let cfg = AppConfig::load(None).expect("load defaults");
        assert_eq!(cfg.exchange.kind, Exchange::CoinDcx);
        assert_eq!(cfg.exchange.rest_url(), "https://api.coindcx.com");
        assert_eq!(
            cfg.exchange.ticker_url(),
            Some("https://api.coindcx.com/exchange/ticker")
        );
        assert!(cfg.exchange.has_market_data());
        assert_eq!(cfg.exchange.timeout_ms, 10_000);
        assert_eq!(cfg.exchange.order_timeout_ms, 15_000);
        assert!(cfg.trading.enabled);
        assert_eq!(cfg.trading.amount, dec!(200));
        assert_eq!(cfg.trading.order_style, OrderStyle::Market);
        assert_eq!(cfg.trading.allowed_signals, vec!["BUY"]);
        assert_eq!(cfg.trading.allowed_symbols, vec!["BTCINR"]);
        assert_eq!(cfg.server.port, 8000);

        clear_env();
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        let _lock = lock_env();
        clear_env();

        let err = AppConfig::load(None).unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("API key"));
        assert!(msg.contains("COINDCX_API_KEY"));
    }

    #[test]
    fn test_load_zebpay_from_toml() {
        let _lock = lock_env();
        clear_env();
        std::env::set_var("ZEBPAY_API_KEY", "zb_key");
        std::env::set_var("ZEBPAY_API_SECRET", "zb_secret");

        let toml_content = r#"
[exchange]
kind = "zebpay"
key_order = "alphabetical"
ticker_url = "http://127.0.0.1:9000/ticker"
markets_url = "http://127.0.0.1:9000/markets"

[trading]
amount = 500
order_style = "limit"
limit_slippage_bps = 25
allowed_signals = ["BUY", "SELL"]
allowed_symbols = ["BTCINR", "ETHINR"]

[symbols]
BTCINR = "BTC-INR"

[server]
port = 9000
"#;
        let (_f, path) = write_temp_toml(toml_content);
        let cfg = AppConfig::load(Some(path)).expect("load from toml");

        assert_eq!(cfg.exchange.kind, Exchange::ZebPay);
        assert_eq!(cfg.exchange.rest_url(), "https://api.zebpay.com");
        assert_eq!(cfg.exchange.key_order, Some(KeyOrder::Alphabetical));
        assert_eq!(cfg.exchange.ticker_url(), Some("http://127.0.0.1:9000/ticker"));
        assert_eq!(cfg.exchange.api_key, "zb_key");
        assert_eq!(cfg.trading.amount, dec!(500));
        assert_eq!(cfg.trading.order_style, OrderStyle::Limit);
        assert_eq!(cfg.trading.limit_slippage_bps, 25);
        assert_eq!(cfg.trading.allowed_signals, vec!["BUY", "SELL"]);
        assert_eq!(cfg.exchange_symbol("BTCINR"), "BTC-INR");
        assert_eq!(cfg.exchange_symbol("ETHINR"), "ETHINR");
        assert_eq!(cfg.server.port, 9000);

        clear_env();
    }

    #[test]
    fn test_zebpay_has_no_coindcx_listing_defaults() {
        let _lock = lock_env();
        clear_env();
        std::env::set_var("ZEBPAY_API_KEY", "zb_key");
        std::env::set_var("ZEBPAY_API_SECRET", "zb_secret");

        let (_f, path) = write_temp_toml("[exchange]\nkind = \"zebpay\"\n");
        let cfg = AppConfig::load(Some(path)).expect("zebpay market orders need no listings");
        assert_eq!(cfg.exchange.ticker_url(), None);
        assert_eq!(cfg.exchange.markets_url(), None);
        assert!(!cfg.exchange.has_market_data());

        let (_f, path) =
            write_temp_toml("[exchange]\nkind = \"zebpay\"\n\n[trading]\norder_style = \"limit\"\n");
        let err = AppConfig::load(Some(path)).unwrap_err();
        assert!(format!("{}", err).contains("ticker_url"));

        clear_env();
    }

    #[test]
    fn test_env_var_overrides() {
        let _lock = lock_env();
        clear_env();
        set_coindcx_keys();
        std::env::set_var("SIGNAL_RELAY_TRADING__AMOUNT", "350");
        std::env::set_var("SIGNAL_RELAY_TRADING__ENABLED", "false");

        let cfg = AppConfig::load(None).expect("load with env override");
        assert_eq!(cfg.trading.amount, dec!(350));
        assert!(!cfg.trading.enabled);

        clear_env();
    }

    #[test]
    fn test_non_positive_amount_rejected() {
        let _lock = lock_env();
        clear_env();
        set_coindcx_keys();

        let (_f, path) = write_temp_toml("[trading]\namount = 0\n");
        let err = AppConfig::load(Some(path)).unwrap_err();
        assert!(format!("{}", err).contains("amount"));

        clear_env();
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let _lock = lock_env();
        clear_env();
        set_coindcx_keys();

        let cfg = AppConfig::load(None).expect("load defaults");
        let debug = format!("{:?}", cfg);
        assert!(!debug.contains("dcx_secret"));
        assert!(!debug.contains("dcx_key"));

        clear_env();
    }

    #[test]
    fn test_credentials_built_from_config() {
        let _lock = lock_env();
        clear_env();
        set_coindcx_keys();

        let cfg = AppConfig::load(None).expect("load defaults");
        let creds = cfg.exchange.credentials();
        assert_eq!(creds.api_key, "dcx_key");
        assert_eq!(creds.api_secret.expose(), b"dcx_secret");

        clear_env();
    }
}
