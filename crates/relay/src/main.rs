//! Signal relay binary.
//!
//! Loads configuration, initializes tracing, builds the order pipeline for the
//! configured exchange, and serves the webhook endpoint until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use sr_core::config::AppConfig;
use sr_core::logging::{init_tracing, SecretSanitizer};
use sr_execution::{ExchangeClient, ExchangeProfile, OrderPipeline};
use sr_market_data::{MarketDataFetcher, RestMarketData, UnconfiguredMarketData};
use sr_relay::{run_server, RelayState, TradingRules};

/// Trade-signal webhook relay
#[derive(Parser, Debug)]
#[command(name = "sr-relay", about = "Relay chart alerts to an exchange as signed orders")]
struct Args {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit JSON log lines instead of pretty output.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config).context("failed to load configuration")?;

    let credentials = config.exchange.credentials();
    init_tracing(
        args.json_logs,
        SecretSanitizer::with_secrets([&credentials.api_secret]),
    )?;

    let mut profile = ExchangeProfile::for_exchange(config.exchange.kind)
        .with_integer_notional(config.exchange.integer_notional);
    if let Some(key_order) = config.exchange.key_order {
        profile = profile.with_key_order(key_order);
    }

    let fetcher: Arc<dyn MarketDataFetcher> =
        match (config.exchange.ticker_url(), config.exchange.markets_url()) {
            (Some(ticker_url), Some(markets_url)) => Arc::new(
                RestMarketData::new(
                    ticker_url,
                    markets_url,
                    Duration::from_millis(config.exchange.timeout_ms),
                )
                .context("failed to build market data client")?,
            ),
            _ => {
                tracing::warn!(
                    exchange = %config.exchange.kind,
                    "no market data listings configured; only notional-sized market orders can be placed"
                );
                Arc::new(UnconfiguredMarketData)
            }
        };
    let client = ExchangeClient::new(
        config.exchange.rest_url(),
        Duration::from_millis(config.exchange.order_timeout_ms),
    )
    .context("failed to build exchange client")?;

    tracing::info!(
        exchange = %config.exchange.kind,
        enabled = config.trading.enabled,
        amount = %config.trading.amount,
        order_style = ?config.trading.order_style,
        allowed_signals = ?config.trading.allowed_signals,
        allowed_symbols = ?config.trading.allowed_symbols,
        "starting sr-relay"
    );

    let state = Arc::new(RelayState {
        pipeline: OrderPipeline::new(profile, credentials, fetcher, client),
        rules: TradingRules::from_config(&config),
    });

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
        }
        shutdown.cancel();
    });

    run_server(state, config.server.port, cancel).await
}
