//! Webhook HTTP server.
//!
//! `POST /webhook` turns an accepted alert into one order; `GET /` is a
//! liveness probe. Ignored alerts are acknowledged with `200` so the alerting
//! platform does not retry them.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use sr_core::config::OrderStyle;
use sr_execution::OrderPipeline;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::signal::{TradingRules, WebhookPayload};

/// State shared by all handlers. Read-only after startup.
pub struct RelayState {
    pub pipeline: OrderPipeline,
    pub rules: TradingRules,
}

#[derive(Debug, Serialize)]
struct OrderPlacedResponse {
    status: &'static str,
    signal: String,
    exchange_symbol: String,
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
    exchange_status: u16,
    exchange_response: Value,
}

fn ignored(reason: impl ToString) -> Json<Value> {
    Json(json!({ "status": "ignored", "reason": reason.to_string() }))
}

/// `GET /`
async fn health() -> Json<Value> {
    Json(json!({ "status": "alive" }))
}

/// `POST /webhook`
async fn webhook(State(state): State<Arc<RelayState>>, body: Bytes) -> Response {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "unparseable webhook body");
            return ignored("invalid payload").into_response();
        }
    };
    info!(signal = ?payload.signal, symbol = ?payload.symbol, "alert received");

    let accepted = match state.rules.evaluate(&payload) {
        Ok(a) => a,
        Err(reason) => {
            info!(%reason, "alert ignored");
            return ignored(reason).into_response();
        }
    };

    let result = match state.rules.order_style {
        OrderStyle::Market => {
            state
                .pipeline
                .place_order(&accepted.exchange_symbol, accepted.side, accepted.amount)
                .await
        }
        OrderStyle::Limit => {
            state
                .pipeline
                .place_limit_like_order(
                    &accepted.exchange_symbol,
                    accepted.side,
                    accepted.amount,
                    state.rules.limit_slippage_bps,
                )
                .await
        }
    };

    let resp = OrderPlacedResponse {
        status: "ok",
        signal: accepted.side.to_string(),
        exchange_symbol: accepted.exchange_symbol,
        amount: accepted.amount,
        exchange_status: result.http_status,
        exchange_response: result.to_json(),
    };
    Json(resp).into_response()
}

/// Routes for the relay.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhook", post(webhook))
        .with_state(state)
}

/// Serve on `0.0.0.0:port` until `cancel` fires.
pub async fn run_server(
    state: Arc<RelayState>,
    port: u16,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    Ok(())
}
