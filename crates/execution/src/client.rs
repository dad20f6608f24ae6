//! HTTP submission of signed orders.
//!
//! [`ExchangeClient::submit`] never fails: transport problems and unreadable
//! bodies are folded into an [`ExchangeResult`] with a distinguished status so
//! the caller always gets a `(status, body)` pair back.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::request::SignedRequest;

/// Default timeout for order submission.
pub const DEFAULT_ORDER_TIMEOUT: Duration = Duration::from_secs(15);

/// Status reported when the exchange did not answer in time.
pub const STATUS_TIMEOUT: u16 = 408;
/// Status reported when no connection could be made.
pub const STATUS_CONNECT_FAILED: u16 = 503;
/// Status reported for any other local failure.
pub const STATUS_INTERNAL: u16 = 500;

/// Error text used when a response body is not JSON.
pub const INVALID_RESPONSE: &str = "Invalid response";

/// Response body, parsed when possible.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultBody {
    /// The body was valid JSON.
    Structured(Value),
    /// The body could not be parsed; the text is kept as received.
    Raw { error: String, raw: String },
}

/// Where an [`ExchangeResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Exchange,
    Transport,
    PreSubmit,
}

/// Terminal state of one order attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 2xx with a body that does not signal an error.
    Succeeded,
    /// The exchange answered, but with an error status or error body.
    RejectedByExchange,
    /// The request never got a response.
    TransportFailed,
    /// The pipeline stopped before sending anything.
    PreSubmitFailed,
}

/// Normalized `(status, body)` of an order attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeResult {
    pub http_status: u16,
    pub body: ResultBody,
    origin: Origin,
}

impl ExchangeResult {
    /// A response received from the exchange.
    pub fn from_response(http_status: u16, text: String) -> Self {
        let body = match serde_json::from_str::<Value>(&text) {
            Ok(value) => ResultBody::Structured(value),
            Err(_) => ResultBody::Raw {
                error: INVALID_RESPONSE.to_string(),
                raw: text,
            },
        };
        Self {
            http_status,
            body,
            origin: Origin::Exchange,
        }
    }

    /// A synthetic result for a request that got no response.
    pub fn transport_failure(http_status: u16, message: impl Into<String>) -> Self {
        Self {
            http_status,
            body: ResultBody::Structured(json!({ "error": message.into() })),
            origin: Origin::Transport,
        }
    }

    /// A synthetic result for an order abandoned before submission.
    pub fn pre_submit_failure(http_status: u16, kind: &str, message: impl Into<String>) -> Self {
        Self {
            http_status,
            body: ResultBody::Structured(json!({ "error": kind, "message": message.into() })),
            origin: Origin::PreSubmit,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self.origin {
            Origin::Transport => Outcome::TransportFailed,
            Origin::PreSubmit => Outcome::PreSubmitFailed,
            Origin::Exchange => {
                if (200..300).contains(&self.http_status) && !self.body_signals_error() {
                    Outcome::Succeeded
                } else {
                    Outcome::RejectedByExchange
                }
            }
        }
    }

    /// The body as JSON; raw bodies become `{"error": ..., "raw": ...}`.
    pub fn to_json(&self) -> Value {
        match &self.body {
            ResultBody::Structured(value) => value.clone(),
            ResultBody::Raw { error, raw } => json!({ "error": error, "raw": raw }),
        }
    }

    /// Some exchanges answer 200 with an error object.
    fn body_signals_error(&self) -> bool {
        match &self.body {
            ResultBody::Raw { .. } => true,
            ResultBody::Structured(Value::Object(map)) => {
                map.contains_key("error")
                    || map
                        .get("status")
                        .and_then(Value::as_str)
                        .is_some_and(|s| s.eq_ignore_ascii_case("error"))
            }
            ResultBody::Structured(_) => false,
        }
    }
}

/// Sends signed requests to the exchange's REST API.
pub struct ExchangeClient {
    base_url: String,
    client: Client,
}

impl ExchangeClient {
    /// Create a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Transmit `request` once and normalize whatever comes back.
    pub async fn submit(&self, request: &SignedRequest) -> ExchangeResult {
        let mut builder = self
            .client
            .post(&request.url)
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        debug!(
            path = request.path,
            payload_len = request.payload.len(),
            "submitting order"
        );

        let resp = match builder
            .body(request.payload.as_str().to_owned())
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return transport_error(&e),
        };

        let status = resp.status().as_u16();
        match resp.text().await {
            Ok(text) => ExchangeResult::from_response(status, text),
            Err(e) => transport_error(&e),
        }
    }
}

fn transport_error(e: &reqwest::Error) -> ExchangeResult {
    let status = if e.is_timeout() {
        STATUS_TIMEOUT
    } else if e.is_connect() {
        STATUS_CONNECT_FAILED
    } else {
        STATUS_INTERNAL
    };
    warn!(status, error = %e, "order request failed before a response was read");
    ExchangeResult::transport_failure(status, e.to_string())
}
