//! Signed order requests.

use std::fmt;

use sr_core::types::{Credentials, OrderRequest, Timestamp};

use crate::exchange::ExchangeProfile;
use crate::payload::{CanonicalPayload, PayloadBuilder, PayloadError};
use crate::signing::{sign, signing_string};

/// HTTP method used for order creation on every supported exchange.
pub const ORDER_METHOD: &str = "POST";

/// A fully signed order, ready for [`ExchangeClient::submit`].
///
/// Built and discarded per call. The `Debug` output omits the API key and the
/// signature.
///
/// [`ExchangeClient::submit`]: crate::client::ExchangeClient::submit
#[derive(Clone)]
pub struct SignedRequest {
    pub url: String,
    pub method: &'static str,
    pub path: &'static str,
    pub payload: CanonicalPayload,
    pub signature: String,
    /// Authentication headers, in insertion order.
    pub headers: Vec<(&'static str, String)>,
    pub timestamp: Timestamp,
}

impl SignedRequest {
    /// Render, sign, and address `request` for the profile's order endpoint.
    pub fn build(
        profile: &ExchangeProfile,
        credentials: &Credentials,
        base_url: &str,
        request: &OrderRequest,
    ) -> Result<Self, PayloadError> {
        let payload = PayloadBuilder::new(profile).build(request)?;
        let timestamp = request.timestamp();
        let message = signing_string(
            profile.signing,
            timestamp,
            ORDER_METHOD,
            profile.order_path,
            &payload,
        );
        let signature = sign(&credentials.api_secret, &message);

        let mut headers = vec![(profile.headers.api_key, credentials.api_key.clone())];
        if let Some(name) = profile.headers.timestamp {
            headers.push((name, timestamp.to_string()));
        }
        headers.push((profile.headers.signature, signature.clone()));

        Ok(Self {
            url: format!("{}{}", base_url.trim_end_matches('/'), profile.order_path),
            method: ORDER_METHOD,
            path: profile.order_path,
            payload,
            signature,
            headers,
            timestamp,
        })
    }
}

impl fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| *name).collect();
        f.debug_struct("SignedRequest")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("payload_len", &self.payload.len())
            .field("headers", &header_names)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}
