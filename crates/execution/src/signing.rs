//! HMAC-SHA256 request signing.
//!
//! Uses the `ring` crate for constant-time HMAC computation. The secret is
//! borrowed from an [`ApiSecret`] for the duration of one call and is never
//! logged or included in error messages.

use ring::hmac;
use sr_core::types::{ApiSecret, Timestamp};

use crate::payload::CanonicalPayload;

/// What bytes an exchange expects the signature to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    /// The canonical payload bytes, as transmitted.
    Payload,
    /// `timestamp + method + path + payload`, concatenated without separators.
    TimestampMethodPathBody,
}

/// Assemble the exact bytes to sign under `scheme`.
pub fn signing_string(
    scheme: SigningScheme,
    timestamp: Timestamp,
    method: &str,
    path: &str,
    payload: &CanonicalPayload,
) -> Vec<u8> {
    match scheme {
        SigningScheme::Payload => payload.as_bytes().to_vec(),
        SigningScheme::TimestampMethodPathBody => {
            let mut buf = Vec::with_capacity(32 + path.len() + payload.len());
            buf.extend_from_slice(timestamp.to_string().as_bytes());
            buf.extend_from_slice(method.as_bytes());
            buf.extend_from_slice(path.as_bytes());
            buf.extend_from_slice(payload.as_bytes());
            buf
        }
    }
}

/// `HMAC-SHA256(secret, message)`, lower-case hex encoded.
pub fn sign(secret: &ApiSecret, message: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.expose());
    let tag = hmac::sign(&key, message);
    hex::encode(tag.as_ref())
}
