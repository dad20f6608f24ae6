//! Tracing initialization for the signal relay.
//!
//! [`init_tracing`] installs a global subscriber in one of two modes:
//! - **JSON mode** (`json = true`): one JSON object per line with nanosecond
//!   UTC timestamps, for log shipping.
//! - **Pretty mode** (`json = false`): human-readable output for local runs.
//!
//! Both modes honour `RUST_LOG` (e.g., `RUST_LOG=sr_execution=debug`).
//!
//! A [`SecretSanitizer`] layer watches every span and event. If a field is
//! named like a credential, or its value contains one of the process's known
//! secrets, it emits a warning so the offending call site can be fixed. The
//! execution crate never records the API secret, the API key, or the request
//! signature as a field; this layer is the backstop.

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::span;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::types::ApiSecret;

/// Initialize the global tracing subscriber.
///
/// Returns an error if a global subscriber has already been installed.
///
/// # Examples
///
/// ```
/// use sr_core::logging::{init_tracing, SecretSanitizer};
///
/// let _ = init_tracing(false, SecretSanitizer::default());
/// ```
pub fn init_tracing(json: bool, sanitizer: SecretSanitizer) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sanitizer);

    if json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_timer(NanosecondTimer)
            .with_target(true)
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE);

        registry.with(json_layer).try_init()?;
    } else {
        let pretty_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::CLOSE);

        registry.with(pretty_layer).try_init()?;
    }
    Ok(())
}

/// Emits RFC 3339 timestamps with nanosecond precision.
#[derive(Debug, Clone)]
struct NanosecondTimer;

impl tracing_subscriber::fmt::time::FormatTime for NanosecondTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let now = chrono::Utc::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.9fZ"))
    }
}

/// Field names that always indicate credential material.
const SENSITIVE_FIELD_NAMES: &[&str] = &[
    "api_key",
    "api_secret",
    "secret",
    "signature",
    "password",
    "token",
];

/// A tracing layer that flags fields carrying credential material.
///
/// Construct it with the secrets the process holds via
/// [`SecretSanitizer::with_secrets`]; any recorded string containing one of
/// them is flagged regardless of field name.
#[derive(Clone, Default)]
pub struct SecretSanitizer {
    known: Vec<String>,
}

impl SecretSanitizer {
    /// Watch for the given secrets appearing verbatim in log fields.
    ///
    /// Secrets that are not valid UTF-8 can never appear in a `&str` field
    /// and are skipped.
    pub fn with_secrets<'a>(secrets: impl IntoIterator<Item = &'a ApiSecret>) -> Self {
        let known = secrets
            .into_iter()
            .filter(|s| !s.is_empty())
            .filter_map(|s| std::str::from_utf8(s.expose()).ok().map(str::to_owned))
            .collect();
        Self { known }
    }

    fn inspect(&self, record: impl FnOnce(&mut SecretCheckVisitor<'_>)) -> bool {
        let mut visitor = SecretCheckVisitor {
            known: &self.known,
            found_secret: false,
        };
        record(&mut visitor);
        visitor.found_secret
    }
}

impl fmt::Debug for SecretSanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretSanitizer")
            .field("known_secrets", &self.known.len())
            .finish()
    }
}

impl<S> Layer<S> for SecretSanitizer
where
    S: tracing::Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_new_span(
        &self,
        attrs: &span::Attributes<'_>,
        _id: &span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if self.inspect(|v| attrs.record(v)) {
            tracing::warn!(
                span = attrs.metadata().name(),
                "credential-like field recorded on span; remove it from the call site"
            );
        }
    }

    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if self.inspect(|v| event.record(v)) {
            tracing::warn!(
                origin = event.metadata().target(),
                "credential-like field recorded on event; remove it from the call site"
            );
        }
    }
}

/// Visitor that checks field names and values for credential material.
struct SecretCheckVisitor<'a> {
    known: &'a [String],
    found_secret: bool,
}

impl SecretCheckVisitor<'_> {
    fn contains_known_secret(&self, value: &str) -> bool {
        self.known.iter().any(|s| value.contains(s.as_str()))
    }
}

impl Visit for SecretCheckVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if SENSITIVE_FIELD_NAMES.contains(&field.name()) {
            self.found_secret = true;
        } else if !self.known.is_empty() && self.contains_known_secret(&format!("{:?}", value)) {
            self.found_secret = true;
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if SENSITIVE_FIELD_NAMES.contains(&field.name()) || self.contains_known_secret(value) {
            self.found_secret = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_secrets_skips_empty() {
        let a = ApiSecret::new("abc123secret");
        let empty = ApiSecret::new("");
        let sanitizer = SecretSanitizer::with_secrets([&a, &empty]);
        assert_eq!(sanitizer.known, vec!["abc123secret".to_string()]);
    }

    #[test]
    fn test_contains_known_secret() {
        let known = vec!["abc123secret".to_string()];
        let visitor = SecretCheckVisitor {
            known: &known,
            found_secret: false,
        };
        assert!(visitor.contains_known_secret("payload signed with abc123secret"));
        assert!(!visitor.contains_known_secret("order submitted for BTCINR"));
    }

    #[test]
    fn test_sensitive_field_names() {
        assert!(SENSITIVE_FIELD_NAMES.contains(&"api_key"));
        assert!(SENSITIVE_FIELD_NAMES.contains(&"api_secret"));
        assert!(SENSITIVE_FIELD_NAMES.contains(&"signature"));
        assert!(!SENSITIVE_FIELD_NAMES.contains(&"market"));
    }

    #[test]
    fn test_debug_does_not_print_secrets() {
        let a = ApiSecret::new("abc123secret");
        let sanitizer = SecretSanitizer::with_secrets([&a]);
        let debug = format!("{:?}", sanitizer);
        assert!(!debug.contains("abc123secret"));
        assert!(debug.contains("known_secrets: 1"));
    }
}
