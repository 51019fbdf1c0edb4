//! Tracing backend configuration.

use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default address of the trace agent's OTLP/HTTP receiver.
pub const DEFAULT_ADDRESS: &str = "localhost:4318";

/// Default service name attached to exported spans.
pub const DEFAULT_SERVICE_NAME: &str = "buildkite-agent";

/// Default upper bound for a single export call.
pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

const OTLP_TRACES_PATH: &str = "/v1/traces";

/// Which tracer backend to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TracingBackend {
    /// No-op tracer (default).
    #[default]
    None,
    /// Datadog agent, reached through its OTLP receiver.
    Datadog,
}

impl TracingBackend {
    /// Parse a backend name. Unknown names yield `None`.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Some(TracingBackend::None),
            "datadog" => Some(TracingBackend::Datadog),
            _ => None,
        }
    }

    /// Parse a backend name, degrading unknown names to the no-op backend.
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse_str(s).unwrap_or_else(|| {
            tracing::warn!(backend = %s, "unknown tracing backend, tracing disabled");
            TracingBackend::None
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TracingBackend::None => "none",
            TracingBackend::Datadog => "datadog",
        }
    }
}

impl std::fmt::Display for TracingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for TracingBackend {
    fn from(s: String) -> Self {
        Self::parse_lenient(&s)
    }
}

impl From<TracingBackend> for String {
    fn from(b: TracingBackend) -> Self {
        b.as_str().to_string()
    }
}

/// Tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Backend selector.
    pub backend: TracingBackend,

    /// Backend address, `host:port` or a full URL.
    pub address: String,

    /// Service name reported with every span.
    pub service_name: String,

    /// Upper bound for one export call, in milliseconds.
    pub export_timeout_ms: u64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            backend: TracingBackend::None,
            address: DEFAULT_ADDRESS.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            export_timeout_ms: millis(DEFAULT_EXPORT_TIMEOUT),
        }
    }
}

impl TracingConfig {
    /// Configuration for the Datadog backend at the given address.
    pub fn datadog(address: impl Into<String>) -> Self {
        Self {
            backend: TracingBackend::Datadog,
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_export_timeout(mut self, timeout: Duration) -> Self {
        self.export_timeout_ms = millis(timeout);
        self
    }

    pub fn export_timeout(&self) -> Duration {
        Duration::from_millis(self.export_timeout_ms)
    }

    /// Full OTLP/HTTP traces endpoint derived from `address`.
    pub fn otlp_endpoint(&self) -> Result<String> {
        let address = self.address.trim().trim_end_matches('/');
        if address.is_empty() || address.chars().any(char::is_whitespace) {
            return Err(TraceError::InvalidAddress(self.address.clone()));
        }

        let base = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        if base.ends_with(OTLP_TRACES_PATH) {
            Ok(base)
        } else {
            Ok(format!("{}{}", base, OTLP_TRACES_PATH))
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_timeout_saturates() {
        let config = TracingConfig::default().with_export_timeout(Duration::MAX);
        assert_eq!(config.export_timeout_ms, u64::MAX);
        assert_eq!(config.export_timeout(), Duration::from_millis(u64::MAX));

        let config = TracingConfig::default().with_export_timeout(Duration::from_micros(2_500));
        assert_eq!(config.export_timeout_ms, 2);
        assert_eq!(TracingConfig::default().export_timeout(), DEFAULT_EXPORT_TIMEOUT);
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!(TracingBackend::parse_str("datadog"), Some(TracingBackend::Datadog));
        assert_eq!(TracingBackend::parse_str("DataDog"), Some(TracingBackend::Datadog));
        assert_eq!(TracingBackend::parse_str(""), Some(TracingBackend::None));
        assert_eq!(TracingBackend::parse_str("none"), Some(TracingBackend::None));
        assert_eq!(TracingBackend::parse_str("zipkin"), None);
    }

    #[test]
    fn test_unknown_backend_degrades() {
        assert_eq!(TracingBackend::parse_lenient("zipkin"), TracingBackend::None);
        let config: TracingConfig = serde_json::from_str(r#"{"backend":"jaeger"}"#).unwrap();
        assert_eq!(config.backend, TracingBackend::None);
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = TracingConfig::datadog("agent:4318").with_service_name("ci");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains(r#""backend":"datadog""#));
        let parsed: TracingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_defaults() {
        let config = TracingConfig::default();
        assert_eq!(config.backend, TracingBackend::None);
        assert_eq!(config.address, DEFAULT_ADDRESS);
        assert_eq!(config.export_timeout(), DEFAULT_EXPORT_TIMEOUT);
    }

    #[test]
    fn test_otlp_endpoint() {
        let endpoint = |addr: &str| TracingConfig::datadog(addr).otlp_endpoint().unwrap();
        assert_eq!(endpoint("localhost:4318"), "http://localhost:4318/v1/traces");
        assert_eq!(endpoint("https://otel.example.com/"), "https://otel.example.com/v1/traces");
        assert_eq!(endpoint("http://dd:4318/v1/traces"), "http://dd:4318/v1/traces");
    }

    #[test]
    fn test_otlp_endpoint_rejects_garbage() {
        assert!(TracingConfig::datadog("").otlp_endpoint().is_err());
        assert!(TracingConfig::datadog("   ").otlp_endpoint().is_err());
        assert!(TracingConfig::datadog("bad host:1").otlp_endpoint().is_err());
    }
}
