use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default User-Agent string for outgoing requests
pub const DEFAULT_USER_AGENT: &str = concat!("courier-http/", env!("CARGO_PKG_VERSION"));

/// Transport security configuration
///
/// Controls whether the transport enforces TLS or allows insecure HTTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only) - default and recommended
    #[default]
    TlsOnly,
    /// Allow insecure HTTP connections
    ///
    /// **WARNING**: meant for local mock servers and development backends.
    AllowInsecureHttp,
}

/// Configuration of [`HyperTransport`](crate::HyperTransport)
///
/// Durations are written in humantime form (`"30s"`, `"1m 30s"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HttpTransportConfig {
    /// Per-request timeout (default: 30 seconds)
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Maximum response body size in bytes, after decompression (default: 10 MB)
    pub max_body_size: usize,

    /// User-Agent header value, unless a request sets its own
    pub user_agent: String,

    /// Transport security mode (default: `TlsOnly`)
    pub transport_security: TransportSecurity,

    /// Concurrency cap; requests over the cap fail fast with `Overloaded`
    pub max_concurrent_requests: Option<usize>,

    /// Buffer capacity for concurrent request handling (default: 1024)
    pub buffer_capacity: usize,

    /// Idle timeout for pooled connections (default: 90 seconds, `None` keeps them forever)
    #[serde(with = "humantime_serde::option")]
    pub pool_idle_timeout: Option<Duration>,

    /// Maximum idle connections kept per host (default: 32)
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport_security: TransportSecurity::TlsOnly,
            max_concurrent_requests: None,
            buffer_capacity: 1024,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpTransportConfig {
    /// Configuration for tests against local mock servers: plain HTTP allowed,
    /// short timeout, small pool.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024,
            transport_security: TransportSecurity::AllowInsecureHttp,
            pool_idle_timeout: Some(Duration::from_secs(5)),
            pool_max_idle_per_host: 4,
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_size, 10 * 1024 * 1024);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.transport_security, TransportSecurity::TlsOnly);
        assert!(config.max_concurrent_requests.is_none());
    }

    #[test]
    fn test_for_testing_allows_http() {
        let config = HttpTransportConfig::for_testing();
        assert_eq!(
            config.transport_security,
            TransportSecurity::AllowInsecureHttp
        );
    }

    #[test]
    fn test_deserialize_humantime_durations() {
        let config: HttpTransportConfig = serde_json::from_value(serde_json::json!({
            "request_timeout": "5s",
            "pool_idle_timeout": "2m",
            "transport_security": "allow_insecure_http",
            "max_concurrent_requests": 8
        }))
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.pool_idle_timeout, Some(Duration::from_secs(120)));
        assert_eq!(
            config.transport_security,
            TransportSecurity::AllowInsecureHttp
        );
        assert_eq!(config.max_concurrent_requests, Some(8));
        assert_eq!(config.buffer_capacity, 1024);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<HttpTransportConfig, _> =
            serde_json::from_value(serde_json::json!({ "retries": 3 }));
        assert!(result.is_err());
    }
}
