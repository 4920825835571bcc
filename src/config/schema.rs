//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the channel proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream realtime service settings.
    pub upstream: UpstreamConfig,

    /// Reconnect backoff for upstream connections.
    pub backoff: BackoffConfig,

    /// Downstream channel endpoint settings.
    pub channels: ChannelsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
        }
    }
}

/// Upstream realtime service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the realtime service (http:// or https://).
    pub realtime_url: String,

    /// Static credential attached to every upstream connection attempt.
    pub api_key: String,

    /// Header carrying the credential.
    pub api_key_header: String,

    /// Upper bound on a single connect attempt, in seconds.
    pub connect_timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            realtime_url: "http://localhost:3002".to_string(),
            api_key: String::new(),
            api_key_header: "X-API-Key".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

/// Reconnect backoff configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the first reconnect, in milliseconds.
    pub initial_ms: u64,

    /// Growth factor applied after every failure.
    pub factor: u32,

    /// Ceiling for the delay, in milliseconds.
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 1_000,
            factor: 2,
            max_ms: 30_000,
        }
    }
}

/// Downstream channel endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChannelsConfig {
    /// Path prefix in front of the channel segment (no trailing slash).
    pub path_prefix: String,

    /// Interval between pings sent to browser clients. 0 disables.
    pub keepalive_secs: u64,
}

impl ChannelsConfig {
    pub fn keepalive(&self) -> Option<Duration> {
        (self.keepalive_secs > 0).then(|| Duration::from_secs(self.keepalive_secs))
    }
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            path_prefix: "/v1/ws".to_string(),
            keepalive_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoints configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Expose `/admin/*` on the main listener.
    pub enabled: bool,

    /// Bearer token required by admin endpoints. Must be set when enabled.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [upstream]
            realtime_url = "https://rt.example.com"
            api_key = "k"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.realtime_url, "https://rt.example.com");
        assert_eq!(config.upstream.api_key_header, "X-API-Key");
        assert_eq!(config.backoff.initial_ms, 1_000);
        assert_eq!(config.backoff.factor, 2);
        assert_eq!(config.backoff.max_ms, 30_000);
        assert_eq!(config.channels.path_prefix, "/v1/ws");
        assert_eq!(config.listener.bind_address, "0.0.0.0:4000");
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_keepalive_zero_disables() {
        let mut channels = ChannelsConfig::default();
        assert_eq!(channels.keepalive(), Some(Duration::from_secs(30)));
        channels.keepalive_secs = 0;
        assert_eq!(channels.keepalive(), None);
    }

    #[test]
    fn test_log_format_lowercase() {
        let obs: ObservabilityConfig = toml::from_str(r#"log_format = "json""#).unwrap();
        assert_eq!(obs.log_format, LogFormat::Json);
    }
}
