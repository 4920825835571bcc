//! Configuration loading from disk and environment.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid value for {key}: '{value}'")]
    Env { key: &'static str, value: String },
    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides, then validate.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay deployment environment variables onto a parsed configuration.
///
/// - `PORT` replaces the port of `listener.bind_address`
/// - `LIGHTWATCH_REALTIME_URL` replaces `upstream.realtime_url`
/// - `LIGHTWATCH_API_KEY` replaces `upstream.api_key`
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let port: u16 = port.parse().map_err(|_| ConfigError::Env {
            key: "PORT",
            value: port.clone(),
        })?;
        let host = config
            .listener
            .bind_address
            .parse::<SocketAddr>()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|_| "0.0.0.0".to_string());
        config.listener.bind_address = SocketAddr::new(
            host.parse().map_err(|_| ConfigError::Env {
                key: "PORT",
                value: port.to_string(),
            })?,
            port,
        )
        .to_string();
    }

    if let Some(url) = lookup("LIGHTWATCH_REALTIME_URL") {
        config.upstream.realtime_url = url;
    }

    if let Some(key) = lookup("LIGHTWATCH_API_KEY") {
        config.upstream.api_key = key;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ProxyConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PORT", "5050"),
                ("LIGHTWATCH_REALTIME_URL", "https://rt.internal"),
                ("LIGHTWATCH_API_KEY", "secret"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:5050");
        assert_eq!(config.upstream.realtime_url, "https://rt.internal");
        assert_eq!(config.upstream.api_key, "secret");
    }

    #[test]
    fn test_port_keeps_host() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "127.0.0.1:4000".into();
        apply_env_overrides(&mut config, env(&[("PORT", "4100")])).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:4100");
    }

    #[test]
    fn test_bad_port() {
        let mut config = ProxyConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "PORT", .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
