//! The closed set of proxied channels.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// An upstream topic multiplexed over the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Logs,
    Alerts,
    Metrics,
    Security,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Logs,
        Channel::Alerts,
        Channel::Metrics,
        Channel::Security,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Logs => "logs",
            Channel::Alerts => "alerts",
            Channel::Metrics => "metrics",
            Channel::Security => "security",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a name is not one of [`Channel::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel '{0}'")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}
