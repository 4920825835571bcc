//! Channel lookup for upgrade requests.
//!
//! # Responsibilities
//! - Match the request path against `<prefix>/<channel>`
//! - Map the channel segment onto the known channel set
//! - Return the channel or an explicit rejection
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - No regex; the segment is checked by hand
//! - Explicit rejection rather than silent default

use crate::routing::channel::Channel;

/// Why an upgrade path was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteRejection {
    #[error("path does not match {prefix}/<channel>")]
    NoMatch { prefix: String },
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
}

/// Resolves upgrade request paths to channels.
#[derive(Debug, Clone)]
pub struct ChannelRouter {
    prefix: String,
}

impl ChannelRouter {
    /// Create a router for paths under `prefix` (e.g. `/v1/ws`).
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    /// Route pattern for axum (`<prefix>/{channel}`).
    pub fn route_pattern(&self) -> String {
        format!("{}/{{channel}}", self.prefix)
    }

    /// Resolve a request path (no query string) to a channel.
    pub fn resolve(&self, path: &str) -> Result<Channel, RouteRejection> {
        let segment = path
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|segment| is_word(segment))
            .ok_or_else(|| RouteRejection::NoMatch {
                prefix: self.prefix.clone(),
            })?;

        segment
            .parse()
            .map_err(|_| RouteRejection::UnknownChannel(segment.to_string()))
    }
}

fn is_word(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
