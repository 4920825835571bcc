//! Metrics collection and exposition.
//!
//! # Metrics
//! - `channel_proxy_active_bindings` (gauge): live bindings by channel
//! - `channel_proxy_upgrades_rejected_total` (counter): refused upgrade paths
//! - `channel_proxy_upstream_connects_total` (counter): attempts by outcome
//! - `channel_proxy_upstream_reconnects_scheduled_total` (counter)
//! - `channel_proxy_messages_forwarded_total` (counter): by direction
//! - `channel_proxy_messages_dropped_total` (counter): by direction
//!
//! # Design Decisions
//! - Labels are static strings (channel, direction, outcome)
//! - Without an installed recorder every call is a no-op

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::routing::Channel;

/// Which way a frame was travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Browser → upstream.
    Upstream,
    /// Upstream → browser.
    Downstream,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Upstream => "upstream",
            Direction::Downstream => "downstream",
        }
    }
}

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_binding_opened(channel: Channel) {
    gauge!("channel_proxy_active_bindings", "channel" => channel.as_str()).increment(1.0);
}

pub fn record_binding_closed(channel: Channel) {
    gauge!("channel_proxy_active_bindings", "channel" => channel.as_str()).decrement(1.0);
}

pub fn record_upgrade_rejected() {
    counter!("channel_proxy_upgrades_rejected_total").increment(1);
}

pub fn record_upstream_connect(channel: Channel, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    counter!(
        "channel_proxy_upstream_connects_total",
        "channel" => channel.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_reconnect_scheduled(channel: Channel) {
    counter!(
        "channel_proxy_upstream_reconnects_scheduled_total",
        "channel" => channel.as_str()
    )
    .increment(1);
}

pub fn record_forwarded(channel: Channel, direction: Direction) {
    counter!(
        "channel_proxy_messages_forwarded_total",
        "channel" => channel.as_str(),
        "direction" => direction.as_str()
    )
    .increment(1);
}

pub fn record_dropped(channel: Channel, direction: Direction) {
    counter!(
        "channel_proxy_messages_dropped_total",
        "channel" => channel.as_str(),
        "direction" => direction.as_str()
    )
    .increment(1);
}
