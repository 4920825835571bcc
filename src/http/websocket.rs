//! Client session binding.
//!
//! # Responsibilities
//! - Pair one upgraded downstream socket with one upstream supervisor
//! - Forward data frames in both directions
//! - Terminate the supervisor on every downstream exit path
//!
//! # Data Flow
//! ```text
//! Browser ←──── WebSocket frames ────→ Binding ←── mpsc ──→ Supervisor ←──→ Upstream
//! ```
//!
//! # Design Decisions
//! - The downstream socket's lifetime bounds the supervisor's
//! - Frame-level forwarding (no message buffering across reconnects)
//! - Close frames and pings are per hop, never relayed

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{close_code, CloseFrame, Message, Utf8Bytes, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::config::ProxyConfig;
use crate::net::ConnectionGuard;
use crate::resilience::Backoff;
use crate::upstream::{Frame, Supervisor, UpstreamConnector};

/// How long teardown waits for the supervisor to report Terminated.
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-binding settings shared by every binding of a server.
#[derive(Debug, Clone, Copy)]
pub struct BindingSettings {
    pub backoff: Backoff,
    pub keepalive: Option<Duration>,
}

impl BindingSettings {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            backoff: Backoff::from(config.backoff),
            keepalive: config.channels.keepalive(),
        }
    }
}

/// Extract the data frame from a downstream message, if it carries one.
pub fn frame_from_downstream(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Binary(data) => Some(Frame::Binary(data.to_vec())),
        Message::Ping(_) | Message::Pong(_) | Message::Close(_) => None,
    }
}

pub fn frame_to_downstream(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(data.into()),
    }
}

/// Run one binding until the downstream connection ends or the registry
/// asks it to close.
pub async fn run_binding<C: UpstreamConnector>(
    socket: WebSocket,
    guard: ConnectionGuard,
    connector: Arc<C>,
    settings: BindingSettings,
) {
    let channel = guard.channel();
    let close = guard.close_requested();

    let (upstream_tx, mut from_upstream) = mpsc::unbounded_channel();
    let supervisor = Supervisor::connect(channel, connector, settings.backoff, upstream_tx);

    let (mut sink, mut stream) = socket.split();
    let mut keepalive = settings.keepalive.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    tracing::info!("Downstream connected");

    let reason = loop {
        tokio::select! {
            biased;
            _ = close.cancelled() => {
                let frame = CloseFrame {
                    code: close_code::AWAY,
                    reason: Utf8Bytes::from_static("server shutting down"),
                };
                let _ = sink.send(Message::Close(Some(frame))).await;
                break "shutdown";
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break "downstream closed",
                Some(Ok(message)) => {
                    if let Some(frame) = frame_from_downstream(message) {
                        supervisor.send(frame);
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Downstream socket error");
                    break "downstream error";
                }
            },
            Some(frame) = from_upstream.recv() => {
                if let Err(e) = sink.send(frame_to_downstream(frame)).await {
                    tracing::debug!(error = %e, "Downstream send failed");
                    break "downstream error";
                }
            }
            _ = tick(&mut keepalive) => {
                if sink.send(Message::Ping(Bytes::new())).await.is_err() {
                    break "downstream error";
                }
            }
        }
    };

    supervisor.terminate();
    if tokio::time::timeout(TERMINATE_TIMEOUT, supervisor.terminated()).await.is_err() {
        tracing::warn!("Upstream supervisor did not stop in time");
    }
    drop(supervisor);
    tracing::info!(reason, "Binding closed");
    drop(guard);
}

async fn tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
