//! Upstream connection supervisor.
//!
//! # Responsibilities
//! - Own exactly one upstream socket for one binding
//! - Forward data frames in both directions
//! - Reconnect with backoff whenever the upstream goes away
//! - Tear everything down when told to terminate
//!
//! # Design Decisions
//! - Single-owner actor: the link state lives in one task and is mutated
//!   only there; the handle talks to it through a mailbox and a token
//! - Outbound frames are dropped unless the link is Connected, never queued
//!   across a reconnect
//! - Clean close and transport error take the same reconnect path

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::observability::metrics::{self, Direction};
use crate::resilience::Backoff;
use crate::routing::Channel;
use crate::upstream::connector::{UpstreamConnector, UpstreamError};
use crate::upstream::frame::Frame;
use crate::upstream::state::{LinkState, UpstreamLink};

/// Frames waiting for the actor to pick them up.
const OUTBOUND_CAPACITY: usize = 64;

/// Upper bound on the close handshake with the upstream.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Handle to a running supervisor.
///
/// Dropping the handle terminates the supervisor.
#[derive(Debug)]
pub struct SupervisorHandle {
    channel: Channel,
    outbound: mpsc::Sender<Frame>,
    cancel: CancellationToken,
    state: watch::Receiver<LinkState>,
}

impl SupervisorHandle {
    /// Forward a frame upstream.
    ///
    /// Returns false when the frame was dropped. Frames that reach the actor
    /// while the link is not Connected are dropped there as well.
    pub fn send(&self, frame: Frame) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(_) => {
                metrics::record_dropped(self.channel, Direction::Upstream);
                false
            }
        }
    }

    /// Stop reconnecting, cancel any pending retry and close the live socket.
    /// Idempotent.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// Resolve once the supervisor has reached Terminated.
    pub async fn terminated(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|s| *s == LinkState::Terminated).await;
    }
}

impl Drop for SupervisorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum Attempt<S> {
    Open(S),
    Failed(UpstreamError),
    Cancelled,
}

enum Exit {
    Lost,
    Cancelled,
}

/// The actor owning one upstream link.
pub struct Supervisor<C: UpstreamConnector> {
    channel: Channel,
    connector: Arc<C>,
    link: UpstreamLink,
    outbound: mpsc::Receiver<Frame>,
    downstream: mpsc::UnboundedSender<Frame>,
    cancel: CancellationToken,
    state_tx: watch::Sender<LinkState>,
}

impl<C: UpstreamConnector> Supervisor<C> {
    /// Create a supervisor for `channel` and start connecting immediately.
    ///
    /// Upstream data frames are delivered on `downstream`; once its receiver
    /// is gone they are dropped.
    pub fn connect(
        channel: Channel,
        connector: Arc<C>,
        backoff: Backoff,
        downstream: mpsc::UnboundedSender<Frame>,
    ) -> SupervisorHandle {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);
        let cancel = CancellationToken::new();

        let supervisor = Self {
            channel,
            connector,
            link: UpstreamLink::new(backoff),
            outbound: outbound_rx,
            downstream,
            cancel: cancel.clone(),
            state_tx,
        };
        tokio::spawn(supervisor.run().in_current_span());

        SupervisorHandle {
            channel,
            outbound: outbound_tx,
            cancel,
            state: state_rx,
        }
    }

    async fn run(mut self) {
        while self.link.begin_connect() {
            self.publish();

            match self.attempt().await {
                Attempt::Cancelled => break,
                Attempt::Failed(e) => {
                    metrics::record_upstream_connect(self.channel, false);
                    tracing::warn!(channel = %self.channel, error = %e, "Upstream connect failed");
                }
                Attempt::Open(socket) => {
                    self.discard_pending();
                    self.link.opened();
                    self.publish();
                    metrics::record_upstream_connect(self.channel, true);
                    tracing::info!(channel = %self.channel, "Upstream connected");

                    if let Exit::Cancelled = self.pump(socket).await {
                        break;
                    }
                }
            }

            let Some(delay) = self.link.lost() else {
                break;
            };
            self.publish();
            metrics::record_reconnect_scheduled(self.channel);
            tracing::info!(
                channel = %self.channel,
                delay_ms = delay.as_millis() as u64,
                "Upstream reconnect scheduled"
            );

            if !self.wait(delay).await {
                break;
            }
        }

        self.link.terminate();
        self.publish();
        tracing::debug!(channel = %self.channel, "Upstream supervisor terminated");
    }

    /// One connect attempt, abandoned on cancellation.
    async fn attempt(&mut self) -> Attempt<C::Socket> {
        let connector = Arc::clone(&self.connector);
        let connect = connector.connect(self.channel);
        tokio::pin!(connect);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Attempt::Cancelled,
                result = &mut connect => {
                    return match result {
                        Ok(socket) => Attempt::Open(socket),
                        Err(e) => Attempt::Failed(e),
                    };
                }
                Some(_) = self.outbound.recv() => {
                    metrics::record_dropped(self.channel, Direction::Upstream);
                }
            }
        }
    }

    /// Relay frames over a live socket until it goes away or we are cancelled.
    async fn pump(&mut self, socket: C::Socket) -> Exit {
        let (mut sink, mut stream) = socket.split();

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await;
                    return Exit::Cancelled;
                }
                message = stream.next() => match message {
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(channel = %self.channel, ?frame, "Upstream sent close");
                        let _ = tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await;
                        return Exit::Lost;
                    }
                    Some(Ok(message)) => {
                        if let Some(frame) = Frame::from_upstream(message) {
                            match self.downstream.send(frame) {
                                Ok(()) => metrics::record_forwarded(self.channel, Direction::Downstream),
                                Err(_) => metrics::record_dropped(self.channel, Direction::Downstream),
                            }
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(channel = %self.channel, error = %e, "Upstream socket error");
                        return Exit::Lost;
                    }
                    None => {
                        tracing::info!(channel = %self.channel, "Upstream closed");
                        return Exit::Lost;
                    }
                },
                Some(frame) = self.outbound.recv() => {
                    // A stalled upstream must not hold off terminate.
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Exit::Cancelled,
                        sent = sink.send(frame.into_upstream()) => {
                            if let Err(e) = sent {
                                tracing::warn!(channel = %self.channel, error = %e, "Upstream send failed");
                                return Exit::Lost;
                            }
                            metrics::record_forwarded(self.channel, Direction::Upstream);
                        }
                    }
                }
            }
        }
    }

    /// Sleep out the reconnect delay. Returns false if cancelled meanwhile.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                _ = &mut sleep => return true,
                Some(_) = self.outbound.recv() => {
                    metrics::record_dropped(self.channel, Direction::Upstream);
                }
            }
        }
    }

    /// Drop frames that arrived before the link was Connected.
    fn discard_pending(&mut self) {
        while self.outbound.try_recv().is_ok() {
            metrics::record_dropped(self.channel, Direction::Upstream);
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.link.state());
    }
}
