//! In-memory upstream for supervisor and binding tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::WebSocketStream;

use crate::routing::Channel;
use crate::upstream::connector::{UpstreamConnector, UpstreamError};

pub type ServerSocket = WebSocketStream<DuplexStream>;

/// Outcome of one scripted connect attempt.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Refuse,
    Accept,
    /// Never resolves.
    Hang,
}

/// Connector that plays back a fixed script, then refuses forever.
pub struct ScriptedConnector {
    script: Mutex<VecDeque<Script>>,
    attempts: Mutex<Vec<(Instant, Channel)>>,
    accepted: mpsc::UnboundedSender<ServerSocket>,
}

impl ScriptedConnector {
    pub fn new(
        script: impl IntoIterator<Item = Script>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ServerSocket>) {
        let (accepted, rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            attempts: Mutex::new(Vec::new()),
            accepted,
        });
        (connector, rx)
    }

    pub fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().iter().map(|(at, _)| *at).collect()
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.attempts.lock().unwrap().iter().map(|(_, c)| *c).collect()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }
}

impl UpstreamConnector for ScriptedConnector {
    type Socket = WebSocketStream<DuplexStream>;

    async fn connect(&self, channel: Channel) -> Result<Self::Socket, UpstreamError> {
        self.attempts.lock().unwrap().push((Instant::now(), channel));
        let next = self.script.lock().unwrap().pop_front();

        match next.unwrap_or(Script::Refuse) {
            Script::Refuse => Err(UpstreamError::WebSocket(WsError::ConnectionClosed)),
            Script::Hang => std::future::pending().await,
            Script::Accept => {
                let (client, server) = tokio::io::duplex(64 * 1024);
                let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
                let server = WebSocketStream::from_raw_socket(server, Role::Server, None).await;
                let _ = self.accepted.send(server);
                Ok(client)
            }
        }
    }
}
