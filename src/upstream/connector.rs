//! Opening upstream sockets.
//!
//! # Responsibilities
//! - Derive the upstream WebSocket address for a channel
//! - Attach the static upstream credential header
//! - Bound every attempt by the configured connect timeout

use std::future::Future;
use std::time::Duration;

use futures_util::{Sink, Stream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::config::UpstreamConfig;
use crate::routing::Channel;

/// Error type for upstream connect attempts.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream base url must start with http:// or https://, got '{0}'")]
    InvalidUrl(String),
    #[error("invalid credential header: {0}")]
    InvalidHeader(String),
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// Opens one upstream socket for a channel.
///
/// The supervisor calls this once per attempt and owns the returned socket
/// until it closes.
pub trait UpstreamConnector: Send + Sync + 'static {
    type Socket: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Send
        + Unpin
        + 'static;

    fn connect(
        &self,
        channel: Channel,
    ) -> impl Future<Output = Result<Self::Socket, UpstreamError>> + Send;
}

/// Derive `ws(s)://<host>/ws/<channel>` from an `http(s)://` base URL.
pub fn upstream_url(base_url: &str, channel: Channel) -> Result<String, UpstreamError> {
    let ws_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(UpstreamError::InvalidUrl(base_url.to_string()));
    };

    Ok(format!("{}/ws/{}", ws_base.trim_end_matches('/'), channel))
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    base_url: String,
    header_name: HeaderName,
    header_value: HeaderValue,
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        // Fail on a bad base URL at startup rather than on the first attempt.
        upstream_url(&config.realtime_url, Channel::Logs)?;

        let header_name = HeaderName::from_bytes(config.api_key_header.as_bytes())
            .map_err(|e| UpstreamError::InvalidHeader(e.to_string()))?;
        let mut header_value = HeaderValue::from_str(&config.api_key)
            .map_err(|e| UpstreamError::InvalidHeader(e.to_string()))?;
        header_value.set_sensitive(true);

        Ok(Self {
            base_url: config.realtime_url.clone(),
            header_name,
            header_value,
            connect_timeout: config.connect_timeout(),
        })
    }
}

impl UpstreamConnector for TungsteniteConnector {
    type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn connect(&self, channel: Channel) -> Result<Self::Socket, UpstreamError> {
        let url = upstream_url(&self.base_url, channel)?;
        let mut request = url.into_client_request()?;
        request
            .headers_mut()
            .insert(self.header_name.clone(), self.header_value.clone());

        let (socket, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| UpstreamError::Timeout(self.connect_timeout))??;

        Ok(socket)
    }
}
