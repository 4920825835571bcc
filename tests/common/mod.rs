//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use channel_proxy::config::ProxyConfig;
use channel_proxy::http::{ProxyServer, ServerError};
use channel_proxy::lifecycle::Shutdown;
use channel_proxy::net::ConnectionRegistry;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub const API_KEY: &str = "test-key";

pub type UpstreamSocket = WebSocketStream<TcpStream>;
pub type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the mock upstream saw during one handshake.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub path: String,
    pub api_key: Option<String>,
}

/// Start a mock realtime service on `addr`. Every accepted socket is
/// reported together with its handshake.
pub async fn start_mock_upstream(
    addr: SocketAddr,
) -> (SocketAddr, mpsc::UnboundedReceiver<(Handshake, UpstreamSocket)>) {
    let listener = TcpListener::bind(addr).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut seen = None;
                let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    seen = Some(Handshake {
                        path: req.uri().path().to_string(),
                        api_key: req
                            .headers()
                            .get("x-api-key")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                    });
                    Ok(resp)
                };
                let accepted = tokio_tungstenite::accept_hdr_async(stream, callback).await;
                if let (Ok(socket), Some(handshake)) = (accepted, seen) {
                    let _ = tx.send((handshake, socket));
                }
            });
        }
    });

    (addr, rx)
}

/// Start a mock upstream that refuses the first `refusals` handshakes with
/// a 503, then accepts.
pub async fn start_flaky_upstream(
    refusals: usize,
) -> (SocketAddr, mpsc::UnboundedReceiver<(Handshake, UpstreamSocket)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut remaining = refusals;
        while let Ok((stream, _)) = listener.accept().await {
            let refuse = remaining > 0;
            remaining = remaining.saturating_sub(1);
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut path = String::new();
                let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    path = req.uri().path().to_string();
                    if refuse {
                        let mut err = ErrorResponse::new(None);
                        *err.status_mut() = StatusCode::SERVICE_UNAVAILABLE;
                        return Err(err);
                    }
                    Ok(resp)
                };
                let accepted = tokio_tungstenite::accept_hdr_async(stream, callback).await;
                if let Ok(socket) = accepted {
                    let handshake = Handshake { path, api_key: None };
                    let _ = tx.send((handshake, socket));
                }
            });
        }
    });

    (addr, rx)
}

/// Proxy configuration pointing at `upstream` with short backoff delays.
pub fn proxy_config(upstream: SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.upstream.realtime_url = format!("http://{upstream}");
    config.upstream.api_key = API_KEY.into();
    config.backoff.initial_ms = 50;
    config.backoff.max_ms = 400;
    config.channels.keepalive_secs = 0;
    config
}

pub struct RunningProxy {
    pub addr: SocketAddr,
    pub registry: ConnectionRegistry,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), ServerError>>,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let server = ProxyServer::from_config(&config).unwrap();
    let registry = server.registry();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningProxy {
        addr,
        registry,
        shutdown,
        task,
    }
}

pub async fn connect_client(proxy: &RunningProxy, path: &str) -> ClientSocket {
    let (socket, _) = tokio_tungstenite::connect_async(proxy.url(path)).await.unwrap();
    socket
}

/// Next upstream connection, or panic after five seconds.
pub async fn next_upstream(
    rx: &mut mpsc::UnboundedReceiver<(Handshake, UpstreamSocket)>,
) -> (Handshake, UpstreamSocket) {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("upstream connection")
        .expect("mock upstream running")
}

/// Send a raw HTTP/1.1 GET and return the whole response.
pub async fn http_get(addr: SocketAddr, path: &str) -> String {
    http_get_with(addr, path, "").await
}

/// Like [`http_get`], with a bearer token.
pub async fn http_get_authorized(addr: SocketAddr, path: &str, token: &str) -> String {
    http_get_with(addr, path, &format!("Authorization: Bearer {token}\r\n")).await
}

async fn http_get_with(addr: SocketAddr, path: &str, extra_headers: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {path} HTTP/1.1\r\nHost: {addr}\r\n{extra_headers}Connection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

/// Poll `check` until it holds, or panic after five seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..250 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached");
}
