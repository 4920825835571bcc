//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router (health, channel upgrades, admin)
//! - Reject unknown upgrade paths before the handshake
//! - Hand accepted upgrades to a binding task
//! - Close every binding, then stop the listener, on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::admin::setup_admin_router;
use crate::config::ProxyConfig;
use crate::http::websocket::{run_binding, BindingSettings};
use crate::lifecycle::ShutdownSignal;
use crate::net::ConnectionRegistry;
use crate::observability::{metrics, spans};
use crate::routing::ChannelRouter;
use crate::upstream::{TungsteniteConnector, UpstreamConnector, UpstreamError};

/// How long shutdown waits for bindings to finish closing.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("upstream setup failed: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
pub struct AppState<C> {
    pub router: Arc<ChannelRouter>,
    pub connector: Arc<C>,
    pub registry: ConnectionRegistry,
    pub settings: BindingSettings,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            router: Arc::clone(&self.router),
            connector: Arc::clone(&self.connector),
            registry: self.registry.clone(),
            settings: self.settings,
        }
    }
}

/// WebSocket channel proxy server.
pub struct ProxyServer {
    router: Router,
    registry: ConnectionRegistry,
}

impl ProxyServer {
    /// Build a server that dials the configured realtime service.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ServerError> {
        let connector = TungsteniteConnector::new(&config.upstream)?;
        Ok(Self::new(config, Arc::new(connector)))
    }

    /// Build a server around any upstream connector.
    pub fn new<C: UpstreamConnector>(config: &ProxyConfig, connector: Arc<C>) -> Self {
        let registry = ConnectionRegistry::new();
        let state = AppState {
            router: Arc::new(ChannelRouter::new(&config.channels.path_prefix)),
            connector,
            registry: registry.clone(),
            settings: BindingSettings::from_config(config),
        };

        let router = Self::build_router(config, state);
        Self { router, registry }
    }

    fn build_router<C: UpstreamConnector>(config: &ProxyConfig, state: AppState<C>) -> Router {
        let registry = state.registry.clone();
        let pattern = state.router.route_pattern();

        let mut app = Router::new()
            .route("/health", get(health))
            .route(&pattern, any(channel_upgrade::<C>))
            .fallback(not_found)
            .with_state(state);

        if config.admin.enabled {
            app = app.merge(setup_admin_router(&config.admin, registry));
        }

        app.layer(TraceLayer::new_for_http())
    }

    /// Live bindings of this server.
    pub fn registry(&self) -> ConnectionRegistry {
        self.registry.clone()
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires. Every downstream connection receives a
    /// close frame before the listener stops.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Channel proxy listening");

        let registry = self.registry.clone();
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!(live_bindings = registry.len(), "Shutdown requested, closing bindings");
                registry.close_all();
                registry.wait_for_drain(DRAIN_TIMEOUT).await;
            })
            .await?;

        tracing::info!("Channel proxy stopped");
        Ok(())
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Upgrade handler for `{prefix}/{channel}`.
///
/// The channel is resolved before the upgrade extractor is consulted, so an
/// unknown channel never completes a handshake or dials upstream.
async fn channel_upgrade<C: UpstreamConnector>(
    State(state): State<AppState<C>>,
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let channel = match state.router.resolve(uri.path()) {
        Ok(channel) => channel,
        Err(rejection) => {
            metrics::record_upgrade_rejected();
            tracing::warn!(path = %uri.path(), reason = %rejection, "Upgrade rejected");
            return refuse();
        }
    };

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    upgrade.on_upgrade(move |socket| {
        let guard = state.registry.register(channel);
        let span = spans::binding_span(guard.id(), channel);
        run_binding(socket, guard, state.connector, state.settings).instrument(span)
    })
}

async fn not_found(uri: Uri, headers: HeaderMap) -> Response {
    if headers.contains_key(header::UPGRADE) {
        metrics::record_upgrade_rejected();
        tracing::warn!(path = %uri.path(), "Upgrade rejected: no route");
        return refuse();
    }
    StatusCode::NOT_FOUND.into_response()
}

/// 404 that also drops the underlying connection.
fn refuse() -> Response {
    (StatusCode::NOT_FOUND, [(header::CONNECTION, "close")]).into_response()
}
