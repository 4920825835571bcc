//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind the listener and begin accepting traffic
//! - Wire OS signals to graceful shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener starts last (traffic only when ready)
//! - Config is loaded and validated by the caller

use std::net::SocketAddr;

use tokio::net::TcpListener;

use super::{signals, Shutdown};
use crate::config::ProxyConfig;
use crate::http::{ProxyServer, ServerError};
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Start every subsystem and serve until a termination signal arrives.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let server = ProxyServer::from_config(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    tracing::info!(
        upstream = %config.upstream.realtime_url,
        prefix = %config.channels.path_prefix,
        admin = config.admin.enabled,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let signal_task = signals::spawn_signal_handler(shutdown.clone());

    let result = server.run(listener, shutdown.subscribe()).await;
    signal_task.abort();
    result?;

    tracing::info!("Shutdown complete");
    Ok(())
}
