//! WebSocket channel proxy.
//!
//! Relays browser WebSocket connections on `{prefix}/{channel}` to the
//! realtime service, one upstream connection per browser connection, with
//! exponential-backoff reconnection on the upstream side.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  CHANNEL PROXY                    │
//!                        │                                                  │
//!   Browser  ────────────┼─▶ http/server ──▶ routing ──▶ http/websocket ────┼──┐
//!   (ws://…/v1/ws/logs)  │   (upgrade)       (channel)    (binding)         │  │
//!                        │                                    │             │  │
//!                        │                                    ▼             │  │
//!                        │                          upstream/supervisor ────┼──┼──▶ Realtime
//!                        │                          (state + backoff)       │  │    service
//!                        │                                                  │  │
//!                        │  ┌────────────────────────────────────────────┐  │  │
//!                        │  │ config │ observability │ lifecycle │ admin │  │  │
//!                        │  └────────────────────────────────────────────┘  │  │
//!                        └──────────────────────────────────────────────────┘  │
//!   Browser  ◀─────────────────────────────── frames ◀──────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use channel_proxy::config::load_config;
use channel_proxy::lifecycle::startup;
use channel_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "channel-proxy")]
#[command(about = "WebSocket channel proxy for the realtime service", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability)?;

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        tracing::debug!("rustls crypto provider already installed");
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "channel-proxy starting");

    startup::run(config).await?;
    Ok(())
}
