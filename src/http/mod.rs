//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, /health, admin routes)
//!     → routing layer resolves {prefix}/{channel}
//!         → unknown: 404, connection closed, no handshake
//!         → known: upgrade
//!     → websocket.rs (binding: downstream socket ↔ upstream supervisor)
//! ```

pub mod server;
pub mod websocket;

pub use server::{AppState, ProxyServer, ServerError};
pub use websocket::BindingSettings;
