pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::config::AdminConfig;
use crate::net::ConnectionRegistry;

/// Shared state for admin handlers.
#[derive(Clone)]
pub struct AdminState {
    pub registry: ConnectionRegistry,
    pub api_key: Arc<str>,
}

pub fn setup_admin_router(config: &AdminConfig, registry: ConnectionRegistry) -> Router {
    let state = AdminState {
        registry,
        api_key: Arc::from(config.api_key.as_str()),
    };

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/bindings", get(get_bindings))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
