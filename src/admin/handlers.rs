use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use super::AdminState;
use crate::net::BindingInfo;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub live_bindings: usize,
}

#[derive(Serialize)]
pub struct BindingsSummary {
    pub total: usize,
    pub by_channel: BTreeMap<&'static str, usize>,
    pub bindings: Vec<BindingInfo>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        live_bindings: state.registry.len(),
    })
}

pub async fn get_bindings(State(state): State<AdminState>) -> Json<BindingsSummary> {
    let bindings = state.registry.snapshot();
    Json(BindingsSummary {
        total: bindings.len(),
        by_channel: state.registry.counts_by_channel(),
        bindings,
    })
}
