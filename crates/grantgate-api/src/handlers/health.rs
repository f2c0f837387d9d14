//! Health Check Handlers

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Milliseconds since the epoch
    pub timestamp: i64,
    pub uptime_secs: i64,
}

/// Liveness; does not touch the store
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = Utc::now();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now.timestamp_millis(),
        uptime_secs: (now - state.started_at).num_seconds(),
    })
}
