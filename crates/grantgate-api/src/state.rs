//! Application state shared across handlers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use grantgate_core::AuthzEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuthzEngine>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: Arc<AuthzEngine>) -> Self {
        Self {
            engine,
            started_at: Utc::now(),
        }
    }
}
