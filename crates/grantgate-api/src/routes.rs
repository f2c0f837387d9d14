//! API Routes

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers;
use crate::state::AppState;

/// Create API v1 routes
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/grants", post(handlers::grants::create_grant))
        .route("/grants/prune", post(handlers::grants::prune_expired))
        .route(
            "/grants/:granter/:grantee",
            get(handlers::grants::get_grant).delete(handlers::grants::revoke_grant),
        )
        .route("/grants/:granter/:grantee/exec", post(handlers::grants::execute_grant))
        .route("/granters/:granter/grants", get(handlers::grants::list_by_granter))
        .route("/grantees/:grantee/grants", get(handlers::grants::list_by_grantee))
}
