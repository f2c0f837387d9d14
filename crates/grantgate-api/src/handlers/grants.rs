//! Grant Handlers
//!
//! Grant, revoke, execute and query endpoints. Addresses in paths are
//! validated before they reach the engine.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use grantgate_types::{Address, AuthzError, TransferAction};
use std::sync::Arc;

use crate::dto::{
    ExecResponse, GrantListResponse, GrantRequest, GrantView, PruneRequest, PruneResponse,
    RevokeResponse,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

fn pair(granter: String, grantee: String) -> ApiResult<(Address, Address)> {
    Ok((Address::parse(granter)?, Address::parse(grantee)?))
}

/// POST /api/v1/grants
pub async fn create_grant(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GrantRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<GrantView>)> {
    let Json(request) = payload?;
    let record = state
        .engine
        .grant(request.granter, request.grantee, request.allocations, request.expiration)
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /api/v1/grants/:granter/:grantee
pub async fn get_grant(
    State(state): State<Arc<AppState>>,
    Path((granter, grantee)): Path<(String, String)>,
) -> ApiResult<Json<GrantView>> {
    let (granter, grantee) = pair(granter, grantee)?;
    match state.engine.get(&granter, &grantee).await? {
        Some(record) => Ok(Json(record.into())),
        None => Err(AuthzError::NoAuthorization {
            granter: granter.to_string(),
            grantee: grantee.to_string(),
        }
        .into()),
    }
}

/// DELETE /api/v1/grants/:granter/:grantee
pub async fn revoke_grant(
    State(state): State<Arc<AppState>>,
    Path((granter, grantee)): Path<(String, String)>,
) -> ApiResult<Json<RevokeResponse>> {
    let (granter, grantee) = pair(granter, grantee)?;
    let revoked = state.engine.revoke(&granter, &grantee).await?;
    Ok(Json(RevokeResponse { revoked }))
}

/// POST /api/v1/grants/:granter/:grantee/exec
pub async fn execute_grant(
    State(state): State<Arc<AppState>>,
    Path((granter, grantee)): Path<(String, String)>,
    payload: Result<Json<TransferAction>, JsonRejection>,
) -> ApiResult<Json<ExecResponse>> {
    let (granter, grantee) = pair(granter, grantee)?;
    let Json(action) = payload?;
    let outcome = state.engine.execute(&granter, &grantee, action).await?;
    Ok(Json(outcome.into()))
}

/// GET /api/v1/granters/:granter/grants
pub async fn list_by_granter(
    State(state): State<Arc<AppState>>,
    Path(granter): Path<String>,
) -> ApiResult<Json<GrantListResponse>> {
    let granter = Address::parse(granter)?;
    let records = state.engine.query(&granter).await?;
    Ok(Json(records.into()))
}

/// GET /api/v1/grantees/:grantee/grants
pub async fn list_by_grantee(
    State(state): State<Arc<AppState>>,
    Path(grantee): Path<String>,
) -> ApiResult<Json<GrantListResponse>> {
    let grantee = Address::parse(grantee)?;
    let records = state.engine.query_grantee(&grantee).await?;
    Ok(Json(records.into()))
}

/// POST /api/v1/grants/prune
pub async fn prune_expired(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<PruneRequest>>,
) -> Result<Json<PruneResponse>, ApiError> {
    // A caller may sweep as of an earlier instant, never a later one
    let clock = Utc::now();
    let now = payload
        .and_then(|Json(request)| request.now)
        .map_or(clock, |requested| requested.min(clock));
    let grants = state.engine.prune_expired(now).await?;
    Ok(Json(PruneResponse {
        pruned: grants.len(),
        grants,
    }))
}
