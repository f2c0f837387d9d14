//! API error handling
//!
//! Every failure leaves the API as `{ "code": ..., "msg": ... }` with a status
//! derived from the authorization error kind.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use grantgate_types::AuthzError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),
}

impl ApiError {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Authz(err) => err.error_code(),
            Self::InvalidRequestBody(_) => "INVALID_REQUEST_BODY",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Authz(err) => match err {
                // 400 Bad Request
                AuthzError::InvalidGrant { .. }
                | AuthzError::InvalidAction { .. }
                | AuthzError::InvalidIdentifier { .. }
                | AuthzError::InvalidInput { .. } => StatusCode::BAD_REQUEST,

                // 403 Forbidden
                AuthzError::AuthorizationExpired { .. } | AuthzError::NoMatchingAllocation => {
                    StatusCode::FORBIDDEN
                }

                // 404 Not Found
                AuthzError::NoAuthorization { .. } => StatusCode::NOT_FOUND,

                // 409 Conflict
                AuthzError::CommitConflict { .. } => StatusCode::CONFLICT,

                // 422 Unprocessable Entity
                AuthzError::InsufficientSpendLimit { .. } => StatusCode::UNPROCESSABLE_ENTITY,

                // 502 Bad Gateway
                AuthzError::GuardedActionFailed { .. } => StatusCode::BAD_GATEWAY,

                // 500 Internal Server Error
                AuthzError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

/// API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub msg: String,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        Self {
            code: err.error_code().to_string(),
            msg: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequestBody(rejection.body_text())
    }
}
