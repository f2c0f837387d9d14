//! Error types for grantgate
//!
//! Every rejection is explicit and typed. None are swallowed or retried.

use thiserror::Error;

/// Result type for grantgate operations
pub type Result<T> = std::result::Result<T, AuthzError>;

/// grantgate error types
#[derive(Debug, Clone, Error)]
pub enum AuthzError {
    // ========================================================================
    // Authorization Errors
    // ========================================================================

    /// No grant exists for the pair
    #[error("No authorization found for granter {granter} and grantee {grantee}")]
    NoAuthorization { granter: String, grantee: String },

    /// The grant lapsed; it has been pruned
    #[error("Authorization from {granter} to {grantee} expired at {expired_at}")]
    AuthorizationExpired {
        granter: String,
        grantee: String,
        expired_at: String,
    },

    /// No allocation covers the channel and recipient combination.
    /// Carries no detail so an unknown recipient looks exactly like an unknown channel.
    #[error("No allocation authorizes this transfer")]
    NoMatchingAllocation,

    /// The matching allocation cannot cover the amount
    #[error("Spend limit exceeded for {denom}: requested {requested}, remaining {remaining}")]
    InsufficientSpendLimit {
        denom: String,
        requested: String,
        remaining: String,
    },

    /// The guarded transfer itself failed; no accounting was committed
    #[error("Guarded transfer failed: {reason}")]
    GuardedActionFailed { reason: String },

    // ========================================================================
    // Validation Errors
    // ========================================================================

    /// Grant request is structurally invalid
    #[error("Invalid grant: {reason}")]
    InvalidGrant { reason: String },

    /// Transfer action is structurally invalid
    #[error("Invalid action: {field} - {reason}")]
    InvalidAction { field: String, reason: String },

    /// Identifier failed syntax rules
    #[error("Invalid {kind} {value:?}: {reason}")]
    InvalidIdentifier {
        kind: String,
        value: String,
        reason: String,
    },

    /// Invalid input
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    // ========================================================================
    // Storage Errors
    // ========================================================================

    /// The stored grant changed underneath a commit
    #[error("Grant {granter} -> {grantee} was modified concurrently; commit aborted")]
    CommitConflict { granter: String, grantee: String },

    /// Backend failure
    #[error("Store error: {message}")]
    Store { message: String },
}

impl AuthzError {
    /// Create an invalid grant error
    pub fn invalid_grant(reason: impl Into<String>) -> Self {
        Self::InvalidGrant {
            reason: reason.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoAuthorization { .. } => "NO_AUTHORIZATION",
            Self::AuthorizationExpired { .. } => "AUTHORIZATION_EXPIRED",
            Self::NoMatchingAllocation => "NO_MATCHING_ALLOCATION",
            Self::InsufficientSpendLimit { .. } => "INSUFFICIENT_SPEND_LIMIT",
            Self::GuardedActionFailed { .. } => "GUARDED_ACTION_FAILED",
            Self::InvalidGrant { .. } => "INVALID_GRANT",
            Self::InvalidAction { .. } => "INVALID_ACTION",
            Self::InvalidIdentifier { .. } => "INVALID_IDENTIFIER",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::CommitConflict { .. } => "COMMIT_CONFLICT",
            Self::Store { .. } => "STORE_ERROR",
        }
    }
}
